//! hkgov-crawler main entry point
//!
//! Command-line interface that runs the configured crawlers and writes
//! `urls.jsonl`, `summary.json` and `manifest.json` under `<out>/latest/`.

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use hkgov_crawler::config::{load_settings_with_hash, CrawlerSpec, Settings};
use hkgov_crawler::context::parse_run_date;
use hkgov_crawler::crawler::build_http_client;
use hkgov_crawler::output::{print_statistics, write_run_outputs, RunSummary};
use hkgov_crawler::runner::{run_all, select_crawlers};
use hkgov_crawler::RunContext;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// hkgov-crawler: document and contact discovery for Hong Kong government sites
///
/// Crawls the configured sites breadth-first, politely and sequentially, and
/// writes one JSON record per discovered document or contact.
#[derive(Parser, Debug)]
#[command(name = "hkgov-crawler")]
#[command(version)]
#[command(about = "Document and contact discovery for Hong Kong government sites", long_about = None)]
struct Cli {
    /// Run only the named crawler (default: all, in configured order)
    #[arg(long, value_name = "NAME")]
    crawler: Option<String>,

    /// Path to the TOML settings file
    #[arg(long, value_name = "PATH", default_value = "settings.toml")]
    settings: PathBuf,

    /// Output root; files are written to <OUT>/latest/
    #[arg(long, value_name = "DIR", default_value = "data")]
    out: PathBuf,

    /// Log every fetch and routing decision
    #[arg(long)]
    debug: bool,

    /// Run date recorded in the outputs (YYYY-MM-DD, default: today UTC)
    #[arg(long, value_name = "YYYY-MM-DD")]
    run_date: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with_all = ["verbose", "debug"])]
    quiet: bool,

    /// Validate settings and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.debug, cli.quiet);

    let run_date = cli
        .run_date
        .as_deref()
        .map(parse_run_date)
        .transpose()?;

    tracing::info!("Loading settings from: {}", cli.settings.display());
    let (settings, hash) = load_settings_with_hash(&cli.settings)
        .with_context(|| format!("failed to load settings from {}", cli.settings.display()))?;
    tracing::info!("Settings loaded successfully (hash: {})", hash);

    let ctx = RunContext::new(settings, run_date, cli.debug);

    if cli.dry_run {
        handle_dry_run(&ctx, cli.crawler.as_deref())
    } else {
        handle_crawl(&ctx, cli.crawler.as_deref(), &cli.out, cli.quiet).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, debug: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose.max(u8::from(debug)) {
            0 => EnvFilter::new("hkgov_crawler=info,warn"),
            1 => EnvFilter::new("hkgov_crawler=debug,info"),
            2 => EnvFilter::new("hkgov_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles --dry-run: shows the crawlers that would run
fn handle_dry_run(ctx: &RunContext, selected: Option<&str>) -> anyhow::Result<()> {
    let settings: &Settings = &ctx.settings;
    println!("=== hkgov-crawler Dry Run ===\n");

    println!("HTTP:");
    println!("  Timeout: {}s", settings.http.timeout_seconds);
    println!("  Max retries: {}", settings.http.max_retries);
    println!("  On crawler error: {:?}", settings.run.on_crawler_error);
    println!("  Debug logging: {}", ctx.debug);

    let specs = select_crawlers(ctx, selected)?;
    println!("\nCrawlers ({}):", specs.len());
    for spec in &specs {
        let pacing = spec.pacing();
        println!("  - {} [{}]", spec.name(), spec.kind());
        match spec {
            CrawlerSpec::Frontier(cfg) => {
                println!("    start: {}", cfg.start_url);
                println!("    max depth: {}, max pages: {}", cfg.max_depth, cfg.max_pages);
                if let Some(year) = cfg.min_year {
                    println!("    min year: {}", year);
                }
                if !cfg.sections.is_empty() {
                    println!("    sections: {}", cfg.sections.len());
                }
            }
            CrawlerSpec::Directory(cfg) => {
                println!("    index: {}", cfg.index_url);
                println!("    max pages: {}", cfg.max_pages);
            }
            CrawlerSpec::Pages(cfg) => {
                for target in &cfg.targets {
                    println!("    * {}", target.url);
                }
            }
        }
        println!(
            "    delay: {}s + {}s jitter, max records: {}",
            pacing.request_delay_seconds, pacing.request_jitter_seconds, pacing.max_total_records
        );
    }

    println!("\n✓ Settings are valid");
    println!("✓ Would run {} crawler(s) for {}", specs.len(), ctx.run_date_utc);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    ctx: &RunContext,
    selected: Option<&str>,
    out: &std::path::Path,
    quiet: bool,
) -> anyhow::Result<()> {
    let client = build_http_client(&ctx.settings.http).context("failed to build HTTP client")?;

    let report = match run_all(ctx, &client, selected).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    if !report.failed.is_empty() {
        tracing::warn!("Crawlers failed and were skipped: {}", report.failed.join(", "));
    }

    let summary = RunSummary {
        run_date_utc: ctx.run_date_utc.clone(),
        started_at_utc: ctx.started_at_utc.clone(),
        crawler: selected.unwrap_or("all").to_string(),
        rows: report.records.len(),
        crawlers: report.stats.clone(),
    };

    let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
    let outputs = write_run_outputs(out, &report.records, &summary, &generated_at)
        .with_context(|| format!("failed to write outputs under {}", out.display()))?;

    if !quiet {
        print_statistics(&report.stats);
        println!();
        println!("✓ Wrote {} rows to {}", outputs.rows, outputs.urls.display());
        println!("✓ Summary: {}", outputs.summary.display());
        println!("✓ Manifest: {}", outputs.manifest.display());
    }

    Ok(())
}
