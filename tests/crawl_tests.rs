//! Integration tests for the document crawlers
//!
//! These tests use wiremock to create mock sites and run full crawls
//! end-to-end. `expect(n)` on each page asserts exactly which pages were
//! fetched.

use hkgov_crawler::config::parse_settings;
use hkgov_crawler::output::{write_run_outputs, CrawlOutcome, RunSummary, StopReason};
use hkgov_crawler::runner::{run_all, run_crawler};
use hkgov_crawler::{CrawlError, RunContext};
use reqwest::Client;
use serde_json::Value;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FAST_PACING: &str = r#"
request-delay-seconds = 0.0
request-jitter-seconds = 0.0
backoff-base-seconds = 0.0
backoff-jitter-seconds = 0.0
"#;

/// Settings with one frontier crawler rooted at `<uri>/en/index.html`
fn frontier_context(uri: &str, extra: &str) -> RunContext {
    let toml = format!(
        r#"
[http]
timeout-seconds = 5
max-retries = 0

[[crawler]]
name = "docs"
kind = "frontier"
start-url = "{uri}/en/index.html"
allowed-page-path-prefixes = ["/en/"]
{FAST_PACING}
{extra}
"#
    );
    RunContext::new(parse_settings(&toml).unwrap(), None, false)
}

/// Mounts an HTML page that must be fetched exactly `times` times
async fn mount_page(server: &MockServer, page: &str, body: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!("<html><body>{}</body></html>", body))
                .insert_header("content-type", "text/html"),
        )
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, page: &str, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(status))
        .expect(times)
        .mount(server)
        .await;
}

async fn crawl(ctx: &RunContext, name: &str) -> hkgov_crawler::Result<CrawlOutcome> {
    let spec = ctx.settings.crawler(name).unwrap();
    run_crawler(spec, ctx, &Client::new()).await
}

fn urls(outcome: &CrawlOutcome, uri: &str) -> Vec<String> {
    outcome
        .records
        .iter()
        .map(|r| r.url.trim_start_matches(uri).to_string())
        .collect()
}

#[tokio::test]
async fn test_full_crawl_emits_sorted_unique_documents() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_page(
        &mock_server,
        "/en/index.html",
        r#"<a href="/en/a.html">A</a>
           <a href="/files/z.pdf">Zeta</a>
           <a href="/files/x.pdf">Report X</a>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/en/a.html",
        r#"<a href="/files/y.pdf">Y</a>
           <a href="/files/x.pdf#page=2">X again</a>
           <a href="/en/index.html">Home</a>"#,
        1,
    )
    .await;

    let ctx = frontier_context(&uri, "");
    let outcome = crawl(&ctx, "docs").await.unwrap();

    assert_eq!(urls(&outcome, &uri), vec!["/files/x.pdf", "/files/y.pdf", "/files/z.pdf"]);
    assert_eq!(outcome.stats.pages_fetched, 2);
    assert_eq!(outcome.stats.records, 3);

    let x = &outcome.records[0];
    assert_eq!(x.name.as_deref(), Some("Report X"));
    assert_eq!(x.source, "docs");
    assert_eq!(x.discovered_at_utc, ctx.started_at_utc);
    assert_eq!(x.meta["discovered_from"], format!("{}/en/index.html", uri));
    assert_eq!(outcome.records[1].meta["depth"], 1);
}

#[tokio::test]
async fn test_depth_bound_stops_enqueueing() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_page(&mock_server, "/en/index.html", r#"<a href="/en/a.html">A</a>"#, 1).await;
    mount_page(
        &mock_server,
        "/en/a.html",
        r#"<a href="/en/b.html">B</a><a href="/files/y.pdf">Y</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/en/b.html", "", 0).await;

    let ctx = frontier_context(&uri, "max-depth = 1");
    let outcome = crawl(&ctx, "docs").await.unwrap();

    assert_eq!(urls(&outcome, &uri), vec!["/files/y.pdf"]);
}

#[tokio::test]
async fn test_scope_containment() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_page(
        &mock_server,
        "/en/index.html",
        r#"<a href="/zh/index.html">Chinese</a>
           <a href="/en/archive/old.html">Archive</a>
           <a href="https://other.example/en/x.html">Elsewhere</a>
           <a href="https://other.example/files/o.pdf">Foreign PDF</a>
           <a href="/files/ok.pdf">OK</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/zh/index.html", "", 0).await;
    mount_page(&mock_server, "/en/archive/old.html", "", 0).await;

    let ctx = frontier_context(&uri, r#"excluded-page-path-prefixes = ["/en/archive/"]"#);
    let outcome = crawl(&ctx, "docs").await.unwrap();

    assert_eq!(urls(&outcome, &uri), vec!["/files/ok.pdf"]);
    assert_eq!(outcome.stats.pages_out_of_scope, 2);
}

#[tokio::test]
async fn test_strict_year_routing() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_page(
        &mock_server,
        "/en/index.html",
        r#"<a href="/en/y2023.html">2023</a>
           <a href="/en/y2022.html">2022</a>
           <a href="/en/y2021.html">2021</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/en/y2023.html", r#"<a href="/files/a.pdf">A</a>"#, 1).await;
    mount_page(&mock_server, "/en/y2022.html", r#"<a href="/files/b.pdf">B</a>"#, 1).await;
    mount_page(&mock_server, "/en/y2021.html", "", 0).await;

    let ctx = frontier_context(&uri, "min-year = 2022");
    let outcome = crawl(&ctx, "docs").await.unwrap();

    assert_eq!(urls(&outcome, &uri), vec!["/files/a.pdf", "/files/b.pdf"]);
    assert_eq!(outcome.records[0].meta["year_context"], 2023);
    assert_eq!(outcome.records[0].meta["year_mode"], "strict");
    assert_eq!(outcome.records[1].meta["year_context"], 2022);
}

#[tokio::test]
async fn test_best_effort_year_routing() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_page(
        &mock_server,
        "/en/index.html",
        r#"<a href="/en/y2023.html">2023</a><a href="/en/y2022.html">2022</a>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/en/y2023.html",
        r#"<a href="/files/notice-2019.pdf">Notice</a><a href="/files/undated.pdf">Form</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/en/y2022.html", "", 1).await;

    // No link for 2024 or later, so every year is followed
    let ctx = frontier_context(&uri, "min-year = 2024");
    let outcome = crawl(&ctx, "docs").await.unwrap();

    assert_eq!(urls(&outcome, &uri), vec!["/files/undated.pdf"]);
    assert_eq!(outcome.records[0].meta["year_mode"], "best_effort");
}

#[tokio::test]
async fn test_section_routing() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_page(
        &mock_server,
        "/en/index.html",
        r#"<a href="/en/guides.html">Guides</a><a href="/en/news.html">News</a>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/en/guides.html",
        r#"<a href="/en/guide-roofing.html">Roofing</a><a href="/en/other.html">Other</a>"#,
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/en/guide-roofing.html",
        r#"<a href="/files/roofing.pdf">Roofing guide</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/en/news.html", "", 0).await;
    mount_page(&mock_server, "/en/other.html", "", 0).await;

    let ctx = frontier_context(
        &uri,
        r#"
[[crawler.sections]]
slug = "guides.html"
name = "Guides"
child-slug-prefixes = ["guide-"]
"#,
    );
    let outcome = crawl(&ctx, "docs").await.unwrap();

    assert_eq!(urls(&outcome, &uri), vec!["/files/roofing.pdf"]);
    assert_eq!(outcome.records[0].meta["section"], "Guides");
    assert_eq!(outcome.records[0].meta["depth"], 2);
}

#[tokio::test]
async fn test_failed_sub_page_is_skipped() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_page(
        &mock_server,
        "/en/index.html",
        r#"<a href="/en/broken.html">Broken</a><a href="/en/ok.html">OK</a>"#,
        1,
    )
    .await;
    mount_status(&mock_server, "/en/broken.html", 404, 1).await;
    mount_page(&mock_server, "/en/ok.html", r#"<a href="/files/ok.pdf">OK</a>"#, 1).await;

    let ctx = frontier_context(&uri, "");
    let outcome = crawl(&ctx, "docs").await.unwrap();

    assert_eq!(urls(&outcome, &uri), vec!["/files/ok.pdf"]);
    assert_eq!(outcome.stats.pages_failed, 1);
    assert_eq!(outcome.stats.pages_fetched, 2);
}

#[tokio::test]
async fn test_failed_sub_page_aborts_when_configured() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_page(
        &mock_server,
        "/en/index.html",
        r#"<a href="/en/broken.html">Broken</a><a href="/en/ok.html">OK</a>"#,
        1,
    )
    .await;
    mount_status(&mock_server, "/en/broken.html", 404, 1).await;
    mount_page(&mock_server, "/en/ok.html", "", 0).await;

    let ctx = frontier_context(&uri, r#"on-page-error = "abort""#);
    let result = crawl(&ctx, "docs").await;

    assert!(matches!(result, Err(CrawlError::Fetch(e)) if e.status() == Some(404)));
}

#[tokio::test]
async fn test_failed_start_page_always_aborts() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_status(&mock_server, "/en/index.html", 500, 1).await;

    let ctx = frontier_context(&uri, r#"on-page-error = "skip""#);
    assert!(crawl(&ctx, "docs").await.is_err());
}

#[tokio::test]
async fn test_page_cap_stops_crawl() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_page(
        &mock_server,
        "/en/index.html",
        r#"<a href="/en/a.html">A</a><a href="/files/x.pdf">X</a>"#,
        1,
    )
    .await;
    mount_page(&mock_server, "/en/a.html", "", 0).await;

    let ctx = frontier_context(&uri, "max-pages = 1");
    let outcome = crawl(&ctx, "docs").await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.stats.stopped_by, Some(StopReason::MaxPages));
}

#[tokio::test]
async fn test_pages_crawler_filters_and_emits_index_page() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_page(
        &mock_server,
        "/en/codes.html",
        r#"<a href="/docs/manual-a.pdf">Design Manual</a>
           <a href="/docs/form.pdf">Form</a>
           <a href="/docs/manual-a.pdf">Design Manual (again)</a>"#,
        1,
    )
    .await;

    let toml = format!(
        r#"
[[crawler]]
name = "codes"
kind = "pages"
{FAST_PACING}

[[crawler.targets]]
url = "{uri}/en/codes.html"
title = "Codes and Design Manuals"
text-contains = "manual"
"#
    );
    let ctx = RunContext::new(parse_settings(&toml).unwrap(), None, false);
    let outcome = crawl(&ctx, "codes").await.unwrap();

    assert_eq!(urls(&outcome, &uri), vec!["/docs/manual-a.pdf", "/en/codes.html"]);
    assert_eq!(outcome.records[0].meta["is_index_page"], false);
    assert_eq!(outcome.records[1].meta["is_index_page"], true);
    assert_eq!(outcome.records[1].name.as_deref(), Some("Codes and Design Manuals"));
}

fn two_crawler_settings(uri: &str, policy: &str) -> RunContext {
    let toml = format!(
        r#"
[http]
max-retries = 0

[run]
on-crawler-error = "{policy}"

[[crawler]]
name = "broken"
kind = "frontier"
start-url = "{uri}/broken/index.html"
{FAST_PACING}

[[crawler]]
name = "docs"
kind = "frontier"
start-url = "{uri}/en/index.html"
{FAST_PACING}
"#
    );
    RunContext::new(parse_settings(&toml).unwrap(), None, false)
}

#[tokio::test]
async fn test_run_all_continues_past_failed_crawler() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_status(&mock_server, "/broken/index.html", 404, 1).await;
    mount_page(&mock_server, "/en/index.html", r#"<a href="/files/b.pdf">B</a><a href="/files/a.pdf">A</a>"#, 1).await;

    let ctx = two_crawler_settings(&uri, "continue");
    let report = run_all(&ctx, &Client::new(), None).await.unwrap();

    assert_eq!(report.failed, vec!["broken"]);
    assert_eq!(report.stats.len(), 2);
    let urls: Vec<&str> = report.records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![format!("{}/files/a.pdf", uri), format!("{}/files/b.pdf", uri)]
    );
}

#[tokio::test]
async fn test_run_all_aborts_on_failed_crawler() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_status(&mock_server, "/broken/index.html", 404, 1).await;
    mount_page(&mock_server, "/en/index.html", "", 0).await;

    let ctx = two_crawler_settings(&uri, "abort");
    assert!(run_all(&ctx, &Client::new(), None).await.is_err());
}

#[tokio::test]
async fn test_run_all_single_crawler_and_outputs() {
    let mock_server = MockServer::start().await;
    let uri = mock_server.uri();

    mount_status(&mock_server, "/broken/index.html", 404, 0).await;
    mount_page(&mock_server, "/en/index.html", r#"<a href="/files/a.pdf">A</a>"#, 1).await;

    let ctx = two_crawler_settings(&uri, "abort");
    let report = run_all(&ctx, &Client::new(), Some("docs")).await.unwrap();
    assert_eq!(report.records.len(), 1);

    let summary = RunSummary {
        run_date_utc: ctx.run_date_utc.clone(),
        started_at_utc: ctx.started_at_utc.clone(),
        crawler: "docs".to_string(),
        rows: report.records.len(),
        crawlers: report.stats.clone(),
    };
    let out = TempDir::new().unwrap();
    let outputs = write_run_outputs(out.path(), &report.records, &summary, "2024-01-01T00:00:00Z")
        .unwrap();

    let content = std::fs::read_to_string(&outputs.urls).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 1);
    let row: Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(row["source"], "docs");

    let manifest: Value =
        serde_json::from_str(&std::fs::read_to_string(&outputs.manifest).unwrap()).unwrap();
    assert_eq!(manifest["outputs"][0]["rows"], 1);
    assert_eq!(manifest["schema_version"], 1);
}

#[tokio::test]
async fn test_unknown_crawler_is_rejected() {
    let ctx = frontier_context("https://example.com", "");
    assert!(matches!(
        run_all(&ctx, &Client::new(), Some("missing")).await,
        Err(CrawlError::UnknownCrawler(_))
    ));
}
