//! JSON Lines and JSON writers plus the run summary and manifest
//!
//! Layout under the output root:
//!
//! ```text
//! <out>/latest/urls.jsonl     one record per line, sorted keys
//! <out>/latest/summary.json   run date, crawler, row count, per-crawler stats
//! <out>/latest/manifest.json  path, rows, sha256 and size of each output
//! ```

use crate::output::record::UrlRecord;
use crate::output::stats::CrawlStats;
use crate::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 1;

/// Contents of `summary.json`
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_date_utc: String,
    pub started_at_utc: String,

    /// Selected crawler name, or "all"
    pub crawler: String,

    pub rows: usize,

    pub crawlers: Vec<CrawlStats>,
}

/// One file listed in the manifest
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,

    pub sha256: String,
    pub bytes: u64,
}

/// Contents of `manifest.json`
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub run_date_utc: String,
    pub generated_at_utc: String,
    pub schema_version: u32,
    pub outputs: Vec<ManifestEntry>,
}

/// Writes one JSON object per line with keys in sorted order
///
/// Returns the number of rows written.
pub fn write_jsonl(path: &Path, records: &[UrlRecord]) -> Result<usize> {
    ensure_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);

    for record in records {
        // Round-tripping through Value sorts object keys
        let value = serde_json::to_value(record)?;
        serde_json::to_writer(&mut writer, &value)?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    Ok(records.len())
}

/// Writes a pretty-printed JSON document with sorted keys and a trailing newline
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let value = serde_json::to_value(value)?;
    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}

/// Hex SHA-256 of a file's contents
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 1024 * 1024];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

fn manifest_entry(path: &Path, rows: Option<usize>) -> Result<ManifestEntry> {
    Ok(ManifestEntry {
        path: path.to_string_lossy().replace('\\', "/"),
        rows,
        sha256: sha256_file(path)?,
        bytes: fs::metadata(path)?.len(),
    })
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Paths of the files written by [`write_run_outputs`]
#[derive(Debug, Clone)]
pub struct RunOutputs {
    pub urls: PathBuf,
    pub summary: PathBuf,
    pub manifest: PathBuf,
    pub rows: usize,
}

/// Writes `urls.jsonl`, `summary.json` and `manifest.json` under `<out_root>/latest`
///
/// `records` must already be in their final order.
pub fn write_run_outputs(
    out_root: &Path,
    records: &[UrlRecord],
    summary: &RunSummary,
    generated_at_utc: &str,
) -> Result<RunOutputs> {
    let latest = out_root.join("latest");
    let urls = latest.join("urls.jsonl");
    let summary_path = latest.join("summary.json");
    let manifest_path = latest.join("manifest.json");

    let rows = write_jsonl(&urls, records)?;
    write_json(&summary_path, summary)?;

    let manifest = Manifest {
        run_date_utc: summary.run_date_utc.clone(),
        generated_at_utc: generated_at_utc.to_string(),
        schema_version: SCHEMA_VERSION,
        outputs: vec![
            manifest_entry(&urls, Some(rows))?,
            manifest_entry(&summary_path, None)?,
        ],
    };
    write_json(&manifest_path, &manifest)?;

    Ok(RunOutputs {
        urls,
        summary: summary_path,
        manifest: manifest_path,
        rows,
    })
}
