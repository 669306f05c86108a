//! Result document persistence
//!
//! The document is append-only: `initialize` resets it once per invocation,
//! `append` extends its `results` list after every completed configuration.
//! Appends edit the raw JSON tree so fields written by other tools survive,
//! and every write goes through a temporary file renamed over the target.

use crate::error::StoreError;
use md_bench_common::{InventorySnapshot, Metadata, ResultDocument, SummaryRecord};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

const RESULTS_KEY: &str = "results";

/// Create the document with metadata, inventory and no results,
/// overwriting whatever was at `path`
pub fn initialize(
    path: &Path,
    meta: &Metadata,
    specs: &InventorySnapshot,
) -> Result<(), StoreError> {
    let document = ResultDocument::new(meta.clone(), specs.clone());
    write_atomic(path, &document)?;
    info!(path = %path.display(), "Results file initialized");
    Ok(())
}

/// Append records in order, creating `{"results": []}` first if the file is
/// missing or empty.
///
/// # Returns
/// The total number of records in the document after the append
pub fn append(path: &Path, records: &[SummaryRecord]) -> Result<usize, StoreError> {
    let mut document = read_or_empty(path)?;

    let root = document
        .as_object_mut()
        .ok_or_else(|| StoreError::Malformed {
            path: path.to_path_buf(),
            detail: "top level is not an object".to_string(),
        })?;
    let results = root
        .entry(RESULTS_KEY)
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
        .ok_or_else(|| StoreError::Malformed {
            path: path.to_path_buf(),
            detail: format!("'{RESULTS_KEY}' is not an array"),
        })?;

    for record in records {
        let value = serde_json::to_value(record).map_err(|source| StoreError::Serialize {
            path: path.to_path_buf(),
            source,
        })?;
        results.push(value);
    }
    let total = results.len();

    write_atomic(path, &document)?;
    info!(
        path = %path.display(),
        appended = records.len(),
        total,
        "Results appended"
    );
    Ok(total)
}

/// Load the document as typed values
pub fn load(path: &Path) -> Result<ResultDocument, StoreError> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_or_empty(path: &Path) -> Result<Value, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if content.trim().is_empty() {
        debug!(path = %path.display(), "Results file missing or empty, starting a new document");
        return Ok(serde_json::json!({ "results": [] }));
    }

    serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write to a sibling temporary file and rename it over `path`, so an
/// interrupted write leaves the previous document intact
fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let write_err = |source: std::io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;

    serde_json::to_writer_pretty(&mut tmp, value).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    tmp.write_all(b"\n").map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
