//! Result document layout
//!
//! ```text
//! { "meta": {...}, "specs": {...}, "results": [ SummaryRecord, ... ] }
//! ```
//!
//! `meta` and `specs` are absent when the document was auto-created by an
//! append against a missing or empty file.

use crate::inventory::InventorySnapshot;
use crate::record::SummaryRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static description of the benchmark suite and invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Suite name
    #[serde(default)]
    pub suite: String,
    /// Harness version
    #[serde(default)]
    pub version: String,
    /// Benchmark family run by this invocation
    #[serde(default)]
    pub family: String,
    /// When the document was initialized
    pub created_at: Option<DateTime<Utc>>,
    /// Additional user-supplied fields, merged verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Metadata {
    pub fn new(suite: impl Into<String>, version: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            version: version.into(),
            family: family.into(),
            created_at: Some(Utc::now()),
            extra: serde_json::Map::new(),
        }
    }

    /// Merge extra fields; keys already set on the struct are not overridden
    pub fn with_extra(mut self, extra: serde_json::Map<String, serde_json::Value>) -> Self {
        for (key, value) in extra {
            if matches!(key.as_str(), "suite" | "version" | "family" | "created_at") {
                continue;
            }
            self.extra.insert(key, value);
        }
        self
    }
}

/// The on-disk aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<InventorySnapshot>,
    #[serde(default)]
    pub results: Vec<SummaryRecord>,
}

impl ResultDocument {
    /// Fresh document with metadata, inventory and no results
    pub fn new(meta: Metadata, specs: InventorySnapshot) -> Self {
        Self {
            meta: Some(meta),
            specs: Some(specs),
            results: Vec::new(),
        }
    }
}
