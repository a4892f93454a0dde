//! Path manifests.
//!
//! ```json
//! {
//!   "manifest": "arweave/paths",
//!   "version": "0.1.0",
//!   "index": { "path": "index.html" },
//!   "paths": { "index.html": { "txId": "<id>" } }
//! }
//! ```
//!
//! Lookups strip one leading and one trailing `/`. An empty path means the
//! index. A request ending in `/` that misses falls back to
//! `<path>/index.html`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_INDEX_FILE;
use crate::error::{SeedError, SeedResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestData {
    pub manifest: String,
    pub version: String,
    pub index: ManifestIndex,
    pub paths: BTreeMap<String, ManifestResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestIndex {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestResource {
    #[serde(rename = "txId")]
    pub tx_id: String,
}

impl ManifestData {
    /// Parse a manifest document. Malformed JSON is
    /// [`SeedError::MalformedInput`].
    pub fn from_slice(bytes: &[u8]) -> SeedResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| SeedError::MalformedInput(format!("invalid manifest: {e}")))
    }

    /// Map a requested path to the id it names.
    pub fn lookup(&self, requested: &str) -> SeedResult<&str> {
        let trimmed = requested.strip_prefix('/').unwrap_or(requested);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

        let path = if trimmed.is_empty() {
            if self.index.path.is_empty() {
                return Err(SeedError::PageNotFound(requested.to_string()));
            }
            self.index.path.as_str()
        } else {
            trimmed
        };

        if let Some(resource) = self.paths.get(path) {
            return Ok(&resource.tx_id);
        }
        if requested.ends_with('/') {
            let directory_index = format!("{path}/{DEFAULT_INDEX_FILE}");
            if let Some(resource) = self.paths.get(&directory_index) {
                return Ok(&resource.tx_id);
            }
        }
        Err(SeedError::PageNotFound(requested.to_string()))
    }
}
