//! Content resolution.
//!
//! An id is tried as a transaction first, then as a bundled item. Each
//! lookup returns `Ok(None)` on a miss so the chain stays composable; only
//! [`ContentResolver::resolve`] turns a double miss into
//! [`SeedError::NotFoundLocally`].

use serde::Serialize;
use tracing::debug;

use super::manifest::ManifestData;
use crate::bundle::decode_bundle_item;
use crate::codec::{b64_decode, find_tag, Tag};
use crate::config::{CONTENT_TYPE_TAG, MANIFEST_CONTENT_TYPE};
use crate::error::{SeedError, SeedResult};
use crate::ingest::TxRegion;
use crate::storage::{DbError, SeedDB};
use crate::transaction::TransactionMeta;

/// Which representation an id resolved through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Transaction,
    BundleItem,
}

/// Resolved content: decoded tags plus raw payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub id: String,
    pub source: ContentSource,
    pub tags: Vec<Tag>,
    pub data: Vec<u8>,
}

impl Content {
    pub fn content_type(&self) -> Option<&str> {
        find_tag(&self.tags, CONTENT_TYPE_TAG)
    }

    pub fn is_manifest(&self) -> bool {
        self.content_type() == Some(MANIFEST_CONTENT_TYPE)
    }
}

#[derive(Debug, Clone)]
pub struct ContentResolver {
    db: SeedDB,
}

impl ContentResolver {
    pub fn new(db: SeedDB) -> Self {
        Self { db }
    }

    /// Resolve an id to its tags and bytes.
    pub fn resolve(&self, id: &str) -> SeedResult<Content> {
        if let Some(content) = self.lookup_transaction(id)? {
            return Ok(content);
        }
        if let Some(content) = self.lookup_bundle_item(id)? {
            return Ok(content);
        }
        debug!(id, "not found locally");
        Err(SeedError::NotFoundLocally(id.to_string()))
    }

    /// Resolve an id as a transaction, reassembling its payload from
    /// stored chunks.
    pub fn lookup_transaction(&self, id: &str) -> SeedResult<Option<Content>> {
        let Some(meta) = self.db.load_tx_meta(id)? else {
            return Ok(None);
        };
        let data = self.tx_data(&meta)?;
        let tags = meta.decoded_tags()?;
        Ok(Some(Content {
            id: id.to_string(),
            source: ContentSource::Transaction,
            tags,
            data,
        }))
    }

    /// Resolve an id as a stored bundled item.
    pub fn lookup_bundle_item(&self, id: &str) -> SeedResult<Option<Content>> {
        let Some(binary) = self.db.load_bundle_item(id)? else {
            return Ok(None);
        };
        let item = decode_bundle_item(&binary)?;
        let data = b64_decode("data", &item.data)?;
        Ok(Some(Content {
            id: id.to_string(),
            source: ContentSource::BundleItem,
            tags: item.tags,
            data,
        }))
    }

    /// Reassemble a transaction's payload by walking its chunk keys from
    /// `end - size` up to `end`.
    ///
    /// A missing allocation or chunk is a storage error: the metadata says
    /// the bytes should be here.
    pub fn tx_data(&self, meta: &TransactionMeta) -> SeedResult<Vec<u8>> {
        let data_size = meta.data_size()?;
        if data_size == 0 {
            return Ok(Vec::new());
        }
        let data_root = b64_decode("data_root", &meta.data_root)?;
        let end_offset = self
            .db
            .load_tx_data_end_offset(&data_root, data_size)?
            .ok_or_else(|| DbError::NotFound(format!("end offset of {}", meta.id)))?;

        let region = TxRegion::new(end_offset, data_size);
        let mut cursor = region
            .first_chunk_offset()
            .ok_or_else(|| DbError::Serialization(format!("inconsistent region for {}", meta.id)))?;

        let mut data = Vec::new();
        while cursor < end_offset {
            let chunk = self
                .db
                .load_chunk(cursor)?
                .ok_or_else(|| DbError::NotFound(format!("chunk at offset {cursor}")))?;
            let bytes = b64_decode("chunk", &chunk.chunk)?;
            if bytes.is_empty() {
                return Err(DbError::Serialization(format!("empty chunk at offset {cursor}")).into());
            }
            cursor = cursor.checked_add(bytes.len() as u64).ok_or_else(|| {
                DbError::Serialization(format!("chunk at offset {cursor} overflows the address space"))
            })?;
            data.extend_from_slice(&bytes);
        }

        if data.len() as u64 != data_size {
            return Err(DbError::Serialization(format!(
                "reassembled {} bytes for {}, expected {data_size}",
                data.len(),
                meta.id
            ))
            .into());
        }
        Ok(data)
    }

    /// Resolve `path` through a manifest document, then resolve the id it
    /// names. A local miss on that id is passed through unchanged.
    pub fn resolve_manifest(&self, manifest: &[u8], path: &str) -> SeedResult<Content> {
        let manifest = ManifestData::from_slice(manifest)?;
        let id = manifest.lookup(path)?;
        self.resolve(id)
    }

    /// Resolve `id`, then `path` within it.
    ///
    /// Only manifests have paths; any non-empty path under other content is
    /// [`SeedError::PageNotFound`].
    pub fn resolve_path(&self, id: &str, path: &str) -> SeedResult<Content> {
        let content = self.resolve(id)?;
        if content.is_manifest() {
            return self.resolve_manifest(&content.data, path);
        }
        if path.trim_matches('/').is_empty() {
            Ok(content)
        } else {
            Err(SeedError::PageNotFound(format!("{id}/{path}")))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
