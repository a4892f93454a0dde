//! # Read Path
//!
//! ```text
//! content.rs : ContentResolver: transaction → bundled item → not found locally
//! manifest.rs: ManifestData: path normalization and index fallback
//! ```
//!
//! Reads take no lock. A read racing an in-flight allocation sees the
//! state before it.

pub mod content;
pub mod manifest;

pub use content::{Content, ContentResolver, ContentSource};
pub use manifest::{ManifestData, ManifestIndex, ManifestResource};
