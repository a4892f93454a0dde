//! Error kinds surfaced by the seeding core.
//!
//! Lower layers have their own error enums ([`DbError`], [`CodecError`],
//! [`VerificationError`], [`BundleError`]). Everything reaching a caller is
//! folded into [`SeedError`], whose variants correspond to distinct recovery
//! actions: reject the input, treat a duplicate as a no-op, surface a
//! storage fault, proxy upstream, or answer 404.

use thiserror::Error;

use crate::bundle::BundleError;
use crate::codec::CodecError;
use crate::storage::DbError;
use crate::transaction::VerificationError;

#[derive(Debug, Error)]
pub enum SeedError {
    /// Bad signature or Merkle proof. Nothing was stored.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// A transaction or bundled item with this id is already stored.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// An input field could not be decoded or parsed.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("storage failure: {0}")]
    Storage(#[source] DbError),

    /// The id is unknown here; the caller should ask an upstream gateway.
    #[error("{0} not found locally")]
    NotFoundLocally(String),

    /// A manifest has no entry for the requested path. Not proxied.
    #[error("page not found: {0}")]
    PageNotFound(String),
}

pub type SeedResult<T> = Result<T, SeedError>;

impl SeedError {
    pub fn is_not_found_locally(&self) -> bool {
        matches!(self, Self::NotFoundLocally(_))
    }

    /// Short machine-readable name of the kind, for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::VerificationFailed(_) => "verification_failed",
            Self::AlreadyExists(_) => "already_exists",
            Self::MalformedInput(_) => "malformed_input",
            Self::Storage(_) => "storage",
            Self::NotFoundLocally(_) => "not_found_locally",
            Self::PageNotFound(_) => "page_not_found",
        }
    }
}

impl From<DbError> for SeedError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::KeyExists(id) => Self::AlreadyExists(id),
            other => Self::Storage(other),
        }
    }
}

impl From<VerificationError> for SeedError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::Codec(e) => Self::MalformedInput(e.to_string()),
            other => Self::VerificationFailed(other.to_string()),
        }
    }
}

impl From<CodecError> for SeedError {
    fn from(err: CodecError) -> Self {
        Self::MalformedInput(err.to_string())
    }
}

impl From<BundleError> for SeedError {
    fn from(err: BundleError) -> Self {
        if err.is_signature_failure() {
            Self::VerificationFailed(err.to_string())
        } else {
            Self::MalformedInput(err.to_string())
        }
    }
}
