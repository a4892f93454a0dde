//! # Bundled Items
//!
//! A bundle packs many signed items into one transaction's payload. The
//! node stores items individually, keyed by item id, and decodes them on
//! read.
//!
//! ```text
//! avro.rs: tag array encoding (zigzag varint blocks)
//! item.rs: binary item decoding, signature data, Ed25519 item builder
//! ```

pub mod avro;
pub mod item;

use thiserror::Error;

use crate::codec::CodecError;

pub use item::{decode_bundle_item, BundleItem, BundleItemBuilder};

/// Signature schemes an item may be signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureType {
    /// RSA-PSS with a 4096-bit Arweave wallet key.
    Arweave,
    Ed25519,
    /// secp256k1, uncompressed public key.
    Ethereum,
    Solana,
}

impl SignatureType {
    pub fn from_code(code: u16) -> Result<Self, BundleError> {
        match code {
            1 => Ok(Self::Arweave),
            2 => Ok(Self::Ed25519),
            3 => Ok(Self::Ethereum),
            4 => Ok(Self::Solana),
            other => Err(BundleError::UnknownSignatureType(other)),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Self::Arweave => 1,
            Self::Ed25519 => 2,
            Self::Ethereum => 3,
            Self::Solana => 4,
        }
    }

    pub fn signature_length(self) -> usize {
        match self {
            Self::Arweave => 512,
            Self::Ed25519 | Self::Solana => 64,
            Self::Ethereum => 65,
        }
    }

    pub fn owner_length(self) -> usize {
        match self {
            Self::Arweave => 512,
            Self::Ed25519 | Self::Solana => 32,
            Self::Ethereum => 65,
        }
    }

    pub fn is_ed25519(self) -> bool {
        matches!(self, Self::Ed25519 | Self::Solana)
    }
}

/// Errors raised while decoding or checking a bundled item.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("unknown signature type {0}")]
    UnknownSignatureType(u16),

    #[error("item truncated at byte {offset}: need {needed}, have {available}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("invalid presence flag {flag} for {field}")]
    InvalidPresenceByte { field: &'static str, flag: u8 },

    #[error("invalid tags: {0}")]
    InvalidTags(String),

    #[error("item declares {declared} tags but carries {actual}")]
    TagCountMismatch { declared: u64, actual: usize },

    #[error("cannot verify {0:?} item signatures")]
    UnsupportedSignature(SignatureType),

    #[error("item signature does not verify")]
    InvalidSignature,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl BundleError {
    /// True when the item decoded but its signature was not accepted.
    pub fn is_signature_failure(&self) -> bool {
        matches!(self, Self::UnsupportedSignature(_) | Self::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_type_codes_round_trip() {
        for code in 1..=4u16 {
            assert_eq!(SignatureType::from_code(code).unwrap().code(), code);
        }
        assert!(SignatureType::from_code(0).is_err());
    }

    #[test]
    fn solana_items_use_ed25519_lengths() {
        let solana = SignatureType::Solana;
        assert!(solana.is_ed25519());
        assert_eq!(solana.signature_length(), 64);
        assert_eq!(solana.owner_length(), 32);
        assert!(!SignatureType::Ethereum.is_ed25519());
    }
}
