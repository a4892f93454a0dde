//! # Owner Keys
//!
//! Ed25519 keypairs for transaction owners. The owner field of a
//! transaction carries the 32-byte verifying key, base64url-encoded; the
//! signature is 64 bytes over the transaction's deep-hash.
//!
//! Key bytes are never logged.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::config::{OWNER_KEY_LENGTH, SIGNATURE_LENGTH};

/// Errors during signature checks.
///
/// Intentionally vague about why a check failed.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signature verification failed")]
    VerificationFailed,

    #[error("invalid signature bytes: expected 64 bytes")]
    InvalidSignatureBytes,

    #[error("invalid owner key: expected a 32-byte Ed25519 point")]
    InvalidOwnerKey,
}

/// A transaction owner's signing keypair.
///
/// Deliberately not `Serialize`: exporting a secret key should be an
/// explicit call to [`OwnerKeypair::secret_key_bytes`].
pub struct OwnerKeypair {
    signing_key: SigningKey,
}

impl OwnerKeypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. Handy in tests.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// The owner key as it appears on the wire (before base64url).
    pub fn owner_bytes(&self) -> [u8; OWNER_KEY_LENGTH] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Sign a message, returning the raw 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.signing_key.sign(message).to_bytes()
    }
}

/// Verify an owner signature from raw wire bytes.
pub fn verify_owner_signature(
    owner: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let owner: &[u8; OWNER_KEY_LENGTH] =
        owner.try_into().map_err(|_| SignatureError::InvalidOwnerKey)?;
    let signature: &[u8; SIGNATURE_LENGTH] = signature
        .try_into()
        .map_err(|_| SignatureError::InvalidSignatureBytes)?;

    let verifying_key =
        VerifyingKey::from_bytes(owner).map_err(|_| SignatureError::InvalidOwnerKey)?;
    let signature = Signature::from_bytes(signature);

    verifying_key
        .verify(message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}
