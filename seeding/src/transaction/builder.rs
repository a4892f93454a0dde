//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] assembles a format-2 transaction from a raw
//! payload: it chunks the payload, computes the data root, signs, and hands
//! back the signed transaction together with the wire chunks needed to
//! upload the payload out of band.
//!
//! Small payloads may also ride inline in the transaction's `data` field.

use super::signing::sign_transaction;
use super::types::{Chunk, Transaction};
use crate::codec::{b64_encode, encode_tags, CodecError, Tag};
use crate::config::{MAX_CHUNK_SIZE, TX_FORMAT};
use crate::crypto::keys::OwnerKeypair;
use crate::crypto::merkle::prepare_chunks;

/// A signed transaction plus the chunks that carry its payload.
#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    pub tx: Transaction,
    pub chunks: Vec<Chunk>,
}

/// Fluent builder for signed [`Transaction`] instances.
///
/// # Example
///
/// ```rust,ignore
/// let built = TransactionBuilder::new()
///     .data(b"<h1>hello</h1>".to_vec())
///     .tag("Content-Type", "text/html")
///     .build(&keypair)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    data: Vec<u8>,
    tags: Vec<Tag>,
    target: String,
    quantity: u64,
    reward: u64,
    last_tx: String,
    inline: bool,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self {
            inline: true,
            ..Default::default()
        }
    }

    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = data.into();
        self
    }

    /// Append a plain-text tag. Encoding happens at build time.
    pub fn tag(mut self, name: &str, value: &str) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    /// Recipient address, already base64url.
    pub fn target(mut self, target: &str) -> Self {
        self.target = target.to_string();
        self
    }

    pub fn quantity(mut self, quantity: u64) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn reward(mut self, reward: u64) -> Self {
        self.reward = reward;
        self
    }

    pub fn last_tx(mut self, last_tx: &str) -> Self {
        self.last_tx = last_tx.to_string();
        self
    }

    /// Never embed the payload in the transaction, even when it would fit.
    pub fn without_inline_data(mut self) -> Self {
        self.inline = false;
        self
    }

    /// Chunk the payload, sign, and produce the upload.
    ///
    /// The payload is inlined when it fits in a single chunk and inlining
    /// was not disabled.
    pub fn build(self, keypair: &OwnerKeypair) -> Result<BuiltTransaction, CodecError> {
        let data_size = self.data.len().to_string();
        let prepared = prepare_chunks(&self.data);
        let data_root = prepared
            .as_ref()
            .map(|p| b64_encode(&p.data_root))
            .unwrap_or_default();

        let inline = self.inline && (self.data.len() as u64) <= MAX_CHUNK_SIZE;

        let mut tx = Transaction {
            format: TX_FORMAT,
            last_tx: self.last_tx,
            tags: encode_tags(&self.tags),
            target: self.target,
            quantity: self.quantity.to_string(),
            reward: self.reward.to_string(),
            data: if inline {
                b64_encode(&self.data)
            } else {
                String::new()
            },
            data_size: data_size.clone(),
            data_root: data_root.clone(),
            ..Default::default()
        };
        sign_transaction(&mut tx, keypair)?;

        let chunks = match &prepared {
            Some(p) => (0..p.len())
                .filter_map(|i| Chunk::from_prepared(&data_root, &data_size, p, i, &self.data))
                .collect(),
            None => Vec::new(),
        };

        Ok(BuiltTransaction { tx, chunks })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{b64_decode, decode_tags};

    #[test]
    fn builds_signed_transaction_with_chunks() {
        let kp = OwnerKeypair::from_seed(&[3u8; 32]);
        let data = vec![0xabu8; 600 * 1024];
        let built = TransactionBuilder::new()
            .data(data.clone())
            .tag("Content-Type", "application/octet-stream")
            .build(&kp)
            .unwrap();

        assert_eq!(built.tx.format, TX_FORMAT);
        assert_eq!(built.tx.data_size, "614400");
        assert!(built.tx.data.is_empty(), "payload too large to inline");
        assert_eq!(built.chunks.len(), 3);

        let joined: Vec<u8> = built
            .chunks
            .iter()
            .flat_map(|c| b64_decode("chunk", &c.chunk).unwrap())
            .collect();
        assert_eq!(joined, data);
    }

    #[test]
    fn small_payload_is_inlined() {
        let kp = OwnerKeypair::from_seed(&[4u8; 32]);
        let built = TransactionBuilder::new()
            .data(b"hello".to_vec())
            .build(&kp)
            .unwrap();
        assert_eq!(b64_decode("data", &built.tx.data).unwrap(), b"hello");
        assert_eq!(built.chunks.len(), 1);
    }

    #[test]
    fn inlining_can_be_disabled() {
        let kp = OwnerKeypair::from_seed(&[4u8; 32]);
        let built = TransactionBuilder::new()
            .data(b"hello".to_vec())
            .without_inline_data()
            .build(&kp)
            .unwrap();
        assert!(built.tx.data.is_empty());
        assert_eq!(built.chunks.len(), 1);
    }

    #[test]
    fn empty_payload_has_no_root_and_no_chunks() {
        let kp = OwnerKeypair::from_seed(&[5u8; 32]);
        let built = TransactionBuilder::new().build(&kp).unwrap();
        assert_eq!(built.tx.data_size, "0");
        assert!(built.tx.data_root.is_empty());
        assert!(built.chunks.is_empty());
    }

    #[test]
    fn tags_are_wire_encoded() {
        let kp = OwnerKeypair::from_seed(&[6u8; 32]);
        let built = TransactionBuilder::new()
            .tag("App-Name", "permaseed")
            .build(&kp)
            .unwrap();
        assert_eq!(
            decode_tags(&built.tx.tags).unwrap(),
            vec![Tag::new("App-Name", "permaseed")]
        );
    }
}
