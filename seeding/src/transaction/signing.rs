//! Transaction signing.
//!
//! The signature covers the deep-hash of the format-2 field list:
//!
//! ```text
//! [ format, owner, target, quantity, reward, last_tx,
//!   [[tag.name, tag.value], ...], data_size, data_root ]
//! ```
//!
//! Binary fields are hashed in decoded form; `format`, `quantity`, `reward`
//! and `data_size` as their decimal strings. The inline `data` is not
//! covered directly, only through `data_root`.

use super::types::Transaction;
use crate::codec::{b64_decode, b64_encode, CodecError};
use crate::crypto::hash::{deep_hash, sha256, DeepHashItem};
use crate::crypto::keys::OwnerKeypair;

/// Compute the message an owner signs for `tx`.
pub fn signature_data(tx: &Transaction) -> Result<[u8; 48], CodecError> {
    let tags = tx
        .tags
        .iter()
        .map(|tag| {
            Ok(DeepHashItem::List(vec![
                DeepHashItem::blob(b64_decode("tag.name", &tag.name)?),
                DeepHashItem::blob(b64_decode("tag.value", &tag.value)?),
            ]))
        })
        .collect::<Result<Vec<_>, CodecError>>()?;

    let item = DeepHashItem::List(vec![
        DeepHashItem::blob(tx.format.to_string()),
        DeepHashItem::blob(b64_decode("owner", &tx.owner)?),
        DeepHashItem::blob(b64_decode("target", &tx.target)?),
        DeepHashItem::blob(tx.quantity.as_bytes()),
        DeepHashItem::blob(tx.reward.as_bytes()),
        DeepHashItem::blob(b64_decode("last_tx", &tx.last_tx)?),
        DeepHashItem::List(tags),
        DeepHashItem::blob(tx.data_size.as_bytes()),
        DeepHashItem::blob(b64_decode("data_root", &tx.data_root)?),
    ]);

    Ok(deep_hash(&item))
}

/// Derive a transaction (or bundled item) id from its raw signature.
pub fn transaction_id(signature: &[u8]) -> String {
    b64_encode(&sha256(signature))
}

/// Sign `tx` in place: sets `owner`, `signature` and `id`.
pub fn sign_transaction<'a>(
    tx: &'a mut Transaction,
    keypair: &OwnerKeypair,
) -> Result<&'a Transaction, CodecError> {
    tx.owner = b64_encode(&keypair.owner_bytes());
    let message = signature_data(tx)?;
    let signature = keypair.sign(&message);
    tx.signature = b64_encode(&signature);
    tx.id = transaction_id(&signature);
    Ok(tx)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_tags, Tag};

    fn unsigned() -> Transaction {
        Transaction {
            format: 2,
            quantity: "0".into(),
            reward: "0".into(),
            data_size: "0".into(),
            tags: encode_tags(&[Tag::new("App-Name", "permaseed")]),
            ..Default::default()
        }
    }

    #[test]
    fn signing_sets_owner_signature_and_id() {
        let kp = OwnerKeypair::from_seed(&[1u8; 32]);
        let mut tx = unsigned();
        sign_transaction(&mut tx, &kp).unwrap();

        assert_eq!(tx.owner, b64_encode(&kp.owner_bytes()));
        let sig = b64_decode("signature", &tx.signature).unwrap();
        assert_eq!(sig.len(), 64);
        assert_eq!(tx.id, transaction_id(&sig));
    }

    #[test]
    fn signature_data_covers_tags() {
        let mut a = unsigned();
        a.owner = b64_encode(&[1u8; 32]);
        let mut b = a.clone();
        b.tags = encode_tags(&[Tag::new("App-Name", "other")]);
        assert_ne!(signature_data(&a).unwrap(), signature_data(&b).unwrap());
    }

    #[test]
    fn signature_data_ignores_inline_data() {
        let mut a = unsigned();
        let mut b = a.clone();
        a.data = "AAAA".into();
        b.data = "BBBB".into();
        assert_eq!(signature_data(&a).unwrap(), signature_data(&b).unwrap());
    }

    #[test]
    fn bad_base64_field_is_reported() {
        let mut tx = unsigned();
        tx.data_root = "%%%".into();
        let err = signature_data(&tx).unwrap_err();
        assert!(matches!(err, CodecError::InvalidBase64 { field: "data_root", .. }));
    }
}
