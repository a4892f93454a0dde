//! # Transaction Module
//!
//! Wire types, signing, construction and verification for format-2
//! transactions and the chunks that carry their payloads.
//!
//! ## Architecture
//!
//! ```text
//! types.rs       : Transaction, TransactionMeta, Chunk and TxOffset wire types
//! builder.rs     : Fluent TransactionBuilder producing a signed tx plus its chunks
//! signing.rs     : Deep-hash signature data and Ed25519 signing
//! verification.rs: Transaction signature and chunk Merkle-proof checks
//! ```
//!
//! ## Lifecycle
//!
//! 1. **Build**: [`TransactionBuilder`] chunks the payload and computes the
//!    data root.
//! 2. **Sign**: [`sign_transaction`] sets owner, signature and id.
//! 3. **Submit**: the transaction, then its chunks, go to a seeding node.
//! 4. **Verify**: the node runs [`verify_transaction`] and [`verify_chunk`]
//!    before anything is stored.

pub mod builder;
pub mod signing;
pub mod types;
pub mod verification;

pub use builder::{BuiltTransaction, TransactionBuilder};
pub use signing::{sign_transaction, signature_data, transaction_id};
pub use types::{Chunk, Transaction, TransactionMeta, TxOffset};
pub use verification::{verify_chunk, verify_transaction, VerificationError, VerifiedChunk};
