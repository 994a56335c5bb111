//! Validation error taxonomy
//!
//! Every variant is pure data: the kind of violation plus the offending
//! identifiers. None of them are retryable by the engine; a rejected
//! transaction or block must be corrected or discarded upstream.

use thiserror::Error;

use crate::types::{Hash, OutPoint};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Malformed block or transaction: bad coinbase placement, Merkle root
    /// mismatch, amount or count limits exceeded.
    #[error("structural violation: {reason}")]
    Structural { reason: String },

    /// Header hash does not meet the difficulty target.
    #[error("hash {} does not meet difficulty target {:#034x}", hex::encode(.hash), .target)]
    InvalidPow { hash: Hash, target: u128 },

    /// The referenced parent block is not in the store. Orphans are
    /// rejected, never buffered.
    #[error("parent block {} is unknown", hex::encode(.hash))]
    UnknownParent { hash: Hash },

    /// An input references an output absent from the UTXO set.
    #[error("input {outpoint} is not an unspent output")]
    MissingInput { outpoint: OutPoint },

    /// An input key was already consumed earlier in the same block (or
    /// earlier in the same transaction).
    #[error("input {outpoint} is spent twice within one block")]
    DoubleSpendInBlock { outpoint: OutPoint },

    /// Outputs exceed inputs; value may be burned as fee but never created.
    #[error("outputs total {total_out} but inputs provide only {total_in}")]
    ValueConservation { total_in: u64, total_out: u64 },

    /// A coinbase transaction mints more than the fixed block reward.
    #[error("coinbase mints {minted}, above the block reward of {reward}")]
    InvalidCoinbase { minted: u64, reward: u64 },

    /// Exact duplicate by content address: the id is already pending in
    /// the pool, or its outputs are still unspent in the ledger.
    #[error("transaction {} is an exact duplicate", hex::encode(.id))]
    DuplicateTransaction { id: Hash },
}

pub type Result<T> = std::result::Result<T, ValidationError>;
