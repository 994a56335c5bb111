//! Core ledger types for consensus validation

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hashing;

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// The all-zero hash, used as the genesis parent reference and as the
/// Merkle root of an empty transaction list.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Reference to one output of a prior transaction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash,
    pub index: u32,
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.txid), self.index)
    }
}

/// A spendable amount assigned to an opaque recipient identifier. No
/// authorization material is modeled; holding the identifier stands in for
/// the right to spend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub amount: u64,
    pub recipient: String,
}

/// An immutable transfer of value from consumed outputs to new outputs.
///
/// A coinbase transaction has no inputs and mints the block reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<OutPoint>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Content address of this transaction: identical inputs and outputs
    /// always produce the identical id.
    pub fn id(&self) -> Hash {
        hashing::txid(self)
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// The `index`-th output of this transaction as a spendable reference.
    pub fn outpoint(&self, index: u32) -> OutPoint {
        OutPoint {
            txid: self.id(),
            index,
        }
    }
}

/// Block header. `target` is the difficulty target the header hash must
/// stay strictly below; it is fixed configuration, never retargeted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub prev_hash: Hash,
    pub merkle_root: Hash,
    pub timestamp: u64,
    pub target: u128,
    pub nonce: u64,
}

/// Header plus ordered transactions, index 0 reserved for the coinbase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Hash of the serialized header.
    pub fn hash(&self) -> Hash {
        hashing::block_hash(&self.header)
    }
}
