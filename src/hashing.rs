//! Hashing and Merkle root computation
//!
//! All identifiers are double SHA-256 over a fixed little-endian byte
//! serialization. Determinism is the only requirement here: two nodes
//! serializing the same value must hash it identically.

use sha2::{Digest, Sha256};

use crate::types::{BlockHeader, Hash, Transaction, ZERO_HASH};

/// Double SHA-256.
pub fn sha256d(data: &[u8]) -> Hash {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

/// Transaction id: hash of the canonical serialization of inputs and
/// outputs. Deliberately excludes anything else, so the id is a pure
/// function of transaction content.
pub fn txid(tx: &Transaction) -> Hash {
    let mut data = Vec::new();

    data.extend_from_slice(&(tx.inputs.len() as u32).to_le_bytes());
    for input in &tx.inputs {
        data.extend_from_slice(&input.txid);
        data.extend_from_slice(&input.index.to_le_bytes());
    }

    data.extend_from_slice(&(tx.outputs.len() as u32).to_le_bytes());
    for output in &tx.outputs {
        data.extend_from_slice(&output.amount.to_le_bytes());
        data.extend_from_slice(&(output.recipient.len() as u32).to_le_bytes());
        data.extend_from_slice(output.recipient.as_bytes());
    }

    sha256d(&data)
}

/// Hash of the serialized block header.
pub fn block_hash(header: &BlockHeader) -> Hash {
    let mut data = Vec::with_capacity(96);
    data.extend_from_slice(&header.prev_hash);
    data.extend_from_slice(&header.merkle_root);
    data.extend_from_slice(&header.timestamp.to_le_bytes());
    data.extend_from_slice(&header.target.to_le_bytes());
    data.extend_from_slice(&header.nonce.to_le_bytes());
    sha256d(&data)
}

/// Merkle root over a block's transaction list.
///
/// Leaves are transaction ids; levels pair up left to right, duplicating
/// the last id when a level has odd length. An empty list (the genesis
/// block only) yields the zero hash.
pub fn merkle_root(transactions: &[Transaction]) -> Hash {
    if transactions.is_empty() {
        return ZERO_HASH;
    }

    let mut level: Vec<Hash> = transactions.iter().map(txid).collect();
    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);
        for pair in level.chunks(2) {
            let right = pair.get(1).unwrap_or(&pair[0]);
            let mut combined = [0u8; 64];
            combined[..32].copy_from_slice(&pair[0]);
            combined[32..].copy_from_slice(right);
            next.push(sha256d(&combined));
        }
        level = next;
    }
    level[0]
}
