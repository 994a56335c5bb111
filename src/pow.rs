//! Proof of work
//!
//! A header is valid when the big-endian integer prefix of its hash is
//! strictly below the difficulty target. Work per block is inversely
//! proportional to the target, so chain selection by cumulative work
//! prefers harder chains regardless of block count.

use crate::error::{Result, ValidationError};
use crate::hashing;
use crate::types::{BlockHeader, Hash};

/// The `u128` encoded by the first 16 bytes of a hash, big-endian.
fn hash_value(hash: &Hash) -> u128 {
    let mut prefix = [0u8; 16];
    prefix.copy_from_slice(&hash[..16]);
    u128::from_be_bytes(prefix)
}

/// `true` when `hash` satisfies `target`.
pub fn meets_target(hash: &Hash, target: u128) -> bool {
    hash_value(hash) < target
}

/// Check the header's proof of work. Runs before any transaction or UTXO
/// inspection during block validation.
pub fn check_proof_of_work(header: &BlockHeader) -> Result<()> {
    let hash = hashing::block_hash(header);
    if !meets_target(&hash, header.target) {
        return Err(ValidationError::InvalidPow {
            hash,
            target: header.target,
        });
    }
    Ok(())
}

/// Work contributed by one block at the given target. A target of zero is
/// unsatisfiable, so the clamp never distorts a reachable chain.
pub fn block_work(target: u128) -> u128 {
    u128::MAX / target.max(1)
}
