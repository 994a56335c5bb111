//! Block validation and the UTXO state transition
//!
//! `connect_block` is the full validate-then-apply pipeline in the order
//! the consensus rules require: structure, proof of work, then the
//! transaction set against a scratch copy of the parent state. The caller's
//! set is never touched, so any rejection is trivially atomic.

use std::collections::HashSet;

use crate::error::{Result, ValidationError};
use crate::hashing;
use crate::pow;
use crate::transaction::{check_transaction, check_tx_inputs};
use crate::types::{Block, OutPoint};
use crate::utxo::UtxoSet;

/// Context-free structural validation: exactly one coinbase at index 0,
/// every transaction well-formed, Merkle root consistent with the
/// transaction list.
pub fn check_block(block: &Block) -> Result<()> {
    let Some(first) = block.transactions.first() else {
        return Err(ValidationError::Structural {
            reason: "block has no transactions".to_string(),
        });
    };
    if !first.is_coinbase() {
        return Err(ValidationError::Structural {
            reason: "first transaction is not a coinbase".to_string(),
        });
    }
    for (i, tx) in block.transactions.iter().enumerate().skip(1) {
        if tx.is_coinbase() {
            return Err(ValidationError::Structural {
                reason: format!("unexpected coinbase at index {}", i),
            });
        }
    }
    for tx in &block.transactions {
        check_transaction(tx)?;
    }
    if hashing::merkle_root(&block.transactions) != block.header.merkle_root {
        return Err(ValidationError::Structural {
            reason: "merkle root does not match transaction list".to_string(),
        });
    }
    Ok(())
}

/// Validate `block` against `utxo_set` and return the successor state.
///
/// Transactions are checked in block order against a scratch copy that
/// accumulates earlier transactions' outputs, so a block may chain
/// transactions spending each other's outputs. `utxo_set` itself is never
/// modified; on error the caller's state is exactly as it was.
pub fn connect_block(block: &Block, utxo_set: &UtxoSet) -> Result<UtxoSet> {
    check_block(block)?;
    pow::check_proof_of_work(&block.header)?;
    apply_transactions(block, utxo_set)
}

/// The transaction-set phase of validation, shared by `connect_block` and
/// the chain layer (which has already checked structure and PoW).
pub(crate) fn apply_transactions(block: &Block, utxo_set: &UtxoSet) -> Result<UtxoSet> {
    let mut next = utxo_set.clone();
    let mut spent_in_block: HashSet<OutPoint> = HashSet::new();

    for tx in &block.transactions {
        check_tx_inputs(tx, &next, &spent_in_block)?;

        // Ids are content addresses, so an exact duplicate of a transaction
        // whose outputs are still unspent would silently overwrite them.
        // Rejected instead; once the outputs are consumed the same content
        // may legitimately recur.
        let txid = tx.id();
        for index in 0..tx.outputs.len() as u32 {
            if next.contains(&OutPoint { txid, index }) {
                return Err(ValidationError::DuplicateTransaction { id: txid });
            }
        }

        spent_in_block.extend(tx.inputs.iter().cloned());
        next.apply_transaction(tx);
    }
    Ok(next)
}
