//! Transaction validation
//!
//! Two layers: `check_transaction` is context-free well-formedness, and
//! `check_tx_inputs` is the contextual check against a UTXO set plus the
//! running set of keys consumed earlier in the same block. Both are pure;
//! callers mutate state only after validation succeeds.

use std::collections::HashSet;

use crate::constants::{BLOCK_REWARD, MAX_AMOUNT, MAX_INPUTS, MAX_OUTPUTS};
use crate::error::{Result, ValidationError};
use crate::types::{OutPoint, Transaction};
use crate::utxo::UtxoSet;

/// Context-free structural check.
///
/// A transaction is well-formed iff it has at least one output, stays
/// within the input/output count limits, and every output amount is within
/// the per-output cap. The caps also guarantee that block-level value sums
/// fit in `u64` without overflow.
pub fn check_transaction(tx: &Transaction) -> Result<()> {
    if tx.outputs.is_empty() {
        return Err(ValidationError::Structural {
            reason: "transaction has no outputs".to_string(),
        });
    }
    if tx.inputs.len() > MAX_INPUTS {
        return Err(ValidationError::Structural {
            reason: format!("too many inputs: {}", tx.inputs.len()),
        });
    }
    if tx.outputs.len() > MAX_OUTPUTS {
        return Err(ValidationError::Structural {
            reason: format!("too many outputs: {}", tx.outputs.len()),
        });
    }
    for (i, output) in tx.outputs.iter().enumerate() {
        if output.amount > MAX_AMOUNT {
            return Err(ValidationError::Structural {
                reason: format!("output {} amount {} exceeds cap", i, output.amount),
            });
        }
        if output.recipient.is_empty() {
            return Err(ValidationError::Structural {
                reason: format!("output {} has an empty recipient", i),
            });
        }
    }
    Ok(())
}

/// Contextual check of `tx` against `utxo_set` and the keys already
/// consumed earlier in the block being validated. Returns the fee
/// (`total_in - total_out`) on success.
///
/// Coinbase transactions skip the input and conservation checks; their
/// minted total is capped at the fixed block reward instead.
pub fn check_tx_inputs(
    tx: &Transaction,
    utxo_set: &UtxoSet,
    spent_in_block: &HashSet<OutPoint>,
) -> Result<u64> {
    if tx.is_coinbase() {
        let minted: u64 = tx.outputs.iter().map(|o| o.amount).sum();
        if minted > BLOCK_REWARD {
            return Err(ValidationError::InvalidCoinbase {
                minted,
                reward: BLOCK_REWARD,
            });
        }
        return Ok(0);
    }

    let mut seen: HashSet<&OutPoint> = HashSet::new();
    let mut total_in: u64 = 0;
    for input in &tx.inputs {
        // A key may repeat within one transaction or across transactions of
        // the same block; both are the same violation.
        if spent_in_block.contains(input) || !seen.insert(input) {
            return Err(ValidationError::DoubleSpendInBlock {
                outpoint: input.clone(),
            });
        }
        match utxo_set.get(input) {
            Some(utxo) => total_in += utxo.amount,
            None => {
                return Err(ValidationError::MissingInput {
                    outpoint: input.clone(),
                })
            }
        }
    }

    let total_out: u64 = tx.outputs.iter().map(|o| o.amount).sum();
    if total_in < total_out {
        return Err(ValidationError::ValueConservation { total_in, total_out });
    }
    Ok(total_in - total_out)
}
