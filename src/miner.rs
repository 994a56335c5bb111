//! Candidate assembly and the nonce search
//!
//! Mining is the one piece of the engine meant to run as a background
//! task: `mine` polls a shared cancellation flag between attempts so a
//! search on a stale parent can be stopped the moment a better tip lands.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

use crate::constants::BLOCK_REWARD;
use crate::hashing;
use crate::pow;
use crate::transaction::{check_transaction, check_tx_inputs};
use crate::types::{Block, BlockHeader, Hash, OutPoint, Transaction, TxOutput};
use crate::utxo::UtxoSet;

/// Outcome of a nonce search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningOutcome {
    Mined(Block),
    Cancelled,
    /// The entire nonce space failed the target. Unreachable for any
    /// satisfiable target, kept so the search is total.
    Exhausted,
}

/// The reward-minting transaction placed at index 0 of every candidate.
pub fn coinbase(recipient: &str) -> Transaction {
    Transaction {
        inputs: vec![],
        outputs: vec![TxOutput {
            amount: BLOCK_REWARD,
            recipient: recipient.to_string(),
        }],
    }
}

/// Filter `pending` down to transactions that are valid in block order
/// against `state`. Later entries may spend earlier entries' outputs;
/// stale or conflicting entries are dropped rather than poisoning the
/// candidate.
pub fn select_transactions(pending: &[Transaction], state: &UtxoSet) -> Vec<Transaction> {
    let mut scratch = state.clone();
    let mut spent: HashSet<_> = HashSet::new();
    let mut selected = Vec::new();

    for tx in pending {
        if tx.is_coinbase() {
            continue;
        }
        let txid = tx.id();
        let recreates = (0..tx.outputs.len() as u32)
            .any(|index| scratch.contains(&OutPoint { txid, index }));
        let admissible = !recreates
            && check_transaction(tx).is_ok()
            && check_tx_inputs(tx, &scratch, &spent).is_ok();
        if admissible {
            spent.extend(tx.inputs.iter().cloned());
            scratch.apply_transaction(tx);
            selected.push(tx.clone());
        } else {
            debug!("dropping stale transaction {}", hex::encode(tx.id()));
        }
    }
    selected
}

/// Assemble an unmined candidate on top of `parent`: coinbase first, then
/// the given transactions, with the Merkle root already committed in the
/// header. The nonce starts at zero; `mine` does the search.
pub fn build_candidate(
    parent: Hash,
    timestamp: u64,
    target: u128,
    reward_recipient: &str,
    txs: Vec<Transaction>,
) -> Block {
    let mut transactions = vec![coinbase(reward_recipient)];
    transactions.extend(txs);
    let merkle_root = hashing::merkle_root(&transactions);
    Block {
        header: BlockHeader {
            prev_hash: parent,
            merkle_root,
            timestamp,
            target,
            nonce: 0,
        },
        transactions,
    }
}

/// Search nonces from zero upward until the header hash meets the target
/// or `cancel` is raised by another thread.
pub fn mine(mut block: Block, cancel: &AtomicBool) -> MiningOutcome {
    let target = block.header.target;
    for nonce in 0..=u64::MAX {
        if cancel.load(Ordering::Relaxed) {
            debug!("mining cancelled at nonce {}", nonce);
            return MiningOutcome::Cancelled;
        }
        block.header.nonce = nonce;
        if pow::meets_target(&hashing::block_hash(&block.header), target) {
            return MiningOutcome::Mined(block);
        }
    }
    MiningOutcome::Exhausted
}
