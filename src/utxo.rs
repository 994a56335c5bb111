//! The unspent-transaction-output set
//!
//! Authoritative ledger state: a key exists here iff the corresponding
//! output has never been consumed by the currently-active chain. The only
//! mutation entry points are `apply` (validate-then-swap, atomic) and the
//! crate-internal per-transaction transition used while a block is being
//! connected. Readers clone a snapshot when they need an immutable view.

use std::collections::HashMap;

use crate::block;
use crate::error::Result;
use crate::types::{Block, OutPoint, Transaction, TxOutput};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtxoSet {
    entries: HashMap<OutPoint, TxOutput>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, outpoint: &OutPoint) -> Option<&TxOutput> {
        self.entries.get(outpoint)
    }

    pub fn contains(&self, outpoint: &OutPoint) -> bool {
        self.entries.contains_key(outpoint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutPoint, &TxOutput)> {
        self.entries.iter()
    }

    /// Sum of all unspent amounts owned by `recipient`. Linear scan.
    pub fn balance(&self, recipient: &str) -> u64 {
        self.entries
            .values()
            .filter(|output| output.recipient == recipient)
            .map(|output| output.amount)
            .sum()
    }

    /// Every unspent output owned by `recipient`, for coin selection by an
    /// external proposer. Sorted by outpoint so the listing is
    /// deterministic.
    pub fn owned_by(&self, recipient: &str) -> Vec<(OutPoint, TxOutput)> {
        let mut owned: Vec<(OutPoint, TxOutput)> = self
            .entries
            .iter()
            .filter(|(_, output)| output.recipient == recipient)
            .map(|(outpoint, output)| (outpoint.clone(), output.clone()))
            .collect();
        owned.sort_by(|a, b| a.0.cmp(&b.0));
        owned
    }

    /// Validate `block` against this set and, only if every transaction
    /// passes, replace this set with the successor state. A failure leaves
    /// the set untouched.
    pub fn apply(&mut self, block: &Block) -> Result<()> {
        let next = block::connect_block(block, self)?;
        *self = next;
        Ok(())
    }

    /// Unconditional single-transaction transition: consume the inputs,
    /// create the outputs. Callers must have validated `tx` first.
    pub(crate) fn apply_transaction(&mut self, tx: &Transaction) {
        for input in &tx.inputs {
            self.entries.remove(input);
        }
        let txid = tx.id();
        for (index, output) in tx.outputs.iter().enumerate() {
            self.entries.insert(
                OutPoint {
                    txid,
                    index: index as u32,
                },
                output.clone(),
            );
        }
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, outpoint: OutPoint, output: TxOutput) {
        self.entries.insert(outpoint, output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(amount: u64, recipient: &str) -> TxOutput {
        TxOutput {
            amount,
            recipient: recipient.to_string(),
        }
    }

    #[test]
    fn test_balance_sums_only_owned_outputs() {
        let mut set = UtxoSet::new();
        set.insert(
            OutPoint {
                txid: [1; 32],
                index: 0,
            },
            output(30, "alice"),
        );
        set.insert(
            OutPoint {
                txid: [1; 32],
                index: 1,
            },
            output(12, "alice"),
        );
        set.insert(
            OutPoint {
                txid: [2; 32],
                index: 0,
            },
            output(7, "bob"),
        );

        assert_eq!(set.balance("alice"), 42);
        assert_eq!(set.balance("bob"), 7);
        assert_eq!(set.balance("nobody"), 0);
    }

    #[test]
    fn test_owned_by_lists_spendable_references() {
        let mut set = UtxoSet::new();
        let alice_point = OutPoint {
            txid: [1; 32],
            index: 0,
        };
        set.insert(alice_point.clone(), output(30, "alice"));
        set.insert(
            OutPoint {
                txid: [2; 32],
                index: 0,
            },
            output(7, "bob"),
        );

        let owned = set.owned_by("alice");
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].0, alice_point);
        assert_eq!(owned[0].1.amount, 30);
    }

    #[test]
    fn test_apply_transaction_consumes_and_creates() {
        let mut set = UtxoSet::new();
        let coinbase = Transaction {
            inputs: vec![],
            outputs: vec![output(50, "alice")],
        };
        set.apply_transaction(&coinbase);
        assert_eq!(set.len(), 1);
        assert!(set.contains(&coinbase.outpoint(0)));

        let spend = Transaction {
            inputs: vec![coinbase.outpoint(0)],
            outputs: vec![output(20, "bob"), output(30, "alice")],
        };
        set.apply_transaction(&spend);
        assert_eq!(set.len(), 2);
        assert!(!set.contains(&coinbase.outpoint(0)));
        assert_eq!(set.balance("alice"), 30);
        assert_eq!(set.balance("bob"), 20);
    }
}
