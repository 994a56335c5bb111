//! Chain selection and the authoritative ledger state
//!
//! `Blockchain` owns the block store, the set of known tips, the pending
//! transaction pool, and the active UTXO set. The active chain is always
//! the tip with the greatest cumulative work (lowest tip hash on a tie),
//! and the active UTXO set is by construction the replay of that chain
//! from genesis. Every mutating operation takes `&mut self`, so the
//! submit-validate-apply sequence can never interleave.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;

use log::{debug, info};

use crate::block;
use crate::constants::{DEFAULT_TARGET, GENESIS_TIMESTAMP};
use crate::error::{Result, ValidationError};
use crate::hashing;
use crate::miner::{self, MiningOutcome};
use crate::pow;
use crate::transaction::{check_transaction, check_tx_inputs};
use crate::types::{Block, BlockHeader, Hash, OutPoint, Transaction, ZERO_HASH};
use crate::utxo::UtxoSet;

/// Outcome of accepting a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    /// The active tip was extended by one block.
    Extended,
    /// A side chain was created or extended without overtaking the active
    /// chain.
    ForkCreated,
    /// A side chain overtook the active chain; `depth` blocks of the old
    /// active chain were abandoned.
    Reorged { depth: usize },
}

/// The designated first block: no transactions, zero parent hash, fixed
/// timestamp. It is constructed, never validated, and every chain replays
/// forward from the empty UTXO state it leaves behind.
pub fn genesis_block(target: u128) -> Block {
    Block {
        header: BlockHeader {
            prev_hash: ZERO_HASH,
            merkle_root: hashing::merkle_root(&[]),
            timestamp: GENESIS_TIMESTAMP,
            target,
            nonce: 0,
        },
        transactions: vec![],
    }
}

#[derive(Debug, Clone)]
struct BlockEntry {
    block: Block,
    height: u64,
    cumulative_work: u128,
}

pub struct Blockchain {
    /// Difficulty target handed to candidates; fixed configuration.
    target: u128,
    blocks: HashMap<Hash, BlockEntry>,
    tips: HashSet<Hash>,
    genesis_hash: Hash,
    active_tip: Hash,
    active_utxos: UtxoSet,
    pending: Vec<Transaction>,
}

impl Blockchain {
    pub fn new(target: u128) -> Self {
        let genesis = genesis_block(target);
        let genesis_hash = genesis.hash();
        let mut blocks = HashMap::new();
        blocks.insert(
            genesis_hash,
            BlockEntry {
                block: genesis,
                height: 0,
                cumulative_work: pow::block_work(target),
            },
        );
        Self {
            target,
            blocks,
            tips: HashSet::from([genesis_hash]),
            genesis_hash,
            active_tip: genesis_hash,
            active_utxos: UtxoSet::new(),
            pending: Vec::new(),
        }
    }

    /// Pool-admission check against the current active UTXO state only.
    /// Not binding: block assembly re-validates, since the active chain
    /// may move underneath the pool.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<()> {
        check_transaction(&tx)?;
        if tx.is_coinbase() {
            return Err(ValidationError::Structural {
                reason: "coinbase transactions cannot be submitted to the pool".to_string(),
            });
        }
        let id = tx.id();
        if self.pending.iter().any(|pending| pending.id() == id) {
            return Err(ValidationError::DuplicateTransaction { id });
        }
        // Same rule as block validation: content already represented by
        // unspent outputs is an exact duplicate.
        if (0..tx.outputs.len() as u32)
            .any(|index| self.active_utxos.contains(&OutPoint { txid: id, index }))
        {
            return Err(ValidationError::DuplicateTransaction { id });
        }
        check_tx_inputs(&tx, &self.active_utxos, &HashSet::new())?;
        debug!("transaction {} admitted to pending pool", hex::encode(id));
        self.pending.push(tx);
        Ok(())
    }

    /// Validate `block` against the state implied by its parent chain and
    /// store it, switching the active chain if the new tip carries more
    /// cumulative work. Rejection never mutates any state.
    pub fn submit_block(&mut self, block: Block) -> Result<ChainEvent> {
        let hash = block.hash();
        if self.blocks.contains_key(&hash) {
            return Err(ValidationError::Structural {
                reason: format!("block {} is already known", hex::encode(hash)),
            });
        }

        block::check_block(&block)?;
        pow::check_proof_of_work(&block.header)?;

        let parent_hash = block.header.prev_hash;
        let (parent_height, parent_work) = match self.blocks.get(&parent_hash) {
            Some(parent) => (parent.height, parent.cumulative_work),
            None => return Err(ValidationError::UnknownParent { hash: parent_hash }),
        };
        let height = parent_height + 1;
        let cumulative_work = parent_work.saturating_add(pow::block_work(block.header.target));

        // The parent chain's state, not necessarily the active one: a fork
        // block is validated against its own history and never touches the
        // active set unless it wins.
        let extends_active = parent_hash == self.active_tip;
        let parent_state = if extends_active {
            self.active_utxos.clone()
        } else {
            self.replay(parent_hash)?
        };
        let next_state = block::apply_transactions(&block, &parent_state)?;

        let active_tip = self.active_tip;
        let active_work = self.work_at(&active_tip);

        let event = if extends_active {
            info!(
                "active chain extended to height {} by {}",
                height,
                hex::encode(hash)
            );
            ChainEvent::Extended
        } else if cumulative_work > active_work
            || (cumulative_work == active_work && hash < active_tip)
        {
            let depth = self.reorg_depth(active_tip, parent_hash)?;
            info!(
                "reorg to {}: {} block(s) abandoned, work {} over {}",
                hex::encode(hash),
                depth,
                cumulative_work,
                active_work
            );
            ChainEvent::Reorged { depth }
        } else {
            debug!(
                "fork block {} stored at height {}, work {} does not overtake {}",
                hex::encode(hash),
                height,
                cumulative_work,
                active_work
            );
            ChainEvent::ForkCreated
        };

        if !matches!(event, ChainEvent::ForkCreated) {
            // Swap only after the full replay/validation succeeded.
            self.active_utxos = next_state;
            self.active_tip = hash;
            self.prune_pending(&block);
        }

        self.tips.remove(&parent_hash);
        self.tips.insert(hash);
        self.blocks.insert(
            hash,
            BlockEntry {
                block,
                height,
                cumulative_work,
            },
        );
        Ok(event)
    }

    /// Drain the pending pool into a candidate on the active tip, mine it,
    /// and submit the result. Returns `None` when there is nothing to mine
    /// or the search was cancelled.
    pub fn mine_pending(
        &mut self,
        reward_recipient: &str,
        timestamp: u64,
        cancel: &AtomicBool,
    ) -> Result<Option<Block>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        let selected = miner::select_transactions(&self.pending, &self.active_utxos);
        let candidate = miner::build_candidate(
            self.active_tip,
            timestamp,
            self.target,
            reward_recipient,
            selected,
        );
        match miner::mine(candidate, cancel) {
            MiningOutcome::Mined(block) => {
                self.submit_block(block.clone())?;
                Ok(Some(block))
            }
            MiningOutcome::Cancelled | MiningOutcome::Exhausted => Ok(None),
        }
    }

    /// Read-only view of the active UTXO state; clone it for a snapshot
    /// that outlives further submissions.
    pub fn utxo_set(&self) -> &UtxoSet {
        &self.active_utxos
    }

    pub fn balance(&self, recipient: &str) -> u64 {
        self.active_utxos.balance(recipient)
    }

    /// The active chain (or the chain ending at `tip`) ordered from
    /// genesis.
    pub fn chain(&self, tip: Option<Hash>) -> Result<Vec<Block>> {
        let tip = tip.unwrap_or(self.active_tip);
        if !self.blocks.contains_key(&tip) {
            return Err(ValidationError::UnknownParent { hash: tip });
        }
        let mut hashes = vec![self.genesis_hash];
        hashes.extend(self.path(tip)?);
        let mut blocks = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let entry = self
                .blocks
                .get(&hash)
                .ok_or(ValidationError::UnknownParent { hash })?;
            blocks.push(entry.block.clone());
        }
        Ok(blocks)
    }

    pub fn target(&self) -> u128 {
        self.target
    }

    pub fn genesis_hash(&self) -> Hash {
        self.genesis_hash
    }

    pub fn active_tip(&self) -> Hash {
        self.active_tip
    }

    /// Height of the active tip; genesis is height 0.
    pub fn height(&self) -> u64 {
        self.blocks
            .get(&self.active_tip)
            .map(|entry| entry.height)
            .unwrap_or(0)
    }

    pub fn block(&self, hash: &Hash) -> Option<&Block> {
        self.blocks.get(hash).map(|entry| &entry.block)
    }

    pub fn cumulative_work(&self, hash: &Hash) -> Option<u128> {
        self.blocks.get(hash).map(|entry| entry.cumulative_work)
    }

    /// All known tips, sorted so iteration order is deterministic.
    pub fn tips(&self) -> Vec<Hash> {
        let mut tips: Vec<Hash> = self.tips.iter().copied().collect();
        tips.sort_unstable();
        tips
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Hashes from the first post-genesis block up to `tip`, oldest first.
    fn path(&self, tip: Hash) -> Result<Vec<Hash>> {
        let mut path = Vec::new();
        let mut cursor = tip;
        while cursor != self.genesis_hash {
            let entry = self
                .blocks
                .get(&cursor)
                .ok_or(ValidationError::UnknownParent { hash: cursor })?;
            path.push(cursor);
            cursor = entry.block.header.prev_hash;
        }
        path.reverse();
        Ok(path)
    }

    /// Recompute the UTXO state at `tip` by replaying its whole chain from
    /// genesis. Stored blocks were validated on entry; re-validating here
    /// keeps a failed replay from ever replacing the active state.
    fn replay(&self, tip: Hash) -> Result<UtxoSet> {
        let mut state = UtxoSet::new();
        for hash in self.path(tip)? {
            let entry = self
                .blocks
                .get(&hash)
                .ok_or(ValidationError::UnknownParent { hash })?;
            state = block::connect_block(&entry.block, &state)?;
        }
        Ok(state)
    }

    /// Number of old-active-chain blocks abandoned when switching to the
    /// tip whose parent is `new_parent`.
    fn reorg_depth(&self, old_tip: Hash, new_parent: Hash) -> Result<usize> {
        let old_path = self.path(old_tip)?;
        let new_path = self.path(new_parent)?;
        let shared = old_path
            .iter()
            .zip(new_path.iter())
            .take_while(|(a, b)| a == b)
            .count();
        Ok(old_path.len() - shared)
    }

    fn work_at(&self, hash: &Hash) -> u128 {
        self.blocks
            .get(hash)
            .map(|entry| entry.cumulative_work)
            .unwrap_or(0)
    }

    fn prune_pending(&mut self, block: &Block) {
        if self.pending.is_empty() {
            return;
        }
        let mined: HashSet<Hash> = block.transactions.iter().map(|tx| tx.id()).collect();
        self.pending.retain(|tx| !mined.contains(&tx.id()));
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BLOCK_REWARD;
    use crate::types::TxOutput;

    fn mine_on(parent: Hash, timestamp: u64, target: u128, to: &str, txs: Vec<Transaction>) -> Block {
        let candidate = miner::build_candidate(parent, timestamp, target, to, txs);
        match miner::mine(candidate, &AtomicBool::new(false)) {
            MiningOutcome::Mined(block) => block,
            other => panic!("mining failed: {:?}", other),
        }
    }

    fn pay(from: &Transaction, index: u32, amount: u64, to: &str) -> Transaction {
        Transaction {
            inputs: vec![from.outpoint(index)],
            outputs: vec![TxOutput {
                amount,
                recipient: to.to_string(),
            }],
        }
    }

    #[test]
    fn test_extend_active_chain() {
        let mut chain = Blockchain::new(u128::MAX);
        let block = mine_on(chain.active_tip(), 1, chain.target(), "miner", vec![]);
        assert_eq!(chain.submit_block(block), Ok(ChainEvent::Extended));
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.balance("miner"), BLOCK_REWARD);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut chain = Blockchain::new(u128::MAX);
        let block = mine_on([0x42; 32], 1, chain.target(), "miner", vec![]);
        assert_eq!(
            chain.submit_block(block),
            Err(ValidationError::UnknownParent { hash: [0x42; 32] })
        );
        assert_eq!(chain.height(), 0);
    }

    #[test]
    fn test_resubmitted_block_rejected() {
        let mut chain = Blockchain::new(u128::MAX);
        let block = mine_on(chain.active_tip(), 1, chain.target(), "miner", vec![]);
        chain.submit_block(block.clone()).unwrap();
        assert!(matches!(
            chain.submit_block(block),
            Err(ValidationError::Structural { .. })
        ));
    }

    #[test]
    fn test_fork_does_not_touch_active_state() {
        let mut chain = Blockchain::new(u128::MAX);
        let genesis = chain.active_tip();
        let a1 = mine_on(genesis, 1, chain.target(), "alice", vec![]);
        let a2 = mine_on(a1.hash(), 2, chain.target(), "anna", vec![]);
        chain.submit_block(a1).unwrap();
        chain.submit_block(a2).unwrap();

        let b1 = mine_on(genesis, 3, chain.target(), "bob", vec![]);
        assert_eq!(chain.submit_block(b1), Ok(ChainEvent::ForkCreated));
        assert_eq!(chain.balance("bob"), 0);
        assert_eq!(chain.balance("alice"), BLOCK_REWARD);
        assert_eq!(chain.balance("anna"), BLOCK_REWARD);
        assert_eq!(chain.tips().len(), 2);
    }

    #[test]
    fn test_heavier_fork_triggers_reorg() {
        let mut chain = Blockchain::new(u128::MAX);
        let genesis = chain.active_tip();
        let a1 = mine_on(genesis, 1, u128::MAX, "alice", vec![]);
        chain.submit_block(a1.clone()).unwrap();

        // One block at a quarter of the target carries four times the work.
        let b1 = mine_on(genesis, 2, u128::MAX / 4, "bob", vec![]);
        assert_eq!(
            chain.submit_block(b1),
            Ok(ChainEvent::Reorged { depth: 1 })
        );
        assert_eq!(chain.balance("alice"), 0);
        assert_eq!(chain.balance("bob"), BLOCK_REWARD);
    }

    #[test]
    fn test_equal_work_tie_breaks_on_lowest_hash() {
        // Mine two siblings of genesis and learn which hash is lower.
        let probe = Blockchain::new(u128::MAX);
        let genesis = probe.active_tip();
        let sibling_a = mine_on(genesis, 1, probe.target(), "alice", vec![]);
        let sibling_b = mine_on(genesis, 2, probe.target(), "bob", vec![]);
        let (lo, hi) = if sibling_a.hash() < sibling_b.hash() {
            (sibling_a, sibling_b)
        } else {
            (sibling_b, sibling_a)
        };

        // Higher hash first: the lower-hash challenger wins the tie.
        let mut chain = Blockchain::new(u128::MAX);
        chain.submit_block(hi.clone()).unwrap();
        assert_eq!(
            chain.submit_block(lo.clone()),
            Ok(ChainEvent::Reorged { depth: 1 })
        );
        assert_eq!(chain.active_tip(), lo.hash());

        // Lower hash first: the incumbent keeps the tie.
        let mut chain = Blockchain::new(u128::MAX);
        chain.submit_block(lo.clone()).unwrap();
        assert_eq!(chain.submit_block(hi), Ok(ChainEvent::ForkCreated));
        assert_eq!(chain.active_tip(), lo.hash());
    }

    #[test]
    fn test_chain_lists_blocks_from_genesis() {
        let mut chain = Blockchain::new(u128::MAX);
        let b1 = mine_on(chain.active_tip(), 1, chain.target(), "first", vec![]);
        let b2 = mine_on(b1.hash(), 2, chain.target(), "second", vec![]);
        chain.submit_block(b1.clone()).unwrap();
        chain.submit_block(b2.clone()).unwrap();

        let blocks = chain.chain(None).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].hash(), chain.genesis_hash());
        assert_eq!(blocks[1].hash(), b1.hash());
        assert_eq!(blocks[2].hash(), b2.hash());

        assert!(matches!(
            chain.chain(Some([9; 32])),
            Err(ValidationError::UnknownParent { .. })
        ));
    }

    #[test]
    fn test_submit_transaction_admission() {
        let mut chain = Blockchain::new(u128::MAX);
        let mint = mine_on(chain.active_tip(), 1, chain.target(), "alice", vec![]);
        let coinbase = mint.transactions[0].clone();
        chain.submit_block(mint).unwrap();

        let spend = pay(&coinbase, 0, BLOCK_REWARD, "bob");
        chain.submit_transaction(spend.clone()).unwrap();
        assert_eq!(chain.pending().len(), 1);

        // Exact duplicate is refused by id.
        assert_eq!(
            chain.submit_transaction(spend.clone()),
            Err(ValidationError::DuplicateTransaction { id: spend.id() })
        );

        // Unfunded spends never reach the pool.
        let phantom = Transaction {
            inputs: vec![crate::types::OutPoint {
                txid: [7; 32],
                index: 0,
            }],
            outputs: vec![TxOutput {
                amount: 1,
                recipient: "carol".to_string(),
            }],
        };
        assert!(matches!(
            chain.submit_transaction(phantom),
            Err(ValidationError::MissingInput { .. })
        ));
    }

    #[test]
    fn test_mine_pending_commits_pool() {
        let mut chain = Blockchain::new(u128::MAX);
        let mint = mine_on(chain.active_tip(), 1, chain.target(), "alice", vec![]);
        let coinbase = mint.transactions[0].clone();
        chain.submit_block(mint).unwrap();

        chain
            .submit_transaction(pay(&coinbase, 0, BLOCK_REWARD, "bob"))
            .unwrap();
        let cancel = AtomicBool::new(false);
        let mined = chain.mine_pending("carol", 2, &cancel).unwrap();
        assert!(mined.is_some());
        assert!(chain.pending().is_empty());
        assert_eq!(chain.balance("bob"), BLOCK_REWARD);
        assert_eq!(chain.height(), 2);
    }

    #[test]
    fn test_mine_pending_empty_pool_is_noop() {
        let mut chain = Blockchain::new(u128::MAX);
        let cancel = AtomicBool::new(false);
        assert_eq!(chain.mine_pending("miner", 1, &cancel).unwrap(), None);
        assert_eq!(chain.height(), 0);
    }
}
