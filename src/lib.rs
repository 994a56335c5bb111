//! # utxo-consensus
//!
//! Deterministic single-node UTXO ledger: a state machine that ingests
//! proposed blocks of transactions and produces a new validated
//! unspent-output set, rejecting anything that violates conservation of
//! value, double-spend, or proof-of-work rules.
//!
//! ## Architecture
//!
//! Leaves first:
//! - [`hashing`] - transaction ids, header hashes, Merkle roots
//! - [`types`] - immutable value objects ([`Transaction`], [`Block`])
//! - [`utxo`] - the authoritative [`UtxoSet`] state
//! - [`transaction`] / [`block`] / [`pow`] - pure validation functions
//! - [`chain`] - the stateful [`Blockchain`]: block store, fork
//!   resolution by cumulative work, reorg by full replay
//! - [`miner`] - candidate assembly and the cancellable nonce search
//!
//! ## Design principles
//!
//! 1. **Deterministic and total**: the same block sequence yields the
//!    bit-identical UTXO state on every node, including equal-work ties.
//! 2. **Validate before apply**: no validation failure ever leaves a
//!    partially-applied block behind.
//! 3. **Correctness over cleverness**: a reorg recomputes the active
//!    state by replaying the winning chain from genesis, with no
//!    incremental undo bookkeeping to get wrong.
//!
//! No networking, persistence, or signature checking lives here; spenders
//! and recipients are opaque identifiers supplied by the embedding layer.
//!
//! ## Usage
//!
//! ```
//! use std::sync::atomic::AtomicBool;
//!
//! use utxo_consensus::{miner, Blockchain, ChainEvent};
//!
//! let mut chain = Blockchain::new(u128::MAX);
//! let candidate = miner::build_candidate(chain.active_tip(), 1, chain.target(), "miner", vec![]);
//! let block = match miner::mine(candidate, &AtomicBool::new(false)) {
//!     miner::MiningOutcome::Mined(block) => block,
//!     other => panic!("mining failed: {:?}", other),
//! };
//! assert_eq!(chain.submit_block(block), Ok(ChainEvent::Extended));
//! assert_eq!(chain.balance("miner"), 50);
//! ```

pub mod block;
pub mod chain;
pub mod constants;
pub mod error;
pub mod hashing;
pub mod miner;
pub mod pow;
pub mod transaction;
pub mod types;
pub mod utxo;

pub use chain::{genesis_block, Blockchain, ChainEvent};
pub use error::{Result, ValidationError};
pub use types::{Block, BlockHeader, Hash, OutPoint, Transaction, TxOutput, ZERO_HASH};
pub use utxo::UtxoSet;
