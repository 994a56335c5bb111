//! Ledger consensus constants

/// Fixed amount minted by the coinbase transaction of every block. No fee
/// aggregation: fees are simply burned.
pub const BLOCK_REWARD: u64 = 50;

/// Upper bound on a single output amount.
pub const MAX_AMOUNT: u64 = 1_000_000_000_000;

/// Maximum number of inputs per transaction
pub const MAX_INPUTS: usize = 1_000;

/// Maximum number of outputs per transaction
pub const MAX_OUTPUTS: usize = 1_000;

/// Default difficulty target: one nonce in 256 satisfies it on average.
pub const DEFAULT_TARGET: u128 = u128::MAX >> 8;

/// Timestamp baked into the genesis header so every node derives the
/// identical genesis block (2024-01-01T00:00:00Z).
pub const GENESIS_TIMESTAMP: u64 = 1_704_067_200;
