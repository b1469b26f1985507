//! Read-only chain access consumed by the retargeter.
//!
//! The core never owns chain state; it only walks backwards through whatever
//! a host node hands it. `ChainParams` is a plain serde value type so a host
//! binary can load it from its own configuration format - this crate performs
//! no I/O of its own.

use crate::compact::U256;
use serde::{Deserialize, Serialize};

/// A single entry in the block index, as seen by the retargeter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockIndex {
    pub height: i32,
    pub time: i64,
    pub nbits: u32,
}

/// Read-only access to a chain of block headers.
///
/// Implementations are expected to be cheap to call repeatedly; the
/// retargeter may call `prev` up to 144 times per retarget decision.
pub trait ChainView {
    /// Entry immediately preceding `index` in the chain, or `None` at genesis.
    fn prev(&self, index: &BlockIndex) -> Option<BlockIndex>;
}

/// Consensus parameters governing retarget behavior. Never read from the
/// filesystem or environment by this crate - a host node owns that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParams {
    pub target_spacing: i64,
    pub legacy_interval: i64,
    pub legacy_target_timespan: i64,
    pub pow_limit: [u8; 32],
    pub allow_min_difficulty: bool,
    pub fir_filter_threshold_height: i32,
    pub fir_retarget_override_nbits: u32,
    pub skip_pow_check: bool,
}

impl ChainParams {
    pub fn pow_limit(&self) -> U256 {
        U256::from_be_bytes(&self.pow_limit)
    }
}
