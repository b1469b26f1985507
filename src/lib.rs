//! Retarget Core - Consensus-Critical Difficulty Retargeting
//!
//! This crate provides a deterministic, verifiable implementation of a
//! proof-of-work difficulty retargeter: legacy interval-based retargeting,
//! FIR-filtered retargeting over a 144-block window, the exact-rational
//! arithmetic both depend on, and proof-of-work validation / block-work
//! accounting.
//!
//! # Architecture
//!
//! - **bigint**: Arbitrary-precision signed integers (`Z`), hand-rolled
//!   rather than pulled from an external crate - the wire format is
//!   consensus-critical.
//! - **bigrational**: Canonical arbitrary-precision rationals (`Q`) built on
//!   `bigint`.
//! - **compact**: 256-bit unsigned integer and compact (`nBits`) target
//!   encode/decode.
//! - **chain_view**: Read-only chain access (`ChainView`, `BlockIndex`,
//!   `ChainParams`) consumed by the retargeter.
//! - **retarget**: The retargeting algorithm itself.
//! - **pow**: Proof-of-work check and block-work accounting.
//! - **subsidy**: A `BigRational` exactness demonstration (not a consensus
//!   feature - see its module docs).
//! - **errors**: Typed error handling (no panics in consensus).
//!
//! # Quality Gates
//!
//! - Determinism: every operation produces identical results across
//!   platforms - no floating point anywhere on the consensus path.
//! - No panics: fallible paths return typed `Result`s; the retargeter itself
//!   is infallible on well-formed input.
//! - Bit-exact serialization: `Z`/`Q` wire format is pinned by tests, not
//!   just documented.
//!
//! # Usage
//!
//! ```rust
//! use retarget_core::chain_view::{BlockIndex, ChainParams, ChainView};
//! use retarget_core::compact::{set_compact, U256};
//! use retarget_core::retarget::get_next_work_required;
//!
//! struct NoHistory;
//! impl ChainView for NoHistory {
//!     fn prev(&self, _index: &BlockIndex) -> Option<BlockIndex> {
//!         None
//!     }
//! }
//!
//! let (pow_limit, _, _) = set_compact(0x1d00ffff);
//! let params = ChainParams {
//!     target_spacing: 600,
//!     legacy_interval: 2016,
//!     legacy_target_timespan: 2016 * 600,
//!     pow_limit: pow_limit.to_be_bytes(),
//!     allow_min_difficulty: false,
//!     fir_filter_threshold_height: 1_000_000,
//!     fir_retarget_override_nbits: 0x1b01c13a,
//!     skip_pow_check: false,
//! };
//!
//! // Genesis: no tip yet, so the limit is returned unchanged.
//! let nbits = get_next_work_required(&NoHistory, None, 0, &params);
//! assert_eq!(nbits, 0x1d00ffff);
//! let _ = U256::zero();
//! ```

// Module declarations
pub mod bigint;
pub mod bigrational;
pub mod chain_view;
pub mod compact;
pub mod errors;
pub mod pow;
pub mod retarget;
pub mod subsidy;

// Re-exports for convenience
pub use bigint::BigInt;
pub use bigrational::BigRational;
pub use chain_view::{BlockIndex, ChainParams, ChainView};
pub use compact::{get_compact, set_compact, U256};
pub use errors::{Result, RetargetError};
pub use pow::{check_proof_of_work, get_block_proof};
pub use retarget::get_next_work_required;

/// Library version (matches Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get version info as string
pub fn version_info() -> String {
    format!("{} v{}", NAME, VERSION)
}
