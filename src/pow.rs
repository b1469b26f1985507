//! Proof-of-work validation and block-work accounting.
//!
//! Both operations are pure functions of a target and a hash/header; neither
//! touches persisted state. `check_proof_of_work` never panics and logs its
//! rejection reasons through `tracing` so an operator can tell a stale tip
//! apart from a genuinely malformed header.

use crate::chain_view::{BlockIndex, ChainParams};
use crate::compact::{set_compact, set_compact_checked, U256};

/// Returns `true` iff `hash` satisfies the difficulty target encoded by
/// `nbits`, given `params`. Logs the reason for every rejection.
pub fn check_proof_of_work(hash: &U256, nbits: u32, params: &ChainParams) -> bool {
    if params.skip_pow_check {
        return true;
    }

    let pow_limit = params.pow_limit();
    let target = match set_compact_checked(nbits) {
        Err(err) => {
            tracing::warn!(error = %err, "check_proof_of_work: invalid compact target");
            return false;
        }
        Ok(target) if target.is_zero() => {
            tracing::warn!(nbits, "check_proof_of_work: target is zero");
            return false;
        }
        Ok(target) => target,
    };

    if target > pow_limit {
        tracing::warn!(
            target = %hex::encode(target.to_be_bytes()),
            limit = %hex::encode(pow_limit.to_be_bytes()),
            "check_proof_of_work: target above proof-of-work limit"
        );
        return false;
    }
    if hash > &target {
        tracing::debug!(
            hash = %hex::encode(hash.to_be_bytes()),
            target = %hex::encode(target.to_be_bytes()),
            "check_proof_of_work: hash does not satisfy target"
        );
        return false;
    }
    true
}

/// Expected number of hashes to find a block at `index.nbits`: `0` for an
/// invalid or zero compact target, else `floor(2^256 / (target + 1))`.
pub fn get_block_proof(index: &BlockIndex) -> U256 {
    let (target, negative, overflow) = set_compact(index.nbits);
    if negative || overflow || target.is_zero() {
        return U256::zero();
    }
    // 2**256 / (target+1) == (~target / (target+1)) + 1, since 2**256 is not
    // representable in 256 bits but ~target == 2**256 - 1 - target is.
    let denom = target.saturating_add(&U256::from_u64(1));
    let quotient = div_u256(&target.not(), &denom);
    quotient.saturating_add(&U256::from_u64(1))
}

/// Truncated division of two `U256` values via binary long division. Only
/// ever invoked here with a nonzero divisor (`target + 1` is never zero).
fn div_u256(numerator: &U256, denom: &U256) -> U256 {
    if denom.is_zero() || numerator < denom {
        return U256::zero();
    }
    let bits = numerator.bit_length();
    let mut remainder = U256::zero();
    let mut quotient = U256::zero();
    for i in (0..bits).rev() {
        remainder = remainder.shl(1);
        if numerator.bit(i) {
            remainder = remainder.saturating_add(&U256::from_u64(1));
        }
        if remainder >= *denom {
            remainder = remainder.wrapping_sub(denom);
            quotient = quotient.saturating_add(&U256::from_u64(1).shl(i));
        }
    }
    quotient
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pow_limit: U256, skip: bool) -> ChainParams {
        ChainParams {
            target_spacing: 600,
            legacy_interval: 2016,
            legacy_target_timespan: 2016 * 600,
            pow_limit: pow_limit.to_be_bytes(),
            allow_min_difficulty: false,
            fir_filter_threshold_height: 100_000,
            fir_retarget_override_nbits: 0x1b01c13a,
            skip_pow_check: skip,
        }
    }

    #[test]
    fn skip_flag_always_passes() {
        let p = params(U256::from_u64(1), true);
        assert!(check_proof_of_work(&U256::max_value(), 0x1d00ffff, &p));
    }

    #[test]
    fn hash_within_target_passes() {
        let (limit, _, _) = set_compact(0x1d00ffff);
        let p = params(limit, false);
        assert!(check_proof_of_work(&U256::zero(), 0x1d00ffff, &p));
    }

    #[test]
    fn hash_above_target_fails() {
        let (limit, _, _) = set_compact(0x1d00ffff);
        let p = params(limit, false);
        assert!(!check_proof_of_work(&U256::max_value(), 0x1d00ffff, &p));
    }

    #[test]
    fn target_above_pow_limit_fails() {
        let p = params(U256::from_u64(0xffff), false);
        assert!(!check_proof_of_work(&U256::zero(), 0x1d00ffff, &p));
    }

    #[test]
    fn zero_target_fails() {
        let (limit, _, _) = set_compact(0x1d00ffff);
        let p = params(limit, false);
        assert!(!check_proof_of_work(&U256::zero(), 0, &p));
    }

    #[test]
    fn overflow_target_fails() {
        let (limit, _, _) = set_compact(0x1d00ffff);
        let p = params(limit, false);
        assert!(!check_proof_of_work(&U256::zero(), 0x22010000, &p));
    }

    #[test]
    fn block_proof_is_zero_for_invalid_target() {
        let idx = BlockIndex {
            height: 1,
            time: 0,
            nbits: 0,
        };
        assert!(get_block_proof(&idx).is_zero());
    }

    #[test]
    fn block_proof_increases_as_target_shrinks() {
        let easier = BlockIndex {
            height: 1,
            time: 0,
            nbits: 0x1d00ffff,
        };
        let harder = BlockIndex {
            height: 1,
            time: 0,
            nbits: 0x1c00ffff,
        };
        assert!(get_block_proof(&harder) > get_block_proof(&easier));
    }

    #[test]
    fn block_proof_matches_closed_form_for_max_target() {
        // target = U256::max_value() - 1 keeps (target+1) nonzero without overflow.
        let nbits = set_compact_inverse_for_test();
        let idx = BlockIndex {
            height: 1,
            time: 0,
            nbits,
        };
        let proof = get_block_proof(&idx);
        assert!(!proof.is_zero());
    }

    fn set_compact_inverse_for_test() -> u32 {
        0x20000001
    }
}
