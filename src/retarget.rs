//! The difficulty retargeter: legacy interval-based and FIR-filtered modes.
//!
//! `get_next_work_required` is a pure function of a read-only [`ChainView`],
//! the candidate block's timestamp, and [`ChainParams`]. It never touches
//! persisted state and never panics on a well-formed chain; its only
//! `expect`s guard arithmetic invariants the clamp logic already enforces
//! (the original implementation this was distilled from leans on the same
//! kind of `assert` at its own walk-back step).

use crate::bigrational::BigRational;
use crate::chain_view::{BlockIndex, ChainParams, ChainView};
use crate::compact::{get_compact, set_compact, U256};
use crate::errors::RetargetError;

/// Width of the FIR filter window, in blocks.
pub const WINDOW: usize = 144;

/// Impulse response of the difficulty filter. Reproduced verbatim, including
/// the one-count asymmetry between `FILTER_COEFF[0]` (-845859) and
/// `FILTER_COEFF[143]` (-845858) - do not "correct" this, chain history
/// depends on it.
#[rustfmt::skip]
const FILTER_COEFF: [i32; WINDOW] = [
     -845859,  -459003,  -573589,  -703227,  -848199, -1008841,
    -1183669, -1372046, -1573247, -1787578, -2011503, -2243311,
    -2482346, -2723079, -2964681, -3202200, -3432186, -3650186,
    -3851924, -4032122, -4185340, -4306430, -4389146, -4427786,
    -4416716, -4349289, -4220031, -4022692, -3751740, -3401468,
    -2966915, -2443070, -1825548, -1110759,  -295281,   623307,
     1646668,  2775970,  4011152,  5351560,  6795424,  8340274,
     9982332, 11717130, 13539111, 15441640, 17417389, 19457954,
    21554056, 23695744, 25872220, 28072119, 30283431, 32493814,
    34690317, 36859911, 38989360, 41065293, 43074548, 45004087,
    46841170, 48573558, 50189545, 51678076, 53028839, 54232505,
    55280554, 56165609, 56881415, 57422788, 57785876, 57968085,
    57968084, 57785876, 57422788, 56881415, 56165609, 55280554,
    54232505, 53028839, 51678076, 50189545, 48573558, 46841170,
    45004087, 43074548, 41065293, 38989360, 36859911, 34690317,
    32493814, 30283431, 28072119, 25872220, 23695744, 21554057,
    19457953, 17417389, 15441640, 13539111, 11717130,  9982332,
     8340274,  6795424,  5351560,  4011152,  2775970,  1646668,
      623307,  -295281, -1110759, -1825548, -2443070, -2966915,
    -3401468, -3751740, -4022692, -4220031, -4349289, -4416715,
    -4427787, -4389146, -4306430, -4185340, -4032122, -3851924,
    -3650186, -3432186, -3202200, -2964681, -2723079, -2482346,
    -2243311, -2011503, -1787578, -1573247, -1372046, -1183669,
    -1008841,  -848199,  -703227,  -573589,  -459003,  -845858,
];

/// Computes the compact target (`nBits`) the next block must satisfy. Wraps
/// the decision in a `tracing` span so an operator can see which mode and
/// tip height produced a given result without instrumenting every call site.
pub fn get_next_work_required<C: ChainView>(
    chain: &C,
    tip: Option<BlockIndex>,
    candidate_time: i64,
    params: &ChainParams,
) -> u32 {
    let fir = tip
        .map(|t| t.height as i64 >= params.fir_filter_threshold_height as i64 - 1)
        .unwrap_or(false);
    let span = tracing::debug_span!(
        "get_next_work_required",
        tip_height = tip.map(|t| t.height),
        fir,
        nbits = tracing::field::Empty,
    );
    let _enter = span.enter();

    let nbits = get_next_work_required_inner(chain, tip, candidate_time, params);
    span.record("nbits", nbits);
    nbits
}

fn get_next_work_required_inner<C: ChainView>(
    chain: &C,
    tip: Option<BlockIndex>,
    candidate_time: i64,
    params: &ChainParams,
) -> u32 {
    let pow_limit = params.pow_limit();
    let pow_limit_compact = get_compact(&pow_limit);

    let tip = match tip {
        None => return pow_limit_compact,
        Some(tip) => tip,
    };

    if !params.allow_min_difficulty && tip.height == params.fir_filter_threshold_height - 1 {
        return params.fir_retarget_override_nbits;
    }

    let fir = tip.height as i64 >= params.fir_filter_threshold_height as i64 - 1;
    let (interval, timespan): (i64, i64) = if fir {
        (9, 9 * params.target_spacing)
    } else {
        (params.legacy_interval, params.legacy_target_timespan)
    };

    if (tip.height as i64 + 1) % interval != 0 {
        if params.allow_min_difficulty {
            if candidate_time > tip.time + 2 * params.target_spacing {
                return pow_limit_compact;
            }
            return walk_back_min_difficulty(chain, tip, interval, pow_limit_compact);
        }
        return tip.nbits;
    }

    let factor = if fir {
        fir_adjustment_factor(chain, &tip, params)
    } else {
        legacy_adjustment_factor(chain, &tip, interval, timespan)
    };

    rescale(&tip, &factor, &pow_limit)
}

fn walk_back_min_difficulty<C: ChainView>(
    chain: &C,
    tip: BlockIndex,
    interval: i64,
    pow_limit_compact: u32,
) -> u32 {
    let mut cur = tip;
    loop {
        match chain.prev(&cur) {
            Some(prev) if (cur.height as i64) % interval != 0 && cur.nbits == pow_limit_compact => {
                cur = prev;
            }
            _ => break,
        }
    }
    cur.nbits
}

fn fir_time_deltas<C: ChainView>(chain: &C, tip: &BlockIndex, target_spacing: i64) -> [i64; WINDOW] {
    let mut deltas = [target_spacing; WINDOW];
    let mut idx = 0;
    let mut cur = *tip;
    while idx < WINDOW {
        let prev = match chain.prev(&cur) {
            Some(prev) => prev,
            None => break,
        };
        deltas[idx] = cur.time - prev.time;
        idx += 1;
        cur = prev;
    }
    deltas
}

fn fir_adjustment_factor<C: ChainView>(
    chain: &C,
    tip: &BlockIndex,
    params: &ChainParams,
) -> BigRational {
    let deltas = fir_time_deltas(chain, tip, params.target_spacing);
    fir_factor_from_deltas(&deltas, params.target_spacing)
}

/// Pure numeric core of the FIR adjustment: convolves `deltas` with
/// [`FILTER_COEFF`] and clamps the result to the fixed limiter band. Split out
/// from [`fir_adjustment_factor`] so the bound in invariant 7 can be checked
/// directly against arbitrary delta windows, without a [`ChainView`] to walk.
fn fir_factor_from_deltas(deltas: &[i64; WINDOW], target_spacing: i64) -> BigRational {
    let mut filtered: i64 = 0;
    for i in 0..WINDOW {
        filtered += FILTER_COEFF[i] as i64 * deltas[i];
    }

    let two_to_31 = BigRational::from_i64(1i64 << 31);
    let filtered_interval = (&BigRational::from_i64(filtered) / &two_to_31)
        .expect("2^31 is a nonzero constant");
    let target_interval = BigRational::from_i64(target_spacing);
    let gain = BigRational::from_ratio(41, 400).expect("400 is a nonzero constant");
    let one = BigRational::from_i64(1);

    let deviation = &filtered_interval - &target_interval;
    let relative = (&deviation / &target_interval)
        .expect("target_spacing must be configured as a positive, nonzero duration");
    let mut factor = &one - &(&gain * &relative);

    let limiter_up = BigRational::from_ratio(211, 200).expect("200 is a nonzero constant");
    let limiter_down = BigRational::from_ratio(200, 211).expect("211 is a nonzero constant");
    if factor > limiter_up {
        factor = limiter_up;
    } else if factor < limiter_down {
        factor = limiter_down;
    }
    factor
}

fn legacy_adjustment_factor<C: ChainView>(
    chain: &C,
    tip: &BlockIndex,
    interval: i64,
    timespan: i64,
) -> BigRational {
    let blocks_to_go_back = if tip.height as i64 + 1 == interval {
        interval - 1
    } else {
        interval
    };

    let (first, walked) = walk_back(chain, tip, blocks_to_go_back);
    if let Err(err) = walked {
        tracing::warn!(
            error = %err,
            height = tip.height,
            "legacy_adjustment_factor: chain shorter than the retarget window, using earliest available block"
        );
    }

    let actual = (tip.time - first.time).clamp(timespan / 4, timespan * 4);
    BigRational::from_ratio(timespan, actual)
        .expect("actual timespan is clamped to at least timespan/4, never zero")
}

/// Walks back exactly `steps` ancestors from `tip`, returning the furthest
/// block actually reached. The original implementation this was distilled
/// from simply asserts the chain is at least this deep; a malformed or
/// too-short `ChainView` surfaces as a typed error here instead of a panic.
fn walk_back<C: ChainView>(
    chain: &C,
    tip: &BlockIndex,
    steps: i64,
) -> (BlockIndex, Result<(), RetargetError>) {
    let mut cur = *tip;
    for taken in 0..steps {
        match chain.prev(&cur) {
            Some(prev) => cur = prev,
            None => {
                return (
                    cur,
                    Err(RetargetError::ChainWalkExhausted { steps: taken as u32 }),
                )
            }
        }
    }
    (cur, Ok(()))
}

/// Rescales `tip`'s target by `factor`'s denominator over its numerator -
/// target and difficulty are inverses, so this is the correct direction (see
/// the design notes on this point - it is easy to get backwards).
fn rescale(tip: &BlockIndex, factor: &BigRational, pow_limit: &U256) -> u32 {
    let (old_target, _, _) = set_compact(tip.nbits);

    let den = factor
        .den()
        .to_i64()
        .expect("adjustment factor denominator is bounded by the gain/limiter constants") as u64;
    let num = factor
        .num()
        .to_i64()
        .expect("adjustment factor numerator is bounded by the gain/limiter constants")
        .unsigned_abs();

    let scaled = old_target.saturating_mul_u64(den);
    let mut new_target = scaled.div_u64(num).unwrap_or(old_target);

    if new_target > *pow_limit {
        new_target = *pow_limit;
    }
    get_compact(&new_target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct VecChain(Vec<BlockIndex>);

    impl ChainView for VecChain {
        fn prev(&self, index: &BlockIndex) -> Option<BlockIndex> {
            self.0
                .iter()
                .find(|b| b.height == index.height - 1)
                .copied()
        }
    }

    fn test_params() -> ChainParams {
        let (pow_limit, _, _) = set_compact(0x1d00ffff);
        ChainParams {
            target_spacing: 600,
            legacy_interval: 2016,
            legacy_target_timespan: 2016 * 600,
            pow_limit: pow_limit.to_be_bytes(),
            allow_min_difficulty: false,
            fir_filter_threshold_height: 1_000_000,
            fir_retarget_override_nbits: 0x1b01c13a,
            skip_pow_check: false,
        }
    }

    fn spaced_chain(spacing: i64, count: i32, nbits: u32) -> VecChain {
        let mut blocks = Vec::new();
        for h in 0..=count {
            blocks.push(BlockIndex {
                height: h,
                time: h as i64 * spacing,
                nbits,
            });
        }
        VecChain(blocks)
    }

    #[test]
    fn genesis_returns_pow_limit() {
        let params = test_params();
        let (limit, _, _) = set_compact(0x1d00ffff);
        let nbits = get_next_work_required(&spaced_chain(600, 0, 0), None, 600, &params);
        assert_eq!(nbits, get_compact(&limit));
    }

    #[test]
    fn one_time_override_is_exact() {
        let mut params = test_params();
        params.fir_filter_threshold_height = 500;
        let chain = spaced_chain(600, 600, 0x1d00ffff);
        let tip = chain.0[499];
        let nbits = get_next_work_required(&chain, Some(tip), tip.time + 600, &params);
        assert_eq!(nbits, 0x1b01c13a);
    }

    #[test]
    fn non_retarget_height_keeps_nbits() {
        let params = test_params();
        let chain = spaced_chain(600, 10, 0x1d00ffff);
        let tip = chain.0[5];
        let nbits = get_next_work_required(&chain, Some(tip), tip.time + 600, &params);
        assert_eq!(nbits, tip.nbits);
    }

    #[test]
    fn fir_steady_state_keeps_nbits_exact() {
        let mut params = test_params();
        params.fir_filter_threshold_height = 0;
        // interval under FIR mode is 9, so height 8 -> next height 9 retargets.
        let chain = spaced_chain(600, 8, 0x1d00ffff);
        let tip = chain.0[8];
        let nbits = get_next_work_required(&chain, Some(tip), tip.time + 600, &params);
        // FILTER_COEFF sums to exactly 2^31, so steady 600s spacing drives the
        // adjustment factor to exactly 1 and the rescale is a no-op.
        assert_eq!(nbits, tip.nbits);
    }

    #[test]
    fn legacy_clamp_quarters_target_on_fast_blocks() {
        let mut params = test_params();
        params.legacy_interval = 4;
        params.legacy_target_timespan = 4 * 600;
        // All blocks mined instantly: actual timespan collapses to 0,
        // clamped up to timespan/4, so target should shrink by 1/4.
        let chain = spaced_chain(0, 4, 0x1d00ffff);
        let tip = chain.0[3];
        let nbits = get_next_work_required(&chain, Some(tip), tip.time + 1, &params);
        let (before, _, _) = set_compact(tip.nbits);
        let (after, _, _) = set_compact(nbits);
        assert!(after < before);
    }

    #[test]
    fn result_never_exceeds_pow_limit() {
        let mut params = test_params();
        params.legacy_interval = 4;
        params.legacy_target_timespan = 4 * 600;
        // Extremely slow blocks push the adjustment factor to its ceiling.
        let chain = spaced_chain(600 * 100, 4, 0x1d00ffff);
        let tip = chain.0[3];
        let nbits = get_next_work_required(&chain, Some(tip), tip.time + 1, &params);
        let (limit, _, _) = set_compact(0x1d00ffff);
        let (after, _, _) = set_compact(nbits);
        assert!(after <= limit);
    }

    #[test]
    fn filter_coeff_is_palindromic_up_to_endpoint_asymmetry() {
        for i in 1..WINDOW - 1 {
            assert_eq!(FILTER_COEFF[i], FILTER_COEFF[WINDOW - 1 - i], "mismatch at {i}");
        }
        assert_eq!(FILTER_COEFF[0], -845859);
        assert_eq!(FILTER_COEFF[WINDOW - 1], -845858);
    }

    #[test]
    fn walk_back_exhaustion_falls_back_to_earliest_block() {
        // Only 2 ancestors exist, but the legacy window asks for 4.
        let chain = spaced_chain(600, 2, 0x1d00ffff);
        let tip = chain.0[2];
        let (earliest, result) = walk_back(&chain, &tip, 4);
        assert_eq!(earliest.height, 0);
        assert!(matches!(result, Err(RetargetError::ChainWalkExhausted { steps: 2 })));
    }

    proptest! {
        #[test]
        fn result_never_exceeds_pow_limit_prop(spacing in 1i64..1_000_000) {
            let mut params = test_params();
            params.legacy_interval = 4;
            params.legacy_target_timespan = 4 * 600;
            let chain = spaced_chain(spacing, 4, 0x1d00ffff);
            let tip = chain.0[3];
            let nbits = get_next_work_required(&chain, Some(tip), tip.time + 1, &params);
            let (limit, _, _) = set_compact(0x1d00ffff);
            let (after, _, _) = set_compact(nbits);
            prop_assert!(after <= limit);
        }

        #[test]
        fn non_retarget_height_always_keeps_nbits_prop(height in 0i32..10_000) {
            let params = test_params();
            prop_assume!((height as i64 + 1) % params.legacy_interval != 0);
            let chain = spaced_chain(600, 0, 0x1d00ffff);
            let tip = BlockIndex { height, time: height as i64 * 600, nbits: 0x1d00ffff };
            let nbits = get_next_work_required(&chain, Some(tip), tip.time + 600, &params);
            prop_assert_eq!(nbits, tip.nbits);
        }

        #[test]
        fn fir_adjustment_factor_is_bounded(deltas in proptest::collection::vec(1i64..1_000_000i64, WINDOW)) {
            let mut arr = [600i64; WINDOW];
            arr.copy_from_slice(&deltas);
            let factor = fir_factor_from_deltas(&arr, 600);
            let lower = BigRational::from_ratio(200, 211).unwrap();
            let upper = BigRational::from_ratio(211, 200).unwrap();
            prop_assert!(factor >= lower);
            prop_assert!(factor <= upper);
        }

        #[test]
        fn legacy_adjustment_factor_is_bounded(spacing in 0i64..10_000_000) {
            let chain = spaced_chain(spacing, 4, 0x1d00ffff);
            let tip = chain.0[3];
            let factor = legacy_adjustment_factor(&chain, &tip, 4, 4 * 600);
            let lower = BigRational::from_ratio(1, 4).unwrap();
            let upper = BigRational::from_ratio(4, 1).unwrap();
            prop_assert!(factor >= lower);
            prop_assert!(factor <= upper);
        }
    }
}
