//! Fixed-interval retarget: the classic Bitcoin timespan ratio.
//!
//! Difficulty only moves on interval boundaries. In between, networks that
//! allow min-difficulty blocks hand out the limit to stalled candidates and
//! otherwise look past earlier min-difficulty blocks for the last real bits.

use primitive_types::U256;

use crate::block::BlockHeader;
use crate::chain::{BlockRef, ChainView};
use crate::compact::CompactTarget;
use crate::error::{RetargetError, RetargetResult};
use crate::params::ConsensusParams;
use crate::trace::{LegacyTrace, RetargetEvent, TraceSink};

/// Required bits for the block after `tip` under the legacy rule.
pub fn next_work_required<C, S>(
    tip: BlockRef<'_, C>,
    header: &BlockHeader,
    params: &ConsensusParams,
    sink: &S,
) -> RetargetResult<CompactTarget>
where
    C: ChainView + ?Sized,
    S: TraceSink + ?Sized,
{
    let pow_limit_bits = params.pow_limit_compact();
    let interval = params.difficulty_adjustment_interval();
    let tip_height = i64::from(tip.height());

    if (tip_height + 1) % interval != 0 {
        if params.allow_min_difficulty_blocks {
            let stall_time = tip
                .time()
                .saturating_add(params.pow_target_spacing.saturating_mul(2));
            if header.block_time() > stall_time {
                sink.record(&RetargetEvent::MinDifficulty {
                    tip_height: tip.height(),
                    tip_time: tip.time(),
                    candidate_time: header.block_time(),
                });
                return Ok(pow_limit_bits);
            }
            return Ok(last_non_min_difficulty(tip, interval, pow_limit_bits).bits());
        }
        return Ok(tip.bits());
    }

    // Go back by what we want to be one interval worth of blocks.
    let first_height = tip_height - (interval - 1);
    let first = u32::try_from(first_height)
        .ok()
        .and_then(|height| tip.ancestor(height))
        .ok_or(RetargetError::MissingAncestor {
            height: first_height,
            tip_height: tip.height(),
        })?;

    Ok(calculate_next_work_required(tip, first.time(), params, sink))
}

/// Walk back over emergency blocks until an interval boundary or a block
/// whose bits differ from the limit.
fn last_non_min_difficulty<'a, C: ChainView + ?Sized>(
    tip: BlockRef<'a, C>,
    interval: i64,
    pow_limit_bits: CompactTarget,
) -> BlockRef<'a, C> {
    let mut block = tip;
    while let Some(parent) = block.parent() {
        if i64::from(block.height()) % interval == 0 || block.bits() != pow_limit_bits {
            break;
        }
        block = parent;
    }
    block
}

/// Scale the tip's target by the clamped interval timespan.
///
/// `first_block_time` is the timestamp of the first block of the interval.
/// The product is taken before the quotient and wraps at 256 bits.
pub fn calculate_next_work_required<C, S>(
    tip: BlockRef<'_, C>,
    first_block_time: i64,
    params: &ConsensusParams,
    sink: &S,
) -> CompactTarget
where
    C: ChainView + ?Sized,
    S: TraceSink + ?Sized,
{
    if params.no_retargeting {
        return tip.bits();
    }

    let target_timespan = params.pow_target_timespan;

    // Limit adjustment step
    let raw_timespan = tip.time() - first_block_time;
    let mut actual_timespan = raw_timespan;
    if actual_timespan < target_timespan / 4 {
        actual_timespan = target_timespan / 4;
    }
    if actual_timespan > target_timespan.saturating_mul(4) {
        actual_timespan = target_timespan.saturating_mul(4);
    }

    let prior_target = tip.bits().to_target();
    let (scaled, _) = prior_target.overflowing_mul(U256::from(actual_timespan as u64));
    let mut new_target = scaled / U256::from(target_timespan as u64);

    if new_target > params.pow_limit {
        new_target = params.pow_limit;
    }

    let new_bits = CompactTarget::from_target(&new_target);

    sink.record(&RetargetEvent::Legacy(LegacyTrace {
        tip_height: tip.height(),
        raw_timespan,
        actual_timespan,
        target_timespan,
        prior_bits: tip.bits(),
        prior_target,
        new_bits,
        new_target,
    }));

    new_bits
}
