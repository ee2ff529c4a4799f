//! Terminal Velocity: per-block adaptive retarget.
//!
//! Every block after activation looks at the last five block intervals,
//! maps each onto a fixed ladder of tier multipliers, and divides the base
//! block's target by the averaged multiplier (scaled by 10000).
//!
//! The averaging is done in `f64` and the scaled factor truncated to an
//! integer before it touches the target. The target is divided first and
//! multiplied second. Both details are part of the consensus rule.

use primitive_types::U256;

use crate::block::BlockHeader;
use crate::chain::{BlockRef, ChainView};
use crate::compact::CompactTarget;
use crate::error::RetargetResult;
use crate::params::ConsensusParams;
use crate::trace::{RetargetEvent, TraceSink, VelocityTrace};

/// Number of block intervals sampled per retarget.
pub const SAMPLE_INTERVALS: usize = 5;

/// Fixed-point scale applied to the averaged multiplier.
const FACTOR_SCALE: u64 = 10_000;

/// Seconds past the target spacing before an interval counts as slow.
const SLOW_MARGIN: i64 = 60;

/// Seconds past the target spacing before an interval counts as stalled.
const STALL_MARGIN: i64 = 3 * 60;

/// Seconds under the target spacing before an interval counts as rapid.
const RAPID_MARGIN: i64 = 60;

/// Seconds under the target spacing before an interval counts as a surge.
const SURGE_MARGIN: i64 = 2 * 60;

/// Classification of one block interval against the target spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VelocityTier {
    /// More than three minutes late.
    Stalled,
    /// More than one minute late.
    Slow,
    /// On time or up to one minute late.
    Steady,
    /// Early by up to one minute.
    Quick,
    /// Early by more than one minute.
    Rapid,
    /// Early by more than two minutes.
    Surge,
}

impl VelocityTier {
    /// Place an interval on the ladder. The most extreme crossed rung wins.
    pub fn classify(duration: i64, spacing: i64) -> Self {
        if duration >= spacing {
            if duration > spacing + STALL_MARGIN {
                VelocityTier::Stalled
            } else if duration > spacing + SLOW_MARGIN {
                VelocityTier::Slow
            } else {
                VelocityTier::Steady
            }
        } else if duration < spacing - SURGE_MARGIN {
            VelocityTier::Surge
        } else if duration < spacing - RAPID_MARGIN {
            VelocityTier::Rapid
        } else {
            VelocityTier::Quick
        }
    }

    /// Multiplier the tier contributes to the average.
    pub fn multiplier(self) -> f64 {
        match self {
            VelocityTier::Stalled => 0.5,
            VelocityTier::Slow => 0.75,
            VelocityTier::Steady => 1.0,
            VelocityTier::Quick => 1.25,
            VelocityTier::Rapid => 1.5,
            VelocityTier::Surge => 2.0,
        }
    }
}

/// Required bits for the block after `tip` under Terminal Velocity.
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
    let spacing = params.pow_target_spacing;

    // Not enough history since activation to sample.
    if u64::from(tip.height()) < u64::from(params.vrx_height) + 2 {
        sink.record(&RetargetEvent::Bootstrap {
            tip_height: tip.height(),
        });
        return Ok(pow_limit_bits);
    }

    let stall_time = tip.time().saturating_add(spacing.saturating_mul(2));
    if header.block_time() > stall_time && tip.height() > params.min_diff_vrx_height {
        sink.record(&RetargetEvent::MinDifficulty {
            tip_height: tip.height(),
            tip_time: tip.time(),
            candidate_time: header.block_time(),
        });
        return Ok(pow_limit_bits);
    }

    let mut durations = [0i64; SAMPLE_INTERVALS];
    let mut multipliers = [0f64; SAMPLE_INTERVALS];
    let mut block = tip;
    for (duration, multiplier) in durations.iter_mut().zip(multipliers.iter_mut()) {
        let parent = block.require_parent()?;
        *duration = block.time() - parent.time();
        *multiplier = VelocityTier::classify(*duration, spacing).multiplier();
        block = parent;
    }

    let average = multipliers.iter().sum::<f64>() / SAMPLE_INTERVALS as f64;

    let base = if tip.height() > params.min_diff_vrx_height {
        last_non_min_difficulty(tip, pow_limit_bits)
    } else {
        tip
    };

    let factor = (FACTOR_SCALE as f64 * average) as i64;
    let prior_target = base.bits().to_target();
    let (mut new_target, _) = (prior_target / U256::from(factor as u64))
        .overflowing_mul(U256::from(FACTOR_SCALE));

    if new_target > params.pow_limit {
        new_target = params.pow_limit;
    }

    let new_bits = CompactTarget::from_target(&new_target);

    sink.record(&RetargetEvent::Velocity(VelocityTrace {
        tip_height: tip.height(),
        durations,
        multipliers,
        average,
        factor,
        base_height: base.height(),
        prior_bits: base.bits(),
        prior_target,
        new_bits,
        new_target,
    }));

    Ok(new_bits)
}

/// Walk back while the block sits at the floor (its target is at least the
/// compact-rounded limit). Stops at genesis if every block is at the floor.
fn last_non_min_difficulty<'a, C: ChainView + ?Sized>(
    tip: BlockRef<'a, C>,
    pow_limit_bits: CompactTarget,
) -> BlockRef<'a, C> {
    let floor = pow_limit_bits.to_target();
    let mut block = tip;
    while block.bits().to_target() >= floor {
        match block.parent() {
            Some(parent) => block = parent,
            None => {
                tracing::warn!(
                    target: "retarget",
                    tip_height = tip.height(),
                    "Reached genesis while skipping min-difficulty blocks"
                );
                break;
            }
        }
    }
    block
}
