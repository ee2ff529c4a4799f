//! Structured diagnostics emitted by the retarget algorithms.
//!
//! Each call builds its events once from the values it already computed and
//! hands them to a [`TraceSink`]. Sinks observe; they never feed back into the
//! returned difficulty.

use primitive_types::U256;
use serde::Serialize;

use crate::compact::{target_to_hex, u256_hex, CompactTarget};
use crate::velocity::SAMPLE_INTERVALS;

/// Which retarget rule produced a difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Fixed-interval timespan ratio.
    Legacy,
    /// Per-block five-interval tier average.
    TerminalVelocity,
}

/// Snapshot of one legacy interval retarget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegacyTrace {
    pub tip_height: u32,
    /// `tip.time - first.time` before clamping.
    pub raw_timespan: i64,
    /// Timespan after clamping to `[T/4, 4T]`.
    pub actual_timespan: i64,
    pub target_timespan: i64,
    pub prior_bits: CompactTarget,
    #[serde(with = "u256_hex")]
    pub prior_target: U256,
    pub new_bits: CompactTarget,
    #[serde(with = "u256_hex")]
    pub new_target: U256,
}

/// Snapshot of one Terminal Velocity retarget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VelocityTrace {
    pub tip_height: u32,
    /// Sampled block intervals, newest first.
    pub durations: [i64; SAMPLE_INTERVALS],
    /// Tier multiplier of each interval, same order.
    pub multipliers: [f64; SAMPLE_INTERVALS],
    pub average: f64,
    /// Integer divisor applied to the base target (before `* 10000`).
    pub factor: i64,
    /// Height of the block whose bits were retargeted.
    pub base_height: u32,
    pub prior_bits: CompactTarget,
    #[serde(with = "u256_hex")]
    pub prior_target: U256,
    pub new_bits: CompactTarget,
    #[serde(with = "u256_hex")]
    pub new_target: U256,
}

/// Events a retarget call may emit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RetargetEvent {
    /// The engine picked an algorithm for `next_height`.
    Dispatch { next_height: u64, algorithm: Algorithm },
    /// Not enough Terminal Velocity history; difficulty reset to the limit.
    Bootstrap { tip_height: u32 },
    /// Chain stalled; the candidate may use the limit.
    MinDifficulty {
        tip_height: u32,
        tip_time: i64,
        candidate_time: i64,
    },
    Legacy(LegacyTrace),
    Velocity(VelocityTrace),
}

/// Receiver of retarget events.
pub trait TraceSink {
    fn record(&self, event: &RetargetEvent);
}

impl<T: TraceSink + ?Sized> TraceSink for &T {
    fn record(&self, event: &RetargetEvent) {
        (**self).record(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {
    fn record(&self, _event: &RetargetEvent) {}
}

/// Forwards events to `tracing` at debug level under the `retarget` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn record(&self, event: &RetargetEvent) {
        match event {
            RetargetEvent::Dispatch {
                next_height,
                algorithm,
            } => {
                tracing::debug!(target: "retarget", next_height, ?algorithm, "Retargeting");
            }
            RetargetEvent::Bootstrap { tip_height } => {
                tracing::debug!(
                    target: "retarget",
                    tip_height,
                    "Terminal Velocity bootstrap reset"
                );
            }
            RetargetEvent::MinDifficulty {
                tip_height,
                tip_time,
                candidate_time,
            } => {
                tracing::debug!(
                    target: "retarget",
                    tip_height,
                    tip_time,
                    candidate_time,
                    "Chain stalled, allowing min-difficulty block"
                );
            }
            RetargetEvent::Legacy(trace) => {
                tracing::debug!(
                    target: "retarget",
                    tip_height = trace.tip_height,
                    raw_timespan = trace.raw_timespan,
                    actual_timespan = trace.actual_timespan,
                    target_timespan = trace.target_timespan,
                    "Legacy retarget"
                );
                tracing::debug!(
                    target: "retarget",
                    "Before: {}  {}",
                    trace.prior_bits,
                    target_to_hex(&trace.prior_target)
                );
                tracing::debug!(
                    target: "retarget",
                    "After:  {}  {}",
                    trace.new_bits,
                    target_to_hex(&trace.new_target)
                );
            }
            RetargetEvent::Velocity(trace) => {
                tracing::debug!(
                    target: "retarget",
                    tip_height = trace.tip_height,
                    durations = ?trace.durations,
                    multipliers = ?trace.multipliers,
                    average = trace.average,
                    base_height = trace.base_height,
                    "Terminal Velocity retarget"
                );
                tracing::debug!(
                    target: "retarget",
                    "Prior Terminal-Velocity: {}  {}",
                    trace.prior_bits,
                    target_to_hex(&trace.prior_target)
                );
                tracing::debug!(
                    target: "retarget",
                    "New Terminal-Velocity:  {}  {}",
                    trace.new_bits,
                    target_to_hex(&trace.new_target)
                );
            }
        }
    }
}
