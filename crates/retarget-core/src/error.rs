//! Error types for retargeting, proof checks and configuration.

use thiserror::Error;

use crate::chain::BlockId;

/// Precondition failures of a retarget call.
///
/// Callers must hand in a validated chain deep enough for the lookback; any of
/// these means that contract was broken, never that the difficulty should
/// fall back to some default.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetargetError {
    /// Handle does not resolve in the chain view.
    #[error("Block {0} is not in the chain index")]
    UnknownBlock(BlockId),

    /// A walk ran off the start of the chain.
    #[error("Block at height {height} has no parent")]
    MissingParent { height: u32 },

    /// The first block of a legacy retarget interval is not reachable.
    #[error("No ancestor at height {height} below tip {tip_height}")]
    MissingAncestor { height: i64, tip_height: u32 },
}

/// Reasons a header fails its proof-of-work check.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowError {
    /// Sign bit set on a non-zero mantissa.
    #[error("Compact target {0:08x} is negative")]
    Negative(u32),

    /// Target does not fit in 256 bits.
    #[error("Compact target {0:08x} overflows 256 bits")]
    Overflow(u32),

    /// Target expands to zero.
    #[error("Compact target {0:08x} is zero")]
    Zero(u32),

    /// Target is easier than the network allows.
    #[error("Compact target {0:08x} is above the proof-of-work limit")]
    AboveLimit(u32),

    /// Hash does not satisfy the claimed target.
    #[error("Block hash is above its claimed target {0:08x}")]
    HashAboveTarget(u32),
}

/// Invalid consensus parameters.
#[derive(Error, Debug)]
pub enum ParamsError {
    /// Malformed JSON document.
    #[error("Invalid params JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// `pow_limit` is zero.
    #[error("Proof-of-work limit must be non-zero")]
    ZeroPowLimit,

    /// Target block spacing must be positive.
    #[error("Target spacing must be positive, got {0}")]
    InvalidSpacing(i64),

    /// Spacing or timespan too long for the retarget arithmetic.
    #[error("{name} of {value} seconds exceeds the supported maximum")]
    PeriodTooLong { name: &'static str, value: i64 },

    /// Timespan must be a positive whole number of spacings.
    #[error("Target timespan {timespan} is not a positive multiple of spacing {spacing}")]
    InvalidTimespan { timespan: i64, spacing: i64 },
}

/// Result type for retarget operations.
pub type RetargetResult<T> = Result<T, RetargetError>;
