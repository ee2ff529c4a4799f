//! Proof-of-work difficulty retargeting for a Bitcoin-derived chain.
//!
//! This crate provides pure Rust implementations of:
//! - Compact "bits" target encoding with negative/overflow detection
//! - The legacy fixed-interval retarget
//! - The Terminal Velocity per-block retarget
//! - Height-based dispatch between the two
//! - Proof-of-work checks against a claimed target
//!
//! Every computation reads a borrowed, read-only chain view and returns a new
//! value; nothing is cached between calls.

pub mod block;
pub mod chain;
pub mod compact;
pub mod engine;
pub mod error;
pub mod hash;
pub mod legacy;
pub mod params;
pub mod pow;
pub mod trace;
pub mod velocity;

pub use primitive_types::U256;

pub use block::BlockHeader;
pub use chain::{BlockId, BlockIndexEntry, BlockRef, ChainIndex, ChainView};
pub use compact::{CompactTarget, DecodedTarget};
pub use engine::{get_next_work_required, DifficultyEngine};
pub use error::{ParamsError, PowError, RetargetError, RetargetResult};
pub use params::{ConsensusParams, Network};
pub use pow::{check_header_proof_of_work, check_proof_of_work, verify_proof_of_work};
pub use trace::{Algorithm, NoopSink, RetargetEvent, TraceSink, TracingSink};
pub use velocity::VelocityTier;
