//! Algorithm selection by height.

use crate::block::BlockHeader;
use crate::chain::{BlockId, BlockRef, ChainView};
use crate::compact::CompactTarget;
use crate::error::RetargetResult;
use crate::params::ConsensusParams;
use crate::trace::{Algorithm, RetargetEvent, TraceSink, TracingSink};
use crate::{legacy, velocity};

/// Computes the bits each new block must carry.
///
/// Holds no chain state: every call reads the borrowed chain view and
/// returns a fresh value, so one engine can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct DifficultyEngine<'p, S = TracingSink> {
    params: &'p ConsensusParams,
    sink: S,
}

impl<'p> DifficultyEngine<'p, TracingSink> {
    /// Engine that reports diagnostics through `tracing`.
    pub fn new(params: &'p ConsensusParams) -> Self {
        DifficultyEngine {
            params,
            sink: TracingSink,
        }
    }
}

impl<'p, S: TraceSink> DifficultyEngine<'p, S> {
    /// Engine that reports diagnostics to `sink`.
    pub fn with_sink(params: &'p ConsensusParams, sink: S) -> Self {
        DifficultyEngine { params, sink }
    }

    /// Which rule retargets the block at `next_height`.
    pub fn algorithm_for(&self, next_height: u64) -> Algorithm {
        if next_height >= u64::from(self.params.vrx_height) {
            Algorithm::TerminalVelocity
        } else {
            Algorithm::Legacy
        }
    }

    /// Required bits for the block after `tip`; `None` means genesis.
    pub fn next_work_required<C: ChainView + ?Sized>(
        &self,
        tip: Option<BlockRef<'_, C>>,
        header: &BlockHeader,
    ) -> RetargetResult<CompactTarget> {
        let Some(tip) = tip else {
            return Ok(self.params.pow_limit_compact());
        };

        let next_height = u64::from(tip.height()) + 1;
        let algorithm = self.algorithm_for(next_height);
        self.sink.record(&RetargetEvent::Dispatch {
            next_height,
            algorithm,
        });

        match algorithm {
            Algorithm::TerminalVelocity => {
                velocity::next_work_required(tip, header, self.params, &self.sink)
            }
            Algorithm::Legacy => legacy::next_work_required(tip, header, self.params, &self.sink),
        }
    }

    /// Same as [`DifficultyEngine::next_work_required`], resolving the tip by handle.
    pub fn next_work_for<C: ChainView + ?Sized>(
        &self,
        chain: &C,
        tip: Option<BlockId>,
        header: &BlockHeader,
    ) -> RetargetResult<CompactTarget> {
        let tip = tip.map(|id| chain.require(id)).transpose()?;
        self.next_work_required(tip, header)
    }
}

/// Required bits for the block after `tip`, logging through `tracing`.
pub fn get_next_work_required<C: ChainView + ?Sized>(
    tip: Option<BlockRef<'_, C>>,
    header: &BlockHeader,
    params: &ConsensusParams,
) -> RetargetResult<CompactTarget> {
    DifficultyEngine::new(params).next_work_required(tip, header)
}
