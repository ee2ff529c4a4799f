//! Read-only view of the block index consumed by the retarget algorithms.
//!
//! Nodes live in an arena and refer to their parent by [`BlockId`], so a
//! retarget walk only ever borrows the index for the duration of one call.
//! Keeping the walked segment stable while a call runs is the caller's job.

use core::fmt;

use crate::compact::CompactTarget;
use crate::error::RetargetError;

/// Opaque handle of a node in a [`ChainIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The header fields retargeting needs from an indexed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIndexEntry {
    /// Height in the chain (genesis is 0).
    pub height: u32,
    /// Header timestamp (Unix seconds). Not guaranteed to increase.
    pub time: u32,
    /// Compact target claimed by the header.
    pub bits: CompactTarget,
    /// Immediate predecessor, `None` for genesis.
    pub parent: Option<BlockId>,
}

/// Lookup capability over an externally owned block index.
pub trait ChainView {
    /// Fetch the entry behind a handle.
    fn entry(&self, id: BlockId) -> Option<&BlockIndexEntry>;

    /// Borrow a node as a walkable cursor.
    fn block(&self, id: BlockId) -> Option<BlockRef<'_, Self>> {
        self.entry(id).map(|entry| BlockRef {
            chain: self,
            id,
            entry,
        })
    }

    /// Like [`ChainView::block`], but an unknown handle is an error.
    fn require(&self, id: BlockId) -> Result<BlockRef<'_, Self>, RetargetError> {
        self.block(id).ok_or(RetargetError::UnknownBlock(id))
    }
}

/// A borrowed node plus the view it came from.
pub struct BlockRef<'a, C: ChainView + ?Sized> {
    chain: &'a C,
    id: BlockId,
    entry: &'a BlockIndexEntry,
}

impl<'a, C: ChainView + ?Sized> Clone for BlockRef<'a, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, C: ChainView + ?Sized> Copy for BlockRef<'a, C> {}

impl<'a, C: ChainView + ?Sized> fmt::Debug for BlockRef<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockRef")
            .field("id", &self.id)
            .field("height", &self.entry.height)
            .field("time", &self.entry.time)
            .field("bits", &self.entry.bits)
            .finish()
    }
}

impl<'a, C: ChainView + ?Sized> BlockRef<'a, C> {
    /// Handle of this node.
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// The indexed header fields, borrowed for the view's lifetime.
    pub fn entry(&self) -> &'a BlockIndexEntry {
        self.entry
    }

    /// Height in the chain (genesis is 0).
    pub fn height(&self) -> u32 {
        self.entry.height
    }

    /// Block time widened for signed interval arithmetic.
    pub fn time(&self) -> i64 {
        i64::from(self.entry.time)
    }

    /// Compact target claimed by this block.
    pub fn bits(&self) -> CompactTarget {
        self.entry.bits
    }

    /// Immediate predecessor, `None` at genesis or when the parent is unknown.
    pub fn parent(&self) -> Option<BlockRef<'a, C>> {
        self.entry.parent.and_then(|id| self.chain.block(id))
    }

    /// Predecessor, or [`RetargetError::MissingParent`] when there is none.
    pub fn require_parent(&self) -> Result<BlockRef<'a, C>, RetargetError> {
        self.parent().ok_or(RetargetError::MissingParent {
            height: self.entry.height,
        })
    }

    /// Walk back to the ancestor at `height`.
    pub fn ancestor(&self, height: u32) -> Option<BlockRef<'a, C>> {
        if height > self.entry.height {
            return None;
        }
        let mut block = *self;
        while block.height() > height {
            block = block.parent()?;
        }
        Some(block)
    }
}

/// Arena-backed block index.
///
/// Entries are appended and never removed, so a [`BlockId`] stays valid for
/// the life of the index. Forks are allowed: any known block may be extended.
#[derive(Debug, Clone, Default)]
pub struct ChainIndex {
    entries: Vec<BlockIndexEntry>,
}

impl ChainIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a block without a parent at height 0.
    pub fn insert_genesis(&mut self, time: u32, bits: CompactTarget) -> BlockId {
        self.push(BlockIndexEntry {
            height: 0,
            time,
            bits,
            parent: None,
        })
    }

    /// Add a child of `parent` one height above it.
    pub fn insert(
        &mut self,
        parent: BlockId,
        time: u32,
        bits: CompactTarget,
    ) -> Result<BlockId, RetargetError> {
        let height = self
            .entry(parent)
            .ok_or(RetargetError::UnknownBlock(parent))?
            .height
            + 1;

        Ok(self.push(BlockIndexEntry {
            height,
            time,
            bits,
            parent: Some(parent),
        }))
    }

    /// Number of blocks in the index, across all branches.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no block has been inserted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: BlockIndexEntry) -> BlockId {
        self.entries.push(entry);
        BlockId(self.entries.len() - 1)
    }
}

impl ChainView for ChainIndex {
    fn entry(&self, id: BlockId) -> Option<&BlockIndexEntry> {
        self.entries.get(id.0)
    }
}

/// Helpers for laying out test chains.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Appends blocks one after another on a single branch.
    #[derive(Debug, Default)]
    pub struct ChainBuilder {
        pub index: ChainIndex,
        tip: Option<BlockId>,
        time: u32,
    }

    impl ChainBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        /// Append a block `spacing` seconds after the current tip.
        pub fn push(&mut self, spacing: u32, bits: u32) -> BlockId {
            let bits = CompactTarget(bits);
            let id = match self.tip {
                None => {
                    self.time = 1_600_000_000;
                    self.index.insert_genesis(self.time, bits)
                }
                Some(parent) => {
                    self.time += spacing;
                    self.index.insert(parent, self.time, bits).unwrap()
                }
            };
            self.tip = Some(id);
            id
        }

        /// Append `count` blocks with identical spacing and bits.
        pub fn extend(&mut self, count: usize, spacing: u32, bits: u32) -> BlockId {
            for _ in 0..count {
                self.push(spacing, bits);
            }
            self.tip()
        }

        pub fn tip(&self) -> BlockId {
            self.tip.unwrap()
        }

        pub fn tip_time(&self) -> u32 {
            self.time
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ChainBuilder;
    use super::*;

    #[test]
    fn test_insert_assigns_heights() {
        let mut chain = ChainIndex::new();
        let genesis = chain.insert_genesis(100, CompactTarget(0x1d00ffff));
        let one = chain.insert(genesis, 200, CompactTarget(0x1d00ffff)).unwrap();
        let two = chain.insert(one, 300, CompactTarget(0x1c00ffff)).unwrap();

        let block = chain.block(two).unwrap();
        assert_eq!(block.height(), 2);
        assert_eq!(block.time(), 300);
        assert_eq!(block.bits(), CompactTarget(0x1c00ffff));
        assert_eq!(block.parent().unwrap().id(), one);
        assert!(chain.block(genesis).unwrap().parent().is_none());
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn test_insert_unknown_parent() {
        let mut chain = ChainIndex::new();
        assert!(chain.is_empty());
        let err = chain.insert(BlockId(7), 0, CompactTarget(0)).unwrap_err();
        assert!(matches!(err, RetargetError::UnknownBlock(BlockId(7))));
    }

    #[test]
    fn test_forks_share_ancestors() {
        let mut chain = ChainIndex::new();
        let genesis = chain.insert_genesis(0, CompactTarget(0x1d00ffff));
        let a = chain.insert(genesis, 10, CompactTarget(0x1d00ffff)).unwrap();
        let b1 = chain.insert(a, 20, CompactTarget(0x1d00ffff)).unwrap();
        let b2 = chain.insert(a, 25, CompactTarget(0x1d00ffff)).unwrap();

        let left = chain.block(b1).unwrap();
        let right = chain.block(b2).unwrap();
        assert_eq!(left.height(), right.height());
        assert_eq!(left.parent().unwrap().id(), right.parent().unwrap().id());
    }

    #[test]
    fn test_ancestor_lookup() {
        let mut builder = ChainBuilder::new();
        let tip = builder.extend(10, 60, 0x1d00ffff);
        let tip = builder.index.block(tip).unwrap();

        assert_eq!(tip.height(), 9);
        assert_eq!(tip.ancestor(9).unwrap().id(), tip.id());
        assert_eq!(tip.ancestor(3).unwrap().height(), 3);
        assert_eq!(tip.ancestor(0).unwrap().height(), 0);
        assert!(tip.ancestor(10).is_none());
    }

    #[test]
    fn test_require_parent_at_genesis() {
        let mut builder = ChainBuilder::new();
        let genesis = builder.push(0, 0x1d00ffff);
        let block = builder.index.require(genesis).unwrap();
        let err = block.require_parent().unwrap_err();
        assert!(matches!(err, RetargetError::MissingParent { height: 0 }));
    }
}
