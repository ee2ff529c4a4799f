//! Block header as seen by the proof-of-work rules.

use crate::compact::CompactTarget;
use crate::hash::{double_sha256, hash_to_display_hex};

/// Block version with BIP9 versionbits.
pub const BLOCK_VERSION: i32 = 0x20000000;

/// Size of a serialized block header in bytes.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// An 80-byte Bitcoin-style block header.
///
/// Retargeting only reads `timestamp` of the candidate; the full header is
/// needed to hash it for the proof check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    /// Block version with BIP9 versionbits.
    pub version: i32,
    /// Hash of the previous block (internal byte order).
    pub prev_block_hash: [u8; 32],
    /// Merkle root of all transactions.
    pub merkle_root: [u8; 32],
    /// Block timestamp (Unix time).
    pub timestamp: u32,
    /// Difficulty target in compact "bits" format.
    pub bits: CompactTarget,
    /// Nonce for proof of work.
    pub nonce: u32,
}

impl BlockHeader {
    /// Create a new block header with a zero nonce.
    pub fn new(
        prev_block_hash: [u8; 32],
        merkle_root: [u8; 32],
        timestamp: u32,
        bits: CompactTarget,
    ) -> Self {
        BlockHeader {
            version: BLOCK_VERSION,
            prev_block_hash,
            merkle_root,
            timestamp,
            bits,
            nonce: 0,
        }
    }

    /// Candidate header carrying only a timestamp, for difficulty queries.
    pub fn at_time(timestamp: u32) -> Self {
        BlockHeader::new([0u8; 32], [0u8; 32], timestamp, CompactTarget::default())
    }

    /// Block time widened for signed interval arithmetic.
    pub fn block_time(&self) -> i64 {
        i64::from(self.timestamp)
    }

    /// Serialize the block header to 80 bytes.
    pub fn serialize(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let mut header = [0u8; BLOCK_HEADER_SIZE];
        header[0..4].copy_from_slice(&self.version.to_le_bytes());
        header[4..36].copy_from_slice(&self.prev_block_hash);
        header[36..68].copy_from_slice(&self.merkle_root);
        header[68..72].copy_from_slice(&self.timestamp.to_le_bytes());
        header[72..76].copy_from_slice(&self.bits.to_consensus().to_le_bytes());
        header[76..80].copy_from_slice(&self.nonce.to_le_bytes());
        header
    }

    /// Compute the block hash (double SHA256, internal byte order).
    pub fn hash(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }

    /// Block hash in display format.
    pub fn hash_hex(&self) -> String {
        hash_to_display_hex(&self.hash())
    }
}
