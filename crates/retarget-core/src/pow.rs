//! Proof-of-work check against a header's claimed target.
//!
//! Header bits are attacker controlled, so every malformed encoding is a
//! plain rejection here, never a panic.

use primitive_types::U256;

use crate::block::BlockHeader;
use crate::compact::CompactTarget;
use crate::error::PowError;
use crate::params::ConsensusParams;

/// Check `hash` (internal little-endian byte order) against `bits`.
pub fn verify_proof_of_work(
    hash: &[u8; 32],
    bits: CompactTarget,
    params: &ConsensusParams,
) -> Result<(), PowError> {
    let raw = bits.to_consensus();
    let decoded = bits.decode();

    // Check range
    if decoded.negative {
        return Err(PowError::Negative(raw));
    }
    if decoded.overflow {
        return Err(PowError::Overflow(raw));
    }
    if decoded.target.is_zero() {
        return Err(PowError::Zero(raw));
    }
    if decoded.target > params.pow_limit {
        return Err(PowError::AboveLimit(raw));
    }

    // Check proof of work matches claimed amount
    if U256::from_little_endian(hash) > decoded.target {
        return Err(PowError::HashAboveTarget(raw));
    }

    Ok(())
}

/// Boolean form of [`verify_proof_of_work`].
pub fn check_proof_of_work(hash: &[u8; 32], bits: CompactTarget, params: &ConsensusParams) -> bool {
    verify_proof_of_work(hash, bits, params).is_ok()
}

/// Hash a header and check it against its own bits.
pub fn check_header_proof_of_work(header: &BlockHeader, params: &ConsensusParams) -> bool {
    check_proof_of_work(&header.hash(), header.bits, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Network;

    fn le_bytes(value: U256) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        value.to_little_endian(&mut bytes);
        bytes
    }

    #[test]
    fn test_hash_at_or_below_target_passes() {
        let params = Network::Mainnet.params();
        let bits = CompactTarget(0x1c0fffff);
        let target = bits.to_target();

        assert!(check_proof_of_work(&le_bytes(target), bits, &params));
        assert!(check_proof_of_work(&le_bytes(target - U256::one()), bits, &params));
        assert!(check_proof_of_work(&[0u8; 32], bits, &params));
    }

    #[test]
    fn test_hash_above_target_fails() {
        let params = Network::Mainnet.params();
        let bits = CompactTarget(0x1c0fffff);
        let target = bits.to_target();

        assert_eq!(
            verify_proof_of_work(&le_bytes(target + U256::one()), bits, &params),
            Err(PowError::HashAboveTarget(0x1c0fffff))
        );
        assert!(!check_proof_of_work(&[0xff; 32], bits, &params));
    }

    #[test]
    fn test_hash_is_little_endian() {
        let params = Network::Mainnet.params();
        let bits = CompactTarget(0x1c0fffff);

        // A single high byte at the start is tiny as a little-endian number.
        let mut hash = [0u8; 32];
        hash[0] = 0xff;
        assert!(check_proof_of_work(&hash, bits, &params));

        hash.reverse();
        assert!(!check_proof_of_work(&hash, bits, &params));
    }

    #[test]
    fn test_malformed_bits_fail() {
        let params = Network::Mainnet.params();
        let zero_hash = [0u8; 32];

        assert_eq!(
            verify_proof_of_work(&zero_hash, CompactTarget(0x1c8fffff), &params),
            Err(PowError::Negative(0x1c8fffff))
        );
        assert_eq!(
            verify_proof_of_work(&zero_hash, CompactTarget(0x1c000000), &params),
            Err(PowError::Zero(0x1c000000))
        );
        assert_eq!(
            verify_proof_of_work(&zero_hash, CompactTarget(0x01003456), &params),
            Err(PowError::Zero(0x01003456))
        );
        assert_eq!(
            verify_proof_of_work(&zero_hash, CompactTarget(0x22000100), &params),
            Err(PowError::Overflow(0x22000100))
        );
        assert!(!check_proof_of_work(&zero_hash, CompactTarget(0xff123456), &params));
    }

    #[test]
    fn test_above_pow_limit_fails() {
        let params = Network::Mainnet.params();
        let zero_hash = [0u8; 32];

        assert!(check_proof_of_work(&zero_hash, CompactTarget(0x1e0fffff), &params));
        assert_eq!(
            verify_proof_of_work(&zero_hash, CompactTarget(0x1f00ffff), &params),
            Err(PowError::AboveLimit(0x1f00ffff))
        );
        assert!(!check_proof_of_work(&zero_hash, CompactTarget(0x207fffff), &params));
    }

    #[test]
    fn test_header_check() {
        let regtest = Network::Regtest.params();
        let mainnet = Network::Mainnet.params();

        // Half of all hashes meet the regtest limit.
        let mut header =
            BlockHeader::new([0x11; 32], [0x22; 32], 1_600_000_000, CompactTarget(0x207fffff));
        let solved = (0..256u32).find(|&nonce| {
            header.nonce = nonce;
            check_header_proof_of_work(&header, &regtest)
        });
        assert!(solved.is_some());
        assert!(!check_header_proof_of_work(&header, &mainnet));
    }
}
