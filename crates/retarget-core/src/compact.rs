//! Compact "bits" encoding of 256-bit difficulty targets.
//!
//! The bits format is: [exponent (1 byte)][sign (1 bit)][mantissa (23 bits)]
//! Target = mantissa * 256^(exponent - 3)
//!
//! Encoding is lossy: only the three most significant bytes of a target
//! survive. Every node must reproduce the same truncation, so both directions
//! follow the reference `SetCompact`/`GetCompact` behaviour bit for bit,
//! including the negative and overflow flags reported on decode.

use core::fmt;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Sign bit inside the 24-bit mantissa field.
const SIGN_BIT: u32 = 0x0080_0000;

/// Mantissa mask with the sign bit stripped.
const MANTISSA_MASK: u32 = 0x007f_ffff;

/// A 32-bit compact difficulty target as stored in block headers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompactTarget(pub u32);

/// Result of expanding a compact target, with the anomaly flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedTarget {
    /// Expanded target value (meaningless when `overflow` is set).
    pub target: U256,
    /// Sign bit set on a non-zero mantissa.
    pub negative: bool,
    /// Value does not fit in 256 bits.
    pub overflow: bool,
}

impl CompactTarget {
    /// Wrap raw header bits.
    pub const fn new(bits: u32) -> Self {
        CompactTarget(bits)
    }

    /// Raw 32-bit value.
    pub const fn to_consensus(self) -> u32 {
        self.0
    }

    /// Expand to a full target, reporting negative and overflowing encodings.
    pub fn decode(self) -> DecodedTarget {
        let bits = self.0;
        let size = (bits >> 24) as usize;
        let mut word = bits & MANTISSA_MASK;

        let target = if size <= 3 {
            word >>= 8 * (3 - size);
            U256::from(word)
        } else {
            // Shifts of 256 bits or more yield zero; the overflow flag covers them.
            U256::from(word) << (8 * (size - 3))
        };

        let negative = word != 0 && (bits & SIGN_BIT) != 0;
        let overflow = word != 0
            && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32));

        DecodedTarget {
            target,
            negative,
            overflow,
        }
    }

    /// Expand to a full target, ignoring the anomaly flags.
    ///
    /// Bits stored in the chain index already passed the proof check, so the
    /// retarget walks have no use for the flags.
    pub fn to_target(self) -> U256 {
        self.decode().target
    }

    /// Compress a target into compact form, truncating to three mantissa bytes.
    pub fn from_target(target: &U256) -> Self {
        let mut size = (target.bits() + 7) / 8;
        let mut compact = if size <= 3 {
            (target.low_u64() << (8 * (3 - size))) as u32
        } else {
            (*target >> (8 * (size - 3))).low_u64() as u32
        };

        // Keep the mantissa positive by moving one byte into the exponent.
        if compact & SIGN_BIT != 0 {
            compact >>= 8;
            size += 1;
        }

        CompactTarget(compact | ((size as u32) << 24))
    }

    /// Re-encode through the full target, yielding the canonical compact form.
    pub fn normalized(self) -> Self {
        CompactTarget::from_target(&self.to_target())
    }
}

impl From<u32> for CompactTarget {
    fn from(bits: u32) -> Self {
        CompactTarget(bits)
    }
}

impl From<CompactTarget> for u32 {
    fn from(bits: CompactTarget) -> Self {
        bits.0
    }
}

impl fmt::Display for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl fmt::Debug for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompactTarget")
            .field(&format_args!("{:#010x}", self.0))
            .finish()
    }
}

/// Render a target as 64 lowercase hex digits, most significant byte first.
pub fn target_to_hex(target: &U256) -> String {
    let mut bytes = [0u8; 32];
    target.to_big_endian(&mut bytes);
    hex::encode(bytes)
}

/// Parse a big-endian hex target. An optional `0x` prefix is accepted.
pub fn target_from_hex(s: &str) -> Result<U256, hex::FromHexError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(digits)?;
    if bytes.len() > 32 {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    Ok(U256::from_big_endian(&bytes))
}

/// Serde adapter storing a `U256` as a big-endian hex string.
pub(crate) mod u256_hex {
    use primitive_types::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::target_to_hex(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::target_from_hex(&s).map_err(de::Error::custom)
    }
}
