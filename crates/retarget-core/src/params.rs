//! Consensus parameters and built-in network presets.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::compact::{u256_hex, CompactTarget};
use crate::error::ParamsError;

/// Per-network retarget configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusParams {
    /// Easiest allowed target.
    #[serde(with = "u256_hex")]
    pub pow_limit: U256,
    /// Desired seconds between blocks.
    pub pow_target_spacing: i64,
    /// Desired seconds per legacy retarget interval.
    pub pow_target_timespan: i64,
    /// Permit emergency min-difficulty blocks when the chain stalls.
    #[serde(default)]
    pub allow_min_difficulty_blocks: bool,
    /// Freeze the legacy difficulty at the tip's bits.
    #[serde(default)]
    pub no_retargeting: bool,
    /// First height retargeted by Terminal Velocity.
    pub vrx_height: u32,
    /// Tip height above which Terminal Velocity resets on stalls and skips
    /// min-difficulty blocks.
    pub min_diff_vrx_height: u32,
}

impl ConsensusParams {
    /// Number of blocks between legacy retargets.
    pub fn difficulty_adjustment_interval(&self) -> i64 {
        self.pow_target_timespan / self.pow_target_spacing
    }

    /// The proof-of-work limit in compact form.
    pub fn pow_limit_compact(&self) -> CompactTarget {
        CompactTarget::from_target(&self.pow_limit)
    }

    /// Parse and validate parameters from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        let params: ConsensusParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ParamsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the invariants the retarget arithmetic relies on.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.pow_limit.is_zero() {
            return Err(ParamsError::ZeroPowLimit);
        }
        if self.pow_target_spacing <= 0 {
            return Err(ParamsError::InvalidSpacing(self.pow_target_spacing));
        }
        for (name, value) in [
            ("pow_target_spacing", self.pow_target_spacing),
            ("pow_target_timespan", self.pow_target_timespan),
        ] {
            if value > MAX_PERIOD {
                return Err(ParamsError::PeriodTooLong { name, value });
            }
        }
        if self.pow_target_timespan < self.pow_target_spacing
            || self.pow_target_timespan % self.pow_target_spacing != 0
        {
            return Err(ParamsError::InvalidTimespan {
                timespan: self.pow_target_timespan,
                spacing: self.pow_target_spacing,
            });
        }
        Ok(())
    }
}

/// Network type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    /// Local testing: legacy retarget only, difficulty never moves.
    Regtest,
}

/// Longest spacing or timespan accepted, in seconds. Block times are `u32`,
/// and the retarget scales these by small constants in `i64`.
pub const MAX_PERIOD: i64 = u32::MAX as i64;

/// Limit shared by mainnet and testnet (compact `0x1e0fffff`).
fn main_pow_limit() -> U256 {
    (U256::one() << 236) - 1
}

/// Regtest limit (compact `0x207fffff`).
fn regtest_pow_limit() -> U256 {
    (U256::one() << 255) - 1
}

/// Five-minute blocks.
const TARGET_SPACING: i64 = 5 * 60;

/// Half-day legacy interval (144 blocks).
const TARGET_TIMESPAN: i64 = 12 * 60 * 60;

impl Network {
    /// Consensus parameters for this network.
    pub fn params(&self) -> ConsensusParams {
        match self {
            Network::Mainnet => ConsensusParams {
                pow_limit: main_pow_limit(),
                pow_target_spacing: TARGET_SPACING,
                pow_target_timespan: TARGET_TIMESPAN,
                allow_min_difficulty_blocks: false,
                no_retargeting: false,
                vrx_height: 15,
                min_diff_vrx_height: 125_000,
            },
            Network::Testnet => ConsensusParams {
                pow_limit: main_pow_limit(),
                pow_target_spacing: TARGET_SPACING,
                pow_target_timespan: TARGET_TIMESPAN,
                allow_min_difficulty_blocks: true,
                no_retargeting: false,
                vrx_height: 15,
                min_diff_vrx_height: 20,
            },
            Network::Regtest => ConsensusParams {
                pow_limit: regtest_pow_limit(),
                pow_target_spacing: TARGET_SPACING,
                pow_target_timespan: TARGET_TIMESPAN,
                allow_min_difficulty_blocks: true,
                no_retargeting: true,
                vrx_height: u32::MAX,
                min_diff_vrx_height: u32::MAX,
            },
        }
    }

    /// Parse network from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mainnet" | "main" => Some(Network::Mainnet),
            "testnet" | "test" => Some(Network::Testnet),
            "regtest" => Some(Network::Regtest),
            _ => None,
        }
    }

    /// Get network name as string.
    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
        }
    }
}

impl core::fmt::Display for Network {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compact::target_to_hex;

    #[test]
    fn test_preset_limits() {
        assert_eq!(Network::Mainnet.params().pow_limit_compact(), CompactTarget(0x1e0fffff));
        assert_eq!(Network::Testnet.params().pow_limit_compact(), CompactTarget(0x1e0fffff));
        assert_eq!(Network::Regtest.params().pow_limit_compact(), CompactTarget(0x207fffff));
    }

    #[test]
    fn test_preset_limit_values() {
        assert_eq!(
            target_to_hex(&Network::Mainnet.params().pow_limit),
            "00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
        );
        assert_eq!(
            target_to_hex(&Network::Regtest.params().pow_limit),
            "7fffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
        );
    }

    #[test]
    fn test_presets_are_valid() {
        for network in [Network::Mainnet, Network::Testnet, Network::Regtest] {
            let params = network.params();
            params.validate().unwrap();
            assert_eq!(params.difficulty_adjustment_interval(), 144);
        }
    }

    #[test]
    fn test_network_from_str() {
        assert_eq!(Network::from_str("mainnet"), Some(Network::Mainnet));
        assert_eq!(Network::from_str("TESTNET"), Some(Network::Testnet));
        assert_eq!(Network::from_str("regtest"), Some(Network::Regtest));
        assert_eq!(Network::from_str("invalid"), None);
        assert_eq!(Network::default().to_string(), "mainnet");
    }

    #[test]
    fn test_params_json() {
        let json = r#"{
            "pow_limit": "0x00000fffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
            "pow_target_spacing": 300,
            "pow_target_timespan": 43200,
            "allow_min_difficulty_blocks": true,
            "vrx_height": 15,
            "min_diff_vrx_height": 20
        }"#;

        let params = ConsensusParams::from_json(json).unwrap();
        assert_eq!(params, Network::Testnet.params());

        let reparsed = ConsensusParams::from_json(&params.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, params);
    }

    #[test]
    fn test_params_validation() {
        let mut params = Network::Mainnet.params();
        params.pow_target_timespan = 1000;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::InvalidTimespan { timespan: 1000, spacing: 300 })
        ));

        params.pow_target_spacing = 0;
        assert!(matches!(params.validate(), Err(ParamsError::InvalidSpacing(0))));

        let mut params = Network::Mainnet.params();
        params.pow_limit = U256::zero();
        assert!(matches!(params.validate(), Err(ParamsError::ZeroPowLimit)));

        let mut params = Network::Mainnet.params();
        params.pow_target_spacing = i64::MAX / 2 + 1;
        params.pow_target_timespan = i64::MAX / 2 + 1;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::PeriodTooLong { name: "pow_target_spacing", .. })
        ));

        params.pow_target_spacing = MAX_PERIOD;
        params.pow_target_timespan = MAX_PERIOD;
        params.validate().unwrap();

        params.pow_target_spacing = 300;
        params.pow_target_timespan = (MAX_PERIOD / 300 + 1) * 300;
        assert!(matches!(
            params.validate(),
            Err(ParamsError::PeriodTooLong { name: "pow_target_timespan", .. })
        ));

        assert!(matches!(
            ConsensusParams::from_json("{\"pow_limit\": \"xyz\"}"),
            Err(ParamsError::Json(_))
        ));
    }
}
