use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A normalized EVM address: `0x` followed by 40 lowercase hex characters.
///
/// Construction always normalizes case, so two `EvmAddress` values compare
/// equal regardless of the checksum casing of the string they were parsed
/// from — equality on the wire is case-insensitive by spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvmAddress(String);

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

impl EvmAddress {
    pub fn parse(raw: &str) -> Result<Self> {
        if !is_valid_evm_address(raw) {
            return Err(CoreError::Validation(format!("invalid EVM address: {raw}")));
        }
        Ok(EvmAddress(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == ZERO_ADDRESS
    }

    pub fn zero() -> Self {
        EvmAddress(ZERO_ADDRESS.to_string())
    }
}

/// `0x` + exactly 40 hex digits (case-insensitive on input, the equivalent
/// of the spec's "exact regex" `^0x[0-9a-fA-F]{40}$`).
fn is_valid_evm_address(raw: &str) -> bool {
    let Some(hex) = raw.strip_prefix("0x") else {
        return false;
    };
    hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

impl fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EvmAddress {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self> {
        EvmAddress::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_address() {
        let addr = EvmAddress::parse("0xAbC1230000000000000000000000000000dEaD").unwrap();
        assert_eq!(addr.as_str(), "0xabc1230000000000000000000000000000dead");
    }

    #[test]
    fn equality_is_case_insensitive() {
        let a = EvmAddress::parse("0xabc1230000000000000000000000000000dead").unwrap();
        let b = EvmAddress::parse("0xABC1230000000000000000000000000000DEAD").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_wrong_length_or_missing_prefix() {
        assert!(EvmAddress::parse("0x123").is_err());
        assert!(EvmAddress::parse("abc1230000000000000000000000000000dead0").is_err());
        assert!(EvmAddress::parse("0xzzc1230000000000000000000000000000dead").is_err());
    }

    #[test]
    fn zero_address_predicate() {
        assert!(EvmAddress::zero().is_zero());
        let real = EvmAddress::parse("0xabc1230000000000000000000000000000dead").unwrap();
        assert!(!real.is_zero());
    }
}
