use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::EvmAddress;
use crate::error::{CoreError, Result};

/// Enumerated currency taxonomy. Fiat and stablecoin currencies carry
/// different decimal precision, which is why `Amount` never hardcodes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Usd,
    Usdc,
    Usdt,
}

impl Currency {
    pub fn decimals(&self) -> u8 {
        match self {
            Currency::Usd => 2,
            Currency::Usdc | Currency::Usdt => 6,
        }
    }

    pub fn is_stablecoin(&self) -> bool {
        matches!(self, Currency::Usdc | Currency::Usdt)
    }

    pub fn is_fiat(&self) -> bool {
        matches!(self, Currency::Usd)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Usdc => "USDC",
            Currency::Usdt => "USDT",
        }
    }

    /// The ERC-20 contract address backing the stablecoin, if applicable.
    /// Mainnet addresses are used as stable, well-known defaults; deployments
    /// against other networks are expected to override via configuration.
    pub fn contract_address(&self) -> Option<EvmAddress> {
        match self {
            Currency::Usd => None,
            Currency::Usdc => {
                EvmAddress::parse("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48").ok()
            }
            Currency::Usdt => {
                EvmAddress::parse("0xdac17f958d2ee523a2206206994597c13d831ec7").ok()
            }
        }
    }

    pub fn parse(code: &str) -> Result<Self> {
        match code.to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "USDC" => Ok(Currency::Usdc),
            "USDT" => Ok(Currency::Usdt),
            other => Err(CoreError::Validation(format!("unknown currency: {other}"))),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self> {
        Currency::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_currencies() {
        assert_eq!(Currency::parse("usd").unwrap(), Currency::Usd);
        assert_eq!(Currency::parse("USDC").unwrap(), Currency::Usdc);
    }

    #[test]
    fn rejects_unknown_currency() {
        assert!(Currency::parse("EUR").is_err());
    }

    #[test]
    fn decimals_match_taxonomy() {
        assert_eq!(Currency::Usd.decimals(), 2);
        assert_eq!(Currency::Usdt.decimals(), 6);
    }

    #[test]
    fn only_stablecoins_carry_a_contract_address() {
        assert!(Currency::Usd.contract_address().is_none());
        assert!(Currency::Usdc.contract_address().is_some());
    }
}
