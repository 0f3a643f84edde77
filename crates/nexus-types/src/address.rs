//! Cashaddr syntax
//!
//! Destination addresses coming out of an LLM decision are untrusted text.
//! This module gives the guard a syntactic check: known network prefix,
//! cashaddr base32 charset, and a plausible payload length. Full checksum
//! and script-type validation stay with the network provider, which is the
//! party that actually builds outputs for the address.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::Network;

/// Cashaddr base32 alphabet.
const CHARSET: &str = "qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Payload lengths (including checksum) for the defined hash sizes.
const MIN_PAYLOAD_LEN: usize = 42;
const MAX_PAYLOAD_LEN: usize = 112;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("address '{value}' is missing a network prefix")]
    MissingPrefix { value: String },

    #[error("unknown address prefix '{prefix}'")]
    UnknownPrefix { prefix: String },

    #[error("address payload contains invalid character '{ch}'")]
    InvalidCharacter { ch: char },

    #[error("address payload length {len} is out of range")]
    BadLength { len: usize },

    #[error("address belongs to {actual}, agent is on {expected}")]
    WrongNetwork { actual: Network, expected: Network },
}

/// A prefixed cashaddr, stored lowercase.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CashAddress(String);

impl CashAddress {
    /// Parse and syntax-check a prefixed cashaddr.
    pub fn parse(value: &str) -> Result<Self, AddressError> {
        let lower = value.trim().to_lowercase();
        let (prefix, payload) = lower.split_once(':').ok_or(AddressError::MissingPrefix {
            value: value.to_string(),
        })?;

        Network::from_prefix(prefix).ok_or(AddressError::UnknownPrefix {
            prefix: prefix.to_string(),
        })?;

        if payload.len() < MIN_PAYLOAD_LEN || payload.len() > MAX_PAYLOAD_LEN {
            return Err(AddressError::BadLength { len: payload.len() });
        }
        if let Some(ch) = payload.chars().find(|c| !CHARSET.contains(*c)) {
            return Err(AddressError::InvalidCharacter { ch });
        }

        Ok(Self(lower))
    }

    /// Parse, additionally requiring the prefix to match `expected`.
    pub fn parse_for_network(value: &str, expected: Network) -> Result<Self, AddressError> {
        let address = Self::parse(value)?;
        let actual = address.network();
        if actual != expected {
            return Err(AddressError::WrongNetwork { actual, expected });
        }
        Ok(address)
    }

    /// Network this address belongs to. Infallible after `parse`.
    pub fn network(&self) -> Network {
        let prefix = self.0.split(':').next().unwrap_or_default();
        Network::from_prefix(prefix).unwrap_or(Network::Mainnet)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CashAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CashAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CashAddress({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn testnet_addr() -> String {
        format!("bchtest:{}", "q".repeat(42))
    }

    #[test]
    fn parses_prefixed_address() {
        let addr = CashAddress::parse(&testnet_addr()).unwrap();
        assert_eq!(addr.network(), Network::Testnet);
    }

    #[test]
    fn rejects_missing_prefix() {
        let err = CashAddress::parse(&"q".repeat(42)).unwrap_err();
        assert!(matches!(err, AddressError::MissingPrefix { .. }));
    }

    #[test]
    fn rejects_unknown_prefix() {
        let err = CashAddress::parse(&format!("doge:{}", "q".repeat(42))).unwrap_err();
        assert!(matches!(err, AddressError::UnknownPrefix { .. }));
    }

    #[test]
    fn rejects_bad_charset_and_length() {
        // 'b' is not in the cashaddr alphabet
        let err = CashAddress::parse(&format!("bchtest:{}", "b".repeat(42))).unwrap_err();
        assert!(matches!(err, AddressError::InvalidCharacter { ch: 'b' }));

        let err = CashAddress::parse("bchtest:qxxx").unwrap_err();
        assert!(matches!(err, AddressError::BadLength { len: 4 }));
    }

    #[test]
    fn rejects_wrong_network() {
        let err = CashAddress::parse_for_network(&testnet_addr(), Network::Mainnet).unwrap_err();
        assert!(matches!(
            err,
            AddressError::WrongNetwork {
                actual: Network::Testnet,
                expected: Network::Mainnet
            }
        ));
    }

    #[test]
    fn normalizes_case() {
        let addr = CashAddress::parse(&testnet_addr().to_uppercase()).unwrap();
        assert_eq!(addr.as_str(), testnet_addr());
    }
}
