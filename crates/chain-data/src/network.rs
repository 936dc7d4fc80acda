//! Supported networks and their provider identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A network the scanner can inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Ethereum,
    Base,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Ethereum, Network::Base];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Base => "base",
        }
    }

    /// Alchemy network slug used in the endpoint host name.
    pub fn provider_slug(&self) -> &'static str {
        match self {
            Network::Ethereum => "eth-mainnet",
            Network::Base => "base-mainnet",
        }
    }

    /// JSON-RPC endpoint for this network.
    pub fn provider_url(&self, api_key: &str) -> String {
        format!("https://{}.g.alchemy.com/v2/{}", self.provider_slug(), api_key)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a network name is not one of the supported networks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported network '{0}', expected 'ethereum' or 'base'")]
pub struct UnknownNetwork(pub String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ethereum" => Ok(Network::Ethereum),
            "base" => Ok(Network::Base),
            _ => Err(UnknownNetwork(s.to_string())),
        }
    }
}
