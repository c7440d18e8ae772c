// src/config/network.rs
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Network the process serves. Only `Mainnet` runs the reported-hashrate job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Testnet4,
    Signet,
    Regtest,
    Liquid,
    Liquidtestnet,
}

impl Network {
    pub fn is_primary(self) -> bool {
        self == Network::Mainnet
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Testnet4 => "testnet4",
            Network::Signet => "signet",
            Network::Regtest => "regtest",
            Network::Liquid => "liquid",
            Network::Liquidtestnet => "liquidtestnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            // empty means "not configured", which is mainnet
            "" | "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "testnet4" => Ok(Network::Testnet4),
            "signet" => Ok(Network::Signet),
            "regtest" => Ok(Network::Regtest),
            "liquid" => Ok(Network::Liquid),
            "liquidtestnet" => Ok(Network::Liquidtestnet),
            other => anyhow::bail!("unknown network: {other}"),
        }
    }
}
