//! Deployment networks.
//!
//! The network name selects which key list is read from the configuration
//! file and where a deployment would be sent.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    #[default]
    Development,
    Regtest,
    Testnet,
    Mainnet,
}

impl NetworkType {
    pub const ALL: [NetworkType; 4] = [
        NetworkType::Development,
        NetworkType::Regtest,
        NetworkType::Testnet,
        NetworkType::Mainnet,
    ];

    /// Key used in `publicKeysByNetwork` and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            NetworkType::Development => "development",
            NetworkType::Regtest => "regtest",
            NetworkType::Testnet => "testnet",
            NetworkType::Mainnet => "mainnet",
        }
    }

    /// `None` for development: any local node is accepted.
    pub fn chain_id(&self) -> Option<u64> {
        match self {
            NetworkType::Development => None,
            NetworkType::Regtest => Some(33),
            NetworkType::Testnet => Some(31),
            NetworkType::Mainnet => Some(30),
        }
    }

    pub fn rpc_url(&self) -> &'static str {
        match self {
            NetworkType::Development => "http://127.0.0.1:8545",
            NetworkType::Regtest => "http://127.0.0.1:4444",
            NetworkType::Testnet => "https://public-node.testnet.rsk.co",
            NetworkType::Mainnet => "https://public-node.rsk.co",
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, NetworkType::Development | NetworkType::Regtest)
    }
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(NetworkType::Development),
            "regtest" => Ok(NetworkType::Regtest),
            "testnet" | "test" => Ok(NetworkType::Testnet),
            "mainnet" | "main" => Ok(NetworkType::Mainnet),
            _ => Err(format!(
                "Unknown network '{}'. Use 'development', 'regtest', 'testnet' or 'mainnet'.",
                s
            )),
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_type_names() {
        let names: Vec<_> = NetworkType::ALL.iter().map(|n| n.name()).collect();
        assert_eq!(names, ["development", "regtest", "testnet", "mainnet"]);
    }

    #[test]
    fn test_chain_ids() {
        assert_eq!(NetworkType::Development.chain_id(), None);
        assert_eq!(NetworkType::Regtest.chain_id(), Some(33));
        assert_eq!(NetworkType::Testnet.chain_id(), Some(31));
        assert_eq!(NetworkType::Mainnet.chain_id(), Some(30));
    }

    #[test]
    fn test_parse_network() {
        assert_eq!("development".parse::<NetworkType>().unwrap(), NetworkType::Development);
        assert_eq!("dev".parse::<NetworkType>().unwrap(), NetworkType::Development);
        assert_eq!("REGTEST".parse::<NetworkType>().unwrap(), NetworkType::Regtest);
        assert_eq!("test".parse::<NetworkType>().unwrap(), NetworkType::Testnet);
        assert_eq!("Main".parse::<NetworkType>().unwrap(), NetworkType::Mainnet);
        assert!("ropsten".parse::<NetworkType>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for net in NetworkType::ALL {
            assert_eq!(net.to_string().parse::<NetworkType>().unwrap(), net);
        }
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&NetworkType::Regtest).unwrap(), "\"regtest\"");
    }
}
