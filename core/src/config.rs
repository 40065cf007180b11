//! Deployment configuration.
//!
//! Reads the JSON deployment file, picks the key list for one network and
//! validates everything before a program is built from it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::network::NetworkType;
use crate::types::{Address, Amount, CompressedPublicKey, ADDRESS_LEN, COMPRESSED_KEY_LEN};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "GRANTS_CONFIG";
pub const NETWORK_ENV: &str = "GRANTS_NETWORK";

/// Raw contract parameters. Numbers are signed so that non-positive values
/// reach validation instead of failing in the parser.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ContractData {
    pub owner_address: String,
    pub period_length: i64,
    pub amount_to_pay: i128,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub contract_data: ContractData,
    #[serde(default)]
    pub public_keys_by_network: HashMap<String, Vec<String>>,
}

/// Validated constructor arguments for one network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentParams {
    pub network: NetworkType,
    pub owner: Address,
    pub period_length: u64,
    pub amount_to_pay: Amount,
    pub feds_pub_keys: Vec<CompressedPublicKey>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Validate contract data and the key list of `network`.
    pub fn deployment(&self, network: NetworkType) -> Result<DeploymentParams> {
        let data = &self.contract_data;
        let owner = validate_owner_address(&data.owner_address)?;

        if data.period_length <= 0 {
            bail!("Period length must be greater than 0");
        }
        if data.amount_to_pay <= 0 {
            bail!("Amount to pay must be greater than 0");
        }

        let keys = self
            .public_keys_by_network
            .get(network.name())
            .ok_or_else(|| anyhow!("No public keys configured for network '{}'", network))?;
        let feds_pub_keys = validate_pub_keys(keys)?;

        debug!(%network, federators = feds_pub_keys.len(), "deployment config validated");
        Ok(DeploymentParams {
            network,
            owner,
            period_length: data.period_length as u64,
            amount_to_pay: data.amount_to_pay as Amount,
            feds_pub_keys,
        })
    }
}

fn with_marker(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("0x") {
        trimmed.to_string()
    } else {
        format!("0x{}", trimmed)
    }
}

pub fn validate_owner_address(raw: &str) -> Result<Address> {
    let addr = with_marker(raw);
    let digits = &addr[2..];
    if digits.len() != ADDRESS_LEN * 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        bail!("Address must be 20 bytes long");
    }
    addr.parse()
        .map_err(|e| anyhow!("Owner address {} is invalid: {}", addr, e))
}

/// Each key gets a `0x` marker if missing, then must start with 02 or 03
/// and be 33 bytes long. Whether the key lies on the curve is not checked
/// here; `crypto::check_on_curve` does that on request.
pub fn validate_pub_keys(keys: &[String]) -> Result<Vec<CompressedPublicKey>> {
    keys.iter()
        .map(|raw| -> Result<CompressedPublicKey> {
            let key = with_marker(raw);
            let prefix = key.get(2..4).unwrap_or_default();
            if prefix != "02" && prefix != "03" {
                bail!("Public key {} is invalid. Must begin with 02 or 03", key);
            }
            if key.len() != 2 + COMPRESSED_KEY_LEN * 2 {
                bail!("Invalid length for public key {}. Must be 33 bytes long", key);
            }
            key.parse()
                .map_err(|e| anyhow!("Public key {} is invalid: {}", key, e))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Explicit path, else `GRANTS_CONFIG`, else `config.json`.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    if let Ok(p) = std::env::var(CONFIG_PATH_ENV) {
        if !p.trim().is_empty() {
            return PathBuf::from(p);
        }
    }
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

/// Explicit name, else `GRANTS_NETWORK`, else development.
pub fn resolve_network(explicit: Option<&str>) -> Result<NetworkType> {
    let name = match explicit {
        Some(n) => n.to_string(),
        None => match std::env::var(NETWORK_ENV) {
            Ok(n) if !n.trim().is_empty() => n,
            _ => return Ok(NetworkType::default()),
        },
    };
    name.parse::<NetworkType>().map_err(|e| anyhow!(e))
}

/// Resolve, load and validate in one step.
pub fn load_deployment(path: Option<&Path>, network: Option<&str>) -> Result<DeploymentParams> {
    let path = resolve_config_path(path);
    let network = resolve_network(network)?;
    let params = ConfigFile::load(&path)?
        .deployment(network)
        .with_context(|| format!("validating {} for {}", path.display(), network))?;
    info!(
        config = %path.display(),
        %network,
        owner = %params.owner,
        federators = params.feds_pub_keys.len(),
        "deployment parameters loaded"
    );
    Ok(params)
}
