use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use grants_core::config;
use grants_core::crypto;
use grants_core::types::decode_hex;
use grants_core::{Amount, LocalChain, Timestamp};

#[derive(Parser, Debug)]
#[command(name = "grants-cli", version, about = "Federation grants program tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decompress a 33-byte secp256k1 public key to its 64-byte x||y form.
    Decompress {
        /// Compressed key hex (0x optional).
        #[arg(long)]
        key: String,
    },

    /// Derive the payable address of a compressed public key.
    Address {
        /// Compressed key hex (0x optional).
        #[arg(long)]
        key: String,
    },

    /// Validate a deployment config for one network.
    CheckConfig {
        /// Config path (default: $GRANTS_CONFIG or config.json).
        #[arg(long)]
        config: Option<PathBuf>,

        /// development, regtest, testnet or mainnet (default: $GRANTS_NETWORK or development).
        #[arg(long)]
        network: Option<String>,
    },

    /// Deploy on an in-process chain, fund it and run payout cycles.
    Simulate {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long)]
        network: Option<String>,

        /// Amount the owner sends to the program before the first cycle.
        #[arg(long)]
        fund: u128,

        /// Number of payout cycles, one period apart.
        #[arg(long, default_value_t = 1)]
        cycles: u32,
    },
}

fn format_time(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

fn simulate(
    config_path: Option<PathBuf>,
    network_name: Option<String>,
    fund: Amount,
    cycles: u32,
) -> Result<()> {
    let params = config::load_deployment(config_path.as_deref(), network_name.as_deref())?;
    let owner = params.owner;
    let start = u64::try_from(Utc::now().timestamp()).unwrap_or_default();

    let chain = LocalChain::from_params(&params, start).context("deploying program")?;
    chain.credit(&owner, fund)?;
    chain.fund(&owner, fund).context("funding program")?;

    let rounds = chain
        .run_payout_cycles(owner, cycles)
        .context("running payout cycles")?;
    for event in rounds.iter().flatten() {
        println!("{}", serde_json::to_string(event)?);
    }

    let next = chain.view(|p| p.next_payout_at());
    let summary = json!({
        "program": chain.program_address().to_string(),
        "network": params.network.name(),
        "balance": chain.program_balance().to_string(),
        "nextPayoutAt": next.map(format_time),
    });
    println!("{}", summary);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Decompress { key } => {
            let raw = decode_hex(&key)?;
            let out = crypto::decompress(&raw).with_context(|| format!("decompressing {}", key))?;
            println!("{}", out);
        }
        Command::Address { key } => {
            let raw = decode_hex(&key)?;
            let addr = crypto::address_from_public_key(&raw)
                .with_context(|| format!("deriving address of {}", key))?;
            println!("{}", addr);
        }
        Command::CheckConfig { config: path, network: net } => {
            let params = config::load_deployment(path.as_deref(), net.as_deref())?;
            let federators: Vec<_> = params
                .feds_pub_keys
                .iter()
                .map(|k| {
                    crypto::address_from_key(k).map(|a| {
                        json!({
                            "key": k.to_string(),
                            "address": a.to_string(),
                            "onCurve": crypto::check_on_curve(k).is_ok(),
                        })
                    })
                })
                .collect::<std::result::Result<_, _>>()?;
            let report = json!({
                "network": params.network.name(),
                "chainId": params.network.chain_id(),
                "rpcUrl": params.network.rpc_url(),
                "local": params.network.is_local(),
                "owner": params.owner.to_string(),
                "periodLength": params.period_length,
                "amountToPay": params.amount_to_pay.to_string(),
                "federators": federators,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Simulate { config: path, network: net, fund, cycles } => {
            simulate(path, net, fund, cycles)?;
        }
    }

    Ok(())
}
