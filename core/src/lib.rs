//! Federation grants program core.
//!
//! Derives payable addresses from compressed secp256k1 federator keys and
//! pays every federator a fixed amount once per period, under a single
//! owner who can retune the schedule, ban members and withdraw the funds.

pub mod chain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod network;
pub mod program;
pub mod types;

pub use chain::LocalChain;
pub use config::{ConfigFile, DeploymentParams};
pub use error::{GrantsError, Result, TransferError};
pub use ledger::{Ledger, MemoryLedger};
pub use network::NetworkType;
pub use program::{Event, GrantsProgram};
pub use types::{Address, Amount, CallContext, CompressedPublicKey, DecompressedPublicKey, Timestamp};
