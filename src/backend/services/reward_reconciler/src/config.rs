use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sp_core::H160;
use std::{fs, io, path::Path, path::PathBuf};

use crate::models::chain::TxSettings;
use crate::utils::errors::{ReconcilerError, Result};

const CONFIG_DIR: &str = "reward-reconciler";
const CONFIG_FILE: &str = "config.toml";

/// Fee distributor factory on mainnet.
const MAINNET_FACTORY: H160 = H160([
    0xd5, 0xb7, 0x68, 0x0f, 0x95, 0xc5, 0xa6, 0xca, 0xec, 0xdb, 0xbe, 0xb1, 0xde, 0xe5, 0x80, 0x96,
    0x0c, 0x4f, 0x89, 0x1b,
]);

/// Reward oracle on mainnet.
const MAINNET_ORACLE: H160 = H160([
    0x10, 0x5d, 0x2f, 0x6c, 0x35, 0x8d, 0x18, 0x5d, 0x1d, 0x81, 0xa7, 0x3c, 0x1f, 0x76, 0xa7, 0x5a,
    0x2c, 0xc5, 0x00, 0xed,
]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// Earliest ledger date considered. Test networks have no cutover.
    pub fn ledger_cutoff(&self, mainnet_cutover: NaiveDate) -> Option<NaiveDate> {
        match self {
            Network::Mainnet => Some(mainnet_cutover),
            Network::Testnet => None,
        }
    }
}

/// Configuration for a reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    pub network: Network,
    /// First ledger date counted on mainnet
    pub mainnet_cutover_date: NaiveDate,
    pub factory_address: H160,
    pub oracle_address: H160,
    /// Account that signs every report and withdrawal
    pub operator_address: H160,
    /// Block the factory log replay starts from
    pub factory_from_block: u64,
    /// Blocks per event-log query
    pub log_chunk_size: u64,
    pub gas_limit: u64,
    /// Where the tree dump is written
    pub tree_path: PathBuf,
    /// Postgres warehouse holding `validators_summary`
    pub database_url: Option<String>,
    /// JSON export of ledger rows, used when no database is configured
    pub ledger_export_path: Option<PathBuf>,
    /// JSON chain snapshot for offline runs
    pub chain_snapshot_path: Option<PathBuf>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            mainnet_cutover_date: NaiveDate::from_ymd_opt(2023, 7, 11).unwrap_or(NaiveDate::MIN),
            factory_address: MAINNET_FACTORY,
            oracle_address: MAINNET_ORACLE,
            operator_address: H160::zero(),
            factory_from_block: 0,
            log_chunk_size: 50_000,
            gas_limit: 200_000,
            tree_path: PathBuf::from("tree.json"),
            database_url: None,
            ledger_export_path: None,
            chain_snapshot_path: None,
        }
    }
}

impl ReconcilerConfig {
    /// Load from `path`, or from the default location, creating it with defaults
    /// if it does not exist yet.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let config_path = Self::default_path();
                if config_path.exists() {
                    Self::read(&config_path)?
                } else {
                    let default_config = Self::default();
                    default_config.save(&config_path)?;
                    default_config
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join(CONFIG_DIR)
            .join(CONFIG_FILE)
    }

    fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                ReconcilerError::Config(format!("config file {} not found", path.display()))
            }
            _ => ReconcilerError::Io(e),
        })?;

        toml::from_str(&raw)
            .map_err(|e| ReconcilerError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let toml = toml::to_string_pretty(self).map_err(|e| ReconcilerError::Config(e.to_string()))?;
        fs::write(path, toml)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_chunk_size == 0 {
            return Err(ReconcilerError::Config("log_chunk_size must be positive".to_string()));
        }
        if self.gas_limit == 0 {
            return Err(ReconcilerError::Config("gas_limit must be positive".to_string()));
        }
        if self.database_url.is_none() && self.ledger_export_path.is_none() {
            return Err(ReconcilerError::Config(
                "one of database_url or ledger_export_path is required".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ledger_cutoff(&self) -> Option<NaiveDate> {
        self.network.ledger_cutoff(self.mainnet_cutover_date)
    }

    pub fn tx_settings(&self) -> TxSettings {
        TxSettings {
            gas_limit: self.gas_limit,
        }
    }
}
