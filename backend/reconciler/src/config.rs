//! Application configuration loaded from environment variables.

use crate::errors::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Ethereum JSON-RPC endpoint (e.g. http://127.0.0.1:8545)
    pub rpc_url: String,
    /// The RealEstate contract address (0x-prefixed hex)
    pub contract_address: String,
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the operational HTTP server
    pub api_port: u16,
    /// How often (in seconds) the reconciler polls for new blocks
    pub poll_interval_secs: u64,
    /// Upper bound on blocks scanned in a single reconciliation pass
    pub max_blocks_per_pass: u64,
    /// Block to start from if no cursor has been persisted yet
    pub start_block: u64,
    /// How long (in seconds) to wait for a submitted transaction to mine
    pub tx_timeout_secs: u64,
    /// Lease duration (in seconds) for the single-writer cursor lock
    pub lease_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            rpc_url: env_var("RPC_URL").unwrap_or_else(|_| "http://127.0.0.1:8545".to_string()),
            contract_address: env_var("CONTRACT_ADDRESS")
                .map_err(|_| {
                    Error::Config("CONTRACT_ADDRESS environment variable is required".to_string())
                })?
                .to_lowercase(),
            database_url: env_var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:./real_estate_mirror.db".to_string()),
            api_port: env_var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .map_err(|_| Error::Config("Invalid API_PORT".to_string()))?,
            poll_interval_secs: env_var("POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| Error::Config("Invalid POLL_INTERVAL_SECS".to_string()))?,
            max_blocks_per_pass: env_var("MAX_BLOCKS_PER_PASS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .map_err(|_| Error::Config("Invalid MAX_BLOCKS_PER_PASS".to_string()))?,
            start_block: env_var("START_BLOCK")
                .unwrap_or_else(|_| "0".to_string())
                .parse()
                .map_err(|_| Error::Config("Invalid START_BLOCK".to_string()))?,
            tx_timeout_secs: env_var("TX_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .map_err(|_| Error::Config("Invalid TX_TIMEOUT_SECS".to_string()))?,
            lease_secs: env_var("LEASE_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| Error::Config("Invalid LEASE_SECS".to_string()))?,
        })
    }
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| Error::Config(format!("Missing env var: {key}")))
}
