// Server configuration, read from the environment (and `.env` if present)

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:1234";
pub const DEFAULT_SNAPSHOT_PATH: &str = "data/markets.json";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// JSON snapshot loaded on start and written on shutdown
    pub snapshot_path: PathBuf,
    pub log_level: Level,
    /// Most collateral a single faucet call may issue, in whole units
    pub faucet_limit: Decimal,
    pub collateral_symbol: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 1234)),
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            log_level: Level::INFO,
            faucet_limit: dec!(100000),
            collateral_symbol: "USDC".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load `.env`, then read BIND_ADDR, SNAPSHOT_PATH, LOG_LEVEL,
    /// FAUCET_LIMIT and COLLATERAL_SYMBOL. Unset variables keep their default.
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .map_err(|e| format!("Invalid BIND_ADDR '{}': {}", addr, e))?;
        }
        if let Some(path) = lookup("SNAPSHOT_PATH") {
            config.snapshot_path = PathBuf::from(path);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = Level::from_str(&level)
                .map_err(|e| format!("Invalid LOG_LEVEL '{}': {}", level, e))?;
        }
        if let Some(limit) = lookup("FAUCET_LIMIT") {
            let limit = Decimal::from_str(&limit)
                .map_err(|e| format!("Invalid FAUCET_LIMIT '{}': {}", limit, e))?;
            if limit.is_sign_negative() {
                return Err(format!("FAUCET_LIMIT must not be negative, got {}", limit));
            }
            config.faucet_limit = limit;
        }
        if let Some(symbol) = lookup("COLLATERAL_SYMBOL") {
            config.collateral_symbol = symbol;
        }

        Ok(config)
    }
}
