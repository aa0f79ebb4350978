//! Application configuration loaded from environment variables.

use crate::errors::{GatewayError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Soroban RPC endpoint (e.g. https://soroban-testnet.stellar.org)
    pub rpc_url: String,
    /// Passphrase of the network bundles are built for
    pub network_passphrase: String,
    /// Platform admin account that receives fees and deposit shares (Strkey)
    pub admin_address: String,
    /// Currency token contract every campaign raises in (Strkey)
    pub currency_contract: String,
    /// Path to the SQLite database file
    pub database_url: String,
    /// Port for the REST API server
    pub api_port: u16,
    /// How often (in seconds) to poll the RPC for new events
    pub poll_interval_secs: u64,
    /// Maximum number of events to fetch per RPC request
    pub events_per_page: u32,
    /// Ledger to start from if no cursor is saved
    pub start_ledger: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key).ok_or_else(|| {
                GatewayError::Config(format!("{key} environment variable is required"))
            })
        };

        Ok(Config {
            rpc_url: var("RPC_URL", "https://soroban-testnet.stellar.org"),
            network_passphrase: var(
                "NETWORK_PASSPHRASE",
                "Test SDF Network ; September 2015",
            ),
            admin_address: required("ADMIN_ADDRESS")?,
            currency_contract: required("CURRENCY_CONTRACT")?,
            database_url: var("DATABASE_URL", "sqlite:./hyperdrive.db"),
            api_port: parse(&var("API_PORT", "3001"), "API_PORT")?,
            poll_interval_secs: parse(&var("POLL_INTERVAL_SECS", "5"), "POLL_INTERVAL_SECS")?,
            events_per_page: parse(&var("EVENTS_PER_PAGE", "100"), "EVENTS_PER_PAGE")?,
            start_ledger: parse(&var("START_LEDGER", "0"), "START_LEDGER")?,
        })
    }
}

fn parse<T: std::str::FromStr>(raw: &str, key: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| GatewayError::Config(format!("Invalid {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 2] = [
        ("ADMIN_ADDRESS", "GADMIN"),
        ("CURRENCY_CONTRACT", "CCURRENCY"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let config = Config::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.rpc_url, "https://soroban-testnet.stellar.org");
        assert_eq!(config.network_passphrase, "Test SDF Network ; September 2015");
        assert_eq!(config.database_url, "sqlite:./hyperdrive.db");
        assert_eq!(config.api_port, 3001);
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.events_per_page, 100);
        assert_eq!(config.start_ledger, 0);
        assert_eq!(config.admin_address, "GADMIN");
        assert_eq!(config.currency_contract, "CCURRENCY");
    }

    #[test]
    fn missing_admin_is_an_error() {
        let err = Config::from_lookup(lookup(&[("CURRENCY_CONTRACT", "C")])).unwrap_err();
        assert!(err.to_string().contains("ADMIN_ADDRESS"));
    }

    #[test]
    fn missing_currency_is_an_error() {
        let err = Config::from_lookup(lookup(&[("ADMIN_ADDRESS", "G")])).unwrap_err();
        assert!(err.to_string().contains("CURRENCY_CONTRACT"));
    }

    #[test]
    fn invalid_port_is_an_error() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("API_PORT", "eighty"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: Invalid API_PORT");
    }

    #[test]
    fn overrides_are_honoured() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("START_LEDGER", "123456"));
        pairs.push(("EVENTS_PER_PAGE", "25"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.start_ledger, 123_456);
        assert_eq!(config.events_per_page, 25);
    }
}
