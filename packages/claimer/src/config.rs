//! Claimer configuration

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use bridge_sdk::{GasLimitConfig, PollerConfig};
use eyre::{eyre, Result, WrapErr};

/// Claimer configuration
#[derive(Clone)]
pub struct Config {
    /// JSON file in the `configuredBridges` shape
    pub routing_config: PathBuf,
    /// `(chain_id, rpc_url)` for every chain the claimer reads from
    pub rpc_urls: Vec<(u64, String)>,
    /// Signing key, only needed by `claim`
    pub private_key: Option<String>,
    /// Proof service endpoint, only needed by `claim`
    pub proof_service_url: Option<String>,

    /// Poll interval in milliseconds
    pub poll_interval_ms: u64,
    pub poll_tick_timeout_ms: Option<u64>,
    /// TTL of the invocation-delay cache; 0 disables it
    pub invocation_delay_cache_ttl_secs: u64,

    pub gas: GasLimitConfig,
}

fn default_poll_interval_ms() -> u64 {
    10_000
}

fn default_invocation_delay_cache_ttl_secs() -> u64 {
    0
}

impl Config {
    /// Load configuration from the environment, reading `.env` if present
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        let routing_config = env::var("ROUTING_CONFIG")
            .map_err(|_| eyre!("ROUTING_CONFIG required"))?
            .into();

        let rpc_urls = parse_rpc_urls(
            &env::var("CHAIN_RPC_URLS").map_err(|_| eyre!("CHAIN_RPC_URLS required"))?,
        )?;

        let defaults = GasLimitConfig::default();
        let gas = GasLimitConfig {
            eth_no_owner_gas_limit: parse_optional("ETH_NO_OWNER_GAS_LIMIT")?
                .unwrap_or(defaults.eth_no_owner_gas_limit),
            erc20_gas_limit_threshold: parse_optional("ERC20_GAS_LIMIT_THRESHOLD")?
                .unwrap_or(defaults.erc20_gas_limit_threshold),
            erc1155_gas_limit_threshold: parse_optional("ERC1155_GAS_LIMIT_THRESHOLD")?
                .unwrap_or(defaults.erc1155_gas_limit_threshold),
            ..defaults
        };

        let config = Self {
            routing_config,
            rpc_urls,
            private_key: env::var("PRIVATE_KEY").ok().filter(|v| !v.is_empty()),
            proof_service_url: env::var("PROOF_SERVICE_URL").ok().filter(|v| !v.is_empty()),
            poll_interval_ms: parse_optional("POLL_INTERVAL_MS")?
                .unwrap_or_else(default_poll_interval_ms),
            poll_tick_timeout_ms: parse_optional("POLL_TICK_TIMEOUT_MS")?,
            invocation_delay_cache_ttl_secs: parse_optional("INVOCATION_DELAY_CACHE_TTL_SECS")?
                .unwrap_or_else(default_invocation_delay_cache_ttl_secs),
            gas,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rpc_urls.is_empty() {
            return Err(eyre!("CHAIN_RPC_URLS must name at least one chain"));
        }
        for (chain_id, rpc_url) in &self.rpc_urls {
            url::Url::parse(rpc_url)
                .wrap_err_with(|| format!("Invalid RPC URL for chain {}", chain_id))?;
        }
        if self.poll_interval_ms == 0 {
            return Err(eyre!("POLL_INTERVAL_MS must be greater than 0"));
        }
        if self.poll_tick_timeout_ms == Some(0) {
            return Err(eyre!("POLL_TICK_TIMEOUT_MS must be greater than 0"));
        }
        if let Some(proof_url) = &self.proof_service_url {
            url::Url::parse(proof_url).wrap_err("Invalid PROOF_SERVICE_URL")?;
        }
        Ok(())
    }

    pub fn rpc_url(&self, chain_id: u64) -> Result<&str> {
        self.rpc_urls
            .iter()
            .find(|(id, _)| *id == chain_id)
            .map(|(_, url)| url.as_str())
            .ok_or_else(|| eyre!("No RPC URL configured for chain {}", chain_id))
    }

    pub fn private_key(&self) -> Result<&str> {
        self.private_key
            .as_deref()
            .ok_or_else(|| eyre!("PRIVATE_KEY required to claim"))
    }

    pub fn proof_service_url(&self) -> Result<&str> {
        self.proof_service_url
            .as_deref()
            .ok_or_else(|| eyre!("PROOF_SERVICE_URL required to claim"))
    }

    pub fn poller(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            tick_timeout: self.poll_tick_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn invocation_delay_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.invocation_delay_cache_ttl_secs)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("routing_config", &self.routing_config)
            .field("rpc_urls", &self.rpc_urls)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("proof_service_url", &self.proof_service_url)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("poll_tick_timeout_ms", &self.poll_tick_timeout_ms)
            .field(
                "invocation_delay_cache_ttl_secs",
                &self.invocation_delay_cache_ttl_secs,
            )
            .field("gas", &self.gas)
            .finish()
    }
}

/// Parse `id=url,id=url`
pub fn parse_rpc_urls(value: &str) -> Result<Vec<(u64, String)>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, url) = entry
                .split_once('=')
                .ok_or_else(|| eyre!("Invalid CHAIN_RPC_URLS entry {:?}, expected id=url", entry))?;
            let chain_id = id
                .trim()
                .parse()
                .map_err(|_| eyre!("Invalid chain id {:?} in CHAIN_RPC_URLS", id))?;
            Ok((chain_id, url.trim().to_string()))
        })
        .collect()
}

fn parse_optional<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| eyre!("Invalid {}", name)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "ROUTING_CONFIG",
        "CHAIN_RPC_URLS",
        "PRIVATE_KEY",
        "PROOF_SERVICE_URL",
        "POLL_INTERVAL_MS",
        "POLL_TICK_TIMEOUT_MS",
        "INVOCATION_DELAY_CACHE_TTL_SECS",
        "ETH_NO_OWNER_GAS_LIMIT",
        "ERC20_GAS_LIMIT_THRESHOLD",
        "ERC1155_GAS_LIMIT_THRESHOLD",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    fn set_required() {
        env::set_var("ROUTING_CONFIG", "bridges.json");
        env::set_var(
            "CHAIN_RPC_URLS",
            "1=http://localhost:8545, 2=http://localhost:8546",
        );
    }

    #[test]
    fn test_parse_rpc_urls() {
        let urls = parse_rpc_urls("1=http://a:8545,167000=https://b").unwrap();
        assert_eq!(
            urls,
            vec![
                (1, "http://a:8545".to_string()),
                (167000, "https://b".to_string())
            ]
        );
        assert!(parse_rpc_urls("http://a:8545").is_err());
        assert!(parse_rpc_urls("x=http://a").is_err());
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        set_required();

        let config = Config::from_env().unwrap();
        assert_eq!(config.poll_interval_ms, 10_000);
        assert_eq!(config.invocation_delay_cache_ttl_secs, 0);
        assert_eq!(config.poller().tick_timeout, None);
        assert_eq!(config.gas, GasLimitConfig::default());
        assert_eq!(config.rpc_url(2).unwrap(), "http://localhost:8546");
        assert!(config.private_key().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        set_required();
        env::set_var("POLL_INTERVAL_MS", "2500");
        env::set_var("POLL_TICK_TIMEOUT_MS", "1000");
        env::set_var("ERC20_GAS_LIMIT_THRESHOLD", "750000");

        let config = Config::from_env().unwrap();
        assert_eq!(config.poller().interval, Duration::from_millis(2500));
        assert_eq!(config.poller().tick_timeout, Some(Duration::from_secs(1)));
        assert_eq!(config.gas.erc20_gas_limit_threshold, 750_000);
        assert_eq!(config.gas.erc1155_gas_limit_threshold, 2_000_000);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_required() {
        clear_env();
        assert!(Config::from_env().is_err());
        env::set_var("ROUTING_CONFIG", "bridges.json");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_rejects_zero_interval() {
        clear_env();
        set_required();
        env::set_var("POLL_INTERVAL_MS", "0");
        assert!(Config::from_env().is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_debug_redacts_private_key() {
        clear_env();
        set_required();
        env::set_var(
            "PRIVATE_KEY",
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        );

        let config = Config::from_env().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("ac0974bec39a17e3"));
        clear_env();
    }
}
