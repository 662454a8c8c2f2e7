use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ethers::types::U256;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use tracing::{debug, info};

use crate::blockchain::chains::SUPPORTED_CHAIN_IDS;
use crate::core::errors::BotError;

/// Runtime configuration for the bridge cycler.
///
/// Values come from an optional TOML file first, then environment variables
/// override them. The swap API credential is only ever read from the
/// environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// RPC endpoint per chain id
    #[serde(deserialize_with = "deserialize_rpc_urls")]
    pub rpc_urls: BTreeMap<u64, String>,
    /// Percent, applied to both swap and bridge quotes
    pub slippage_tolerance: f64,
    /// Lower bound of the inter-cycle sleep, minutes
    pub interval_min: u64,
    /// Upper bound of the inter-cycle sleep, minutes
    pub interval_max: u64,
    pub swap_api_url: String,
    #[serde(skip)]
    pub swap_api_key: Option<Secret<String>>,
    pub swap_fee_percent: Option<f64>,
    pub referrer: Option<String>,
    pub bridge_api_url: String,
    pub gas_price_ceiling_gwei: f64,
    /// Chain that funds gas rescues
    pub reserve_chain_id: u64,
    /// No value means wait for receipts indefinitely
    pub confirmation_timeout_secs: Option<u64>,
    /// Share of the swap output that gets bridged, 1..=100
    pub bridge_fraction_percent: u8,
    /// Delay between a gas-rescue bridge and its status check
    pub rescue_wait_secs: u64,
    pub wallets_path: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            rpc_urls: default_rpc_urls(),
            slippage_tolerance: 1.0,
            interval_min: 5,
            interval_max: 15,
            swap_api_url: "https://api.1inch.dev/swap/v6.0".to_string(),
            swap_api_key: None,
            swap_fee_percent: None,
            referrer: None,
            bridge_api_url: "https://api.relay.link".to_string(),
            gas_price_ceiling_gwei: 0.1,
            reserve_chain_id: 42161,
            confirmation_timeout_secs: None,
            bridge_fraction_percent: 100,
            rescue_wait_secs: 60,
            wallets_path: PathBuf::from("wallets.json"),
        }
    }
}

impl BotConfig {
    /// Load `CONFIG_PATH` (default `cycler.toml`) if present, then apply env overrides.
    pub fn load() -> Result<Self, BotError> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "cycler.toml".to_string());
        let mut config = if Path::new(&path).exists() {
            info!("Loading configuration from {}", path);
            Self::from_file(&path)?
        } else {
            debug!("No config file at {}, using defaults", path);
            Self::default()
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, BotError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            BotError::Config(format!("Cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), BotError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for chain_id in SUPPORTED_CHAIN_IDS {
            if let Some(url) = lookup(&format!("RPC_URL_{}", chain_id)) {
                self.rpc_urls.insert(chain_id, url.trim().to_string());
            }
        }
        if let Some(v) = lookup("SLIPPAGE_TOLERANCE") {
            self.slippage_tolerance = parse_env("SLIPPAGE_TOLERANCE", &v)?;
        }
        if let Some(v) = lookup("INTERVAL_MIN") {
            self.interval_min = parse_env("INTERVAL_MIN", &v)?;
        }
        if let Some(v) = lookup("INTERVAL_MAX") {
            self.interval_max = parse_env("INTERVAL_MAX", &v)?;
        }
        if let Some(v) = lookup("SWAP_API_URL") {
            self.swap_api_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("SWAP_API_KEY") {
            if !v.trim().is_empty() {
                self.swap_api_key = Some(Secret::new(v.trim().to_string()));
            }
        }
        if let Some(v) = lookup("SWAP_FEE_PERCENT") {
            self.swap_fee_percent = Some(parse_env("SWAP_FEE_PERCENT", &v)?);
        }
        if let Some(v) = lookup("REFERRER") {
            self.referrer = Some(v.trim().to_string());
        }
        if let Some(v) = lookup("BRIDGE_API_URL") {
            self.bridge_api_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("GAS_PRICE_CEILING_GWEI") {
            self.gas_price_ceiling_gwei = parse_env("GAS_PRICE_CEILING_GWEI", &v)?;
        }
        if let Some(v) = lookup("RESERVE_CHAIN_ID") {
            self.reserve_chain_id = parse_env("RESERVE_CHAIN_ID", &v)?;
        }
        if let Some(v) = lookup("CONFIRMATION_TIMEOUT_SECS") {
            self.confirmation_timeout_secs = Some(parse_env("CONFIRMATION_TIMEOUT_SECS", &v)?);
        }
        if let Some(v) = lookup("BRIDGE_FRACTION_PERCENT") {
            self.bridge_fraction_percent = parse_env("BRIDGE_FRACTION_PERCENT", &v)?;
        }
        if let Some(v) = lookup("RESCUE_WAIT_SECS") {
            self.rescue_wait_secs = parse_env("RESCUE_WAIT_SECS", &v)?;
        }
        if let Some(v) = lookup("WALLETS_PATH") {
            self.wallets_path = PathBuf::from(v.trim());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), BotError> {
        for chain_id in SUPPORTED_CHAIN_IDS {
            match self.rpc_urls.get(&chain_id) {
                Some(url) => {
                    reqwest::Url::parse(url).map_err(|e| {
                        BotError::Config(format!("Invalid RPC URL for chain {}: {}", chain_id, e))
                    })?;
                }
                None => {
                    return Err(BotError::Config(format!("Missing RPC URL for chain {}", chain_id)))
                }
            }
        }
        if !(0.0..=50.0).contains(&self.slippage_tolerance) {
            return Err(BotError::Config(format!(
                "slippage_tolerance must be within 0..=50 percent, got {}",
                self.slippage_tolerance
            )));
        }
        if self.interval_min > self.interval_max {
            return Err(BotError::Config(format!(
                "interval_min ({}) exceeds interval_max ({})",
                self.interval_min, self.interval_max
            )));
        }
        if self.gas_price_ceiling_gwei <= 0.0 {
            return Err(BotError::Config("gas_price_ceiling_gwei must be positive".to_string()));
        }
        if !SUPPORTED_CHAIN_IDS.contains(&self.reserve_chain_id) {
            return Err(BotError::UnknownChain(self.reserve_chain_id));
        }
        if self.bridge_fraction_percent == 0 || self.bridge_fraction_percent > 100 {
            return Err(BotError::Config(format!(
                "bridge_fraction_percent must be within 1..=100, got {}",
                self.bridge_fraction_percent
            )));
        }
        Ok(())
    }

    /// The swap credential is only needed by commands that trade.
    pub fn require_swap_api_key(&self) -> Result<&str, BotError> {
        self.swap_api_key
            .as_ref()
            .map(|s| s.expose_secret().as_str())
            .ok_or_else(|| BotError::Config("SWAP_API_KEY is not set".to_string()))
    }

    pub fn gas_price_ceiling_wei(&self) -> U256 {
        // gwei carries 9 decimals; round to whole wei
        U256::from((self.gas_price_ceiling_gwei * 1e9).round() as u128)
    }

    /// Slippage as the integer basis-point string the bridge API expects.
    pub fn bridge_slippage_bps(&self) -> String {
        ((self.slippage_tolerance * 100.0).round() as u64).to_string()
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_secs.map(Duration::from_secs)
    }
}

fn default_rpc_urls() -> BTreeMap<u64, String> {
    let mut rpc_urls = BTreeMap::new();
    rpc_urls.insert(42161, "https://arb1.arbitrum.io/rpc".to_string());
    rpc_urls.insert(10, "https://mainnet.optimism.io".to_string());
    rpc_urls.insert(8453, "https://mainnet.base.org".to_string());
    rpc_urls.insert(59144, "https://rpc.linea.build".to_string());
    rpc_urls
}

/// TOML keys are strings; entries are merged over the public defaults.
fn deserialize_rpc_urls<'de, D>(deserializer: D) -> Result<BTreeMap<u64, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
    let mut urls = default_rpc_urls();
    for (key, url) in raw {
        let chain_id = key
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("rpc_urls key is not a chain id: {}", key)))?;
        urls.insert(chain_id, url);
    }
    Ok(urls)
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, BotError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| BotError::Config(format!("Invalid value for {}: {} ({})", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = BotConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.gas_price_ceiling_wei(), U256::from(100_000_000u64));
        assert_eq!(cfg.bridge_slippage_bps(), "100");
        assert!(cfg.confirmation_timeout().is_none());
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = BotConfig::default();
        cfg.apply_env_with(lookup_from(&[
            ("RPC_URL_8453", "http://localhost:8545"),
            ("SLIPPAGE_TOLERANCE", "0.5"),
            ("INTERVAL_MIN", "1"),
            ("INTERVAL_MAX", "2"),
            ("SWAP_API_KEY", "secret-key"),
            ("CONFIRMATION_TIMEOUT_SECS", "120"),
        ]))
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.rpc_urls[&8453], "http://localhost:8545");
        assert_eq!(cfg.bridge_slippage_bps(), "50");
        assert_eq!(cfg.interval_max, 2);
        assert_eq!(cfg.require_swap_api_key().unwrap(), "secret-key");
        assert_eq!(cfg.confirmation_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn bad_env_value_is_config_error() {
        let mut cfg = BotConfig::default();
        let err = cfg.apply_env_with(lookup_from(&[("INTERVAL_MIN", "soon")])).unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
    }

    #[test]
    fn inverted_interval_is_rejected() {
        let cfg = BotConfig { interval_min: 10, interval_max: 3, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(BotError::Config(_))));
    }

    #[test]
    fn unsupported_reserve_chain_is_rejected() {
        let cfg = BotConfig { reserve_chain_id: 1, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(BotError::UnknownChain(1))));
    }

    #[test]
    fn missing_api_key_is_reported() {
        let cfg = BotConfig::default();
        assert!(cfg.require_swap_api_key().is_err());
    }

    #[test]
    fn toml_file_parses_partial_tables() {
        let cfg: BotConfig = toml::from_str(
            r#"
            slippage_tolerance = 2.0
            reserve_chain_id = 10

            [rpc_urls]
            10 = "http://op.local"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.reserve_chain_id, 10);
        assert_eq!(cfg.rpc_urls.get(&10).map(String::as_str), Some("http://op.local"));
        assert_eq!(cfg.rpc_urls.get(&8453).map(String::as_str), Some("https://mainnet.base.org"));
        cfg.validate().unwrap();
    }
}
