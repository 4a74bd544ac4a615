use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use crate::error::ConfigError;

/// Production token contract, used when no contract address is configured
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x818fc6c2ec5986bc6e2cbf00939d90556ab12ce5";

/// Public hosted endpoint, used when no endpoint is configured
pub const DEFAULT_RPC_ENDPOINT: &str = "https://mainnet.infura.io";

pub const DEFAULT_GAS_LIMIT: u64 = 90_000;

/// 50 gwei
pub const DEFAULT_GAS_PRICE_WEI: u64 = 50_000_000_000;

/// SDK configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub rpc: RpcConfig,
    pub wallet: WalletConfig,
    pub contract: ContractConfig,
    pub transaction: TransactionConfig,
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
}

/// RPC client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Signing identity. Without a key the SDK runs in anonymous mode.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Hex-encoded secp256k1 private key
    #[serde(skip_serializing)]
    pub private_key: Option<String>,
}

impl std::fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Token contract configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Token contract address
    pub address: String,
    /// Contract ABI as JSON; the built-in token ABI is used when absent
    pub abi: Option<String>,
    /// Token decimals used to convert between whole units and base units
    pub decimals: u8,
}

/// Fixed parameters applied to every transaction the SDK signs.
///
/// The legacy receipt heuristic in the status resolver assumes `gas_limit` is the generous
/// default; see [`TransactionConfig::gas_limit_overridden`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    pub gas_limit: u64,
    pub gas_price_wei: u64,
    /// EIP-155 chain id; `None` signs replayable pre-EIP-155 transactions
    pub chain_id: Option<u64>,
    /// Total submission attempts when the node reports a nonce collision
    pub nonce_retry_attempts: u32,
    /// Fixed delay between nonce-collision attempts
    pub nonce_retry_delay_ms: u64,
    /// Serialize sends issued through one SDK instance
    pub serialize_sends: bool,
}

/// Transaction monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// How often node filters are polled for changes
    pub poll_interval_ms: u64,
    /// Capacity of the notification channel between pollers and the dispatcher
    pub channel_capacity: usize,
    /// Resolve receipts for plain transfers seen in new blocks instead of assuming success
    pub verify_native_receipts: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_RPC_ENDPOINT.to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            abi: None,
            decimals: 18,
        }
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            gas_price_wei: DEFAULT_GAS_PRICE_WEI,
            chain_id: Some(1),
            nonce_retry_attempts: 3,
            nonce_retry_delay_ms: 300,
            serialize_sends: true,
        }
    }
}

impl TransactionConfig {
    /// True when the gas limit differs from the default, which weakens the
    /// gas-based status heuristic used for receipts without a status field
    pub fn gas_limit_overridden(&self) -> bool {
        self.gas_limit != DEFAULT_GAS_LIMIT
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            channel_capacity: 1024,
            verify_native_receipts: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

impl SdkConfig {
    /// Load configuration from file and environment variables.
    /// Environment variables take precedence over file values.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the TOML file named by `CONFIG_FILE`
    pub fn load_from_file() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "token-sdk.toml".to_string());

        if !Path::new(&config_path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ConfigError::FileNotFound(config_path.clone()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parsing(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(endpoint) = env::var("TOKEN_SDK_RPC_URL") {
            self.rpc.endpoint = endpoint;
        }
        if let Ok(key) = env::var("TOKEN_SDK_PRIVATE_KEY") {
            self.wallet.private_key = Some(key);
        }

        if let Ok(address) = env::var("TOKEN_CONTRACT_ADDRESS") {
            self.contract.address = address;
        }
        if let Ok(decimals) = env::var("TOKEN_DECIMALS") {
            self.contract.decimals = parse_env("TOKEN_DECIMALS", decimals)?;
        }

        if let Ok(gas_limit) = env::var("GAS_LIMIT") {
            self.transaction.gas_limit = parse_env("GAS_LIMIT", gas_limit)?;
        }
        if let Ok(gas_price) = env::var("GAS_PRICE_WEI") {
            self.transaction.gas_price_wei = parse_env("GAS_PRICE_WEI", gas_price)?;
        }
        if let Ok(chain_id) = env::var("CHAIN_ID") {
            self.transaction.chain_id = Some(parse_env("CHAIN_ID", chain_id)?);
        }

        if let Ok(interval) = env::var("MONITOR_POLL_INTERVAL_MS") {
            self.monitor.poll_interval_ms = parse_env("MONITOR_POLL_INTERVAL_MS", interval)?;
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values.
    ///
    /// Contract address, ABI and private key are checked when the SDK is constructed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc.endpoint.trim().is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        if !self.rpc.endpoint.starts_with("http://") && !self.rpc.endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidUrl(self.rpc.endpoint.clone()));
        }

        if self.rpc.timeout_seconds == 0 || self.rpc.timeout_seconds > 300 {
            return Err(ConfigError::InvalidValue {
                key: "rpc.timeout_seconds".to_string(),
                value: self.rpc.timeout_seconds.to_string(),
            });
        }

        self.validate_settings()
    }

    /// Validate everything except the endpoint, for SDKs built on an injected transport
    pub fn validate_settings(&self) -> Result<(), ConfigError> {
        // 10^78 no longer fits in 256 bits
        if self.contract.decimals > 77 {
            return Err(ConfigError::InvalidValue {
                key: "contract.decimals".to_string(),
                value: self.contract.decimals.to_string(),
            });
        }

        if self.transaction.gas_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "transaction.gas_limit".to_string(),
                value: self.transaction.gas_limit.to_string(),
            });
        }
        if self.transaction.gas_price_wei == 0 {
            return Err(ConfigError::InvalidValue {
                key: "transaction.gas_price_wei".to_string(),
                value: self.transaction.gas_price_wei.to_string(),
            });
        }
        if self.transaction.nonce_retry_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "transaction.nonce_retry_attempts".to_string(),
                value: self.transaction.nonce_retry_attempts.to_string(),
            });
        }

        if self.monitor.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "monitor.poll_interval_ms".to_string(),
                value: self.monitor.poll_interval_ms.to_string(),
            });
        }
        if self.monitor.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "monitor.channel_capacity".to_string(),
                value: self.monitor.channel_capacity.to_string(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                value: self.logging.format.clone(),
            });
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        toml::to_string_pretty(&Self::default())
            .map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = SdkConfig::default();
        assert_eq!(config.rpc.endpoint, DEFAULT_RPC_ENDPOINT);
        assert_eq!(config.rpc.timeout_seconds, 30);
        assert_eq!(config.contract.address, DEFAULT_CONTRACT_ADDRESS);
        assert_eq!(config.contract.decimals, 18);
        assert_eq!(config.transaction.gas_limit, 90_000);
        assert_eq!(config.transaction.gas_price_wei, 50_000_000_000);
        assert_eq!(config.transaction.nonce_retry_attempts, 3);
        assert_eq!(config.transaction.nonce_retry_delay_ms, 300);
        assert!(config.wallet.private_key.is_none());
        assert!(!config.transaction.gas_limit_overridden());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SdkConfig::default();
        assert!(config.validate().is_ok());

        config.rpc.endpoint = "".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::MissingEndpoint)));

        config = SdkConfig::default();
        config.rpc.endpoint = "invalid-url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        config = SdkConfig::default();
        config.transaction.gas_limit = 0;
        assert!(config.validate().is_err());

        config = SdkConfig::default();
        config.transaction.nonce_retry_attempts = 0;
        assert!(config.validate().is_err());

        config = SdkConfig::default();
        config.monitor.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        config = SdkConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());

        config = SdkConfig::default();
        config.contract.decimals = 78;
        assert!(config.validate_settings().is_err());

        // settings validation ignores the endpoint
        config = SdkConfig::default();
        config.rpc.endpoint = "".to_string();
        assert!(config.validate_settings().is_ok());
    }

    #[test]
    fn test_gas_limit_override_flag() {
        let mut config = TransactionConfig::default();
        config.gas_limit = 21_000;
        assert!(config.gas_limit_overridden());
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        env::set_var("TOKEN_SDK_RPC_URL", "https://test-rpc.example/");
        env::set_var("TOKEN_CONTRACT_ADDRESS", "0x1234567890123456789012345678901234567890");
        env::set_var("GAS_LIMIT", "120000");
        env::set_var("CHAIN_ID", "3");
        env::set_var("LOG_LEVEL", "debug");

        let mut config = SdkConfig::default();
        config.apply_env_overrides().unwrap();

        assert_eq!(config.rpc.endpoint, "https://test-rpc.example/");
        assert_eq!(config.contract.address, "0x1234567890123456789012345678901234567890");
        assert_eq!(config.transaction.gas_limit, 120_000);
        assert_eq!(config.transaction.chain_id, Some(3));
        assert_eq!(config.logging.level, "debug");

        env::remove_var("TOKEN_SDK_RPC_URL");
        env::remove_var("TOKEN_CONTRACT_ADDRESS");
        env::remove_var("GAS_LIMIT");
        env::remove_var("CHAIN_ID");
        env::remove_var("LOG_LEVEL");
    }

    #[test]
    #[serial]
    fn test_invalid_env_values() {
        env::set_var("GAS_PRICE_WEI", "fifty gwei");

        let mut config = SdkConfig::default();
        let result = config.apply_env_overrides();

        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));

        env::remove_var("GAS_PRICE_WEI");
    }

    #[test]
    #[serial]
    fn test_config_file_loading() {
        let config_content = r#"
[rpc]
endpoint = "https://ropsten.example/"
timeout_seconds = 45

[contract]
address = "0x1234567890123456789012345678901234567890"
decimals = 6

[transaction]
gas_limit = 100000
gas_price_wei = 20000000000
nonce_retry_attempts = 5

[monitor]
poll_interval_ms = 250
verify_native_receipts = false

[logging]
level = "warn"
format = "json"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut temp_file, config_content.as_bytes()).unwrap();

        env::set_var("CONFIG_FILE", temp_file.path().to_str().unwrap());

        let config = SdkConfig::load_from_file().unwrap();

        assert_eq!(config.rpc.endpoint, "https://ropsten.example/");
        assert_eq!(config.rpc.timeout_seconds, 45);
        assert_eq!(config.contract.address, "0x1234567890123456789012345678901234567890");
        assert_eq!(config.contract.decimals, 6);
        assert!(config.contract.abi.is_none());
        assert_eq!(config.transaction.gas_limit, 100_000);
        assert_eq!(config.transaction.gas_price_wei, 20_000_000_000);
        assert_eq!(config.transaction.nonce_retry_attempts, 5);
        // unspecified fields keep their defaults
        assert_eq!(config.transaction.nonce_retry_delay_ms, 300);
        assert_eq!(config.monitor.poll_interval_ms, 250);
        assert!(!config.monitor.verify_native_receipts);
        assert_eq!(config.logging.format, "json");

        env::remove_var("CONFIG_FILE");
    }

    #[test]
    fn test_private_key_never_serialized() {
        let mut config = SdkConfig::default();
        config.wallet.private_key = Some("0x4c0883a69102937d6231471b5dbb6204fe512961708279f2e3e8a5d4b8e3e3e3".to_string());

        let toml_string = toml::to_string_pretty(&config).unwrap();
        assert!(!toml_string.contains("4c0883a6"));
        assert!(!format!("{:?}", config).contains("4c0883a6"));
    }

    #[test]
    fn test_generate_sample_config() {
        let sample = SdkConfig::generate_sample_config().unwrap();
        assert!(sample.contains("[rpc]"));
        assert!(sample.contains("[contract]"));
        assert!(sample.contains("[transaction]"));
        assert!(sample.contains("[monitor]"));
        assert!(sample.contains("[logging]"));
    }
}
