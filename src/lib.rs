pub mod blockchain;
pub mod models;
pub mod api;
pub mod error;
pub mod logging;
pub mod retry;
pub mod config;
pub mod sdk;

pub use blockchain::{EthTransport, MonitorHandle, RpcClient};
pub use error::{ConfigError, Result, SdkError, TransportError, ValidationError};
pub use logging::{LogContext, PerformanceMonitor, ErrorLogger, MetricsLogger};
pub use retry::{RetryManager, RetryConfig};
pub use config::{SdkConfig, RpcConfig, WalletConfig, ContractConfig, TransactionConfig, MonitorConfig, LoggingConfig};
pub use models::{TransactionStatus, TransferEvent};
pub use sdk::TokenSdk;
