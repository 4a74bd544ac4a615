use clap::{Parser, Subcommand};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;

use crate::config::SdkConfig;
use crate::error::SdkError;
use crate::models::TransferEvent;
use crate::sdk::TokenSdk;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Sdk(#[from] SdkError),

    #[error("Cannot read ABI file {path}: {reason}")]
    AbiFile { path: String, reason: String },

    #[error("CLI operation failed: {0}")]
    Operation(String),
}

#[derive(Parser, Debug)]
#[command(name = "token-cli")]
#[command(about = "Wallet and token operations against an Ethereum JSON-RPC node")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// JSON-RPC endpoint, overrides configuration
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// File holding the token contract ABI as JSON
    #[arg(long, global = true)]
    pub abi_file: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Print the address of the configured key
    Address,
    /// Ether balance of an address, or of the configured key
    Balance {
        #[arg(long)]
        address: Option<String>,
    },
    /// Token balance of an address, or of the configured key
    TokenBalance {
        #[arg(long)]
        address: Option<String>,
    },
    /// Send ether (whole units)
    SendEther { to: String, amount: String },
    /// Send tokens (whole units)
    SendTokens { to: String, amount: String },
    /// Lifecycle status of a transaction
    Status { tx_id: String },
    /// Print ether transfers matching the filter until interrupted
    MonitorEther {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Print token transfers matching the filter until interrupted
    MonitorTokens {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Print a sample configuration file
    SampleConfig,
}

impl Commands {
    /// Commands that work without a node connection
    pub fn is_offline(&self) -> bool {
        matches!(self, Commands::SampleConfig)
    }
}

impl Cli {
    /// Apply command-line overrides on top of loaded configuration
    pub fn apply_overrides(&self, config: &mut SdkConfig) -> Result<(), CliError> {
        if let Some(rpc_url) = &self.rpc_url {
            config.rpc.endpoint = rpc_url.clone();
        }
        if let Some(path) = &self.abi_file {
            let abi = std::fs::read_to_string(path).map_err(|e| CliError::AbiFile {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            config.contract.abi = Some(abi);
        }
        Ok(())
    }
}

pub fn format_event(event: &TransferEvent) -> String {
    format!(
        "{} {} {} -> {} {} {}",
        event.transaction_id,
        event.status,
        event.from_address,
        event.to_address,
        event.amount,
        if event.is_token { "tokens" } else { "ether" }
    )
}

pub struct CliHandler {
    sdk: TokenSdk,
}

impl CliHandler {
    pub fn new(sdk: TokenSdk) -> Self {
        Self { sdk }
    }

    pub async fn execute_command(&self, command: &Commands) -> Result<(), CliError> {
        match command {
            Commands::Address => {
                println!("{}", self.sdk.get_address()?);
            }
            Commands::Balance { address } => {
                let balance = match address {
                    Some(address) => self.sdk.get_address_ether_balance(address).await?,
                    None => self.sdk.get_ether_balance().await?,
                };
                println!("{} ETH", balance);
            }
            Commands::TokenBalance { address } => {
                let balance = match address {
                    Some(address) => self.sdk.get_address_token_balance(address).await?,
                    None => self.sdk.get_token_balance().await?,
                };
                println!("{} tokens", balance);
            }
            Commands::SendEther { to, amount } => {
                println!("{}", self.sdk.send_ether(to, amount).await?);
            }
            Commands::SendTokens { to, amount } => {
                println!("{}", self.sdk.send_tokens(to, amount).await?);
            }
            Commands::Status { tx_id } => {
                println!("{}", self.sdk.get_transaction_status(tx_id).await?);
            }
            Commands::MonitorEther { from, to } => {
                let seen = Arc::new(AtomicU64::new(0));
                let counter = Arc::clone(&seen);
                self.sdk
                    .monitor_ether_transactions(
                        move |event| {
                            counter.fetch_add(1, Ordering::Relaxed);
                            println!("{}", format_event(&event));
                        },
                        from.as_deref(),
                        to.as_deref(),
                    )
                    .await?;
                self.wait_for_interrupt(&seen).await?;
            }
            Commands::MonitorTokens { from, to } => {
                let seen = Arc::new(AtomicU64::new(0));
                let counter = Arc::clone(&seen);
                self.sdk
                    .monitor_token_transactions(
                        move |event| {
                            counter.fetch_add(1, Ordering::Relaxed);
                            println!("{}", format_event(&event));
                        },
                        from.as_deref(),
                        to.as_deref(),
                    )
                    .await?;
                self.wait_for_interrupt(&seen).await?;
            }
            Commands::SampleConfig => {
                let sample = SdkConfig::generate_sample_config().map_err(SdkError::from)?;
                println!("{}", sample);
            }
        }

        Ok(())
    }

    async fn wait_for_interrupt(&self, seen: &AtomicU64) -> Result<(), CliError> {
        eprintln!("Monitoring, press Ctrl-C to stop");
        signal::ctrl_c()
            .await
            .map_err(|e| CliError::Operation(format!("Unable to listen for shutdown signal: {}", e)))?;

        self.sdk.stop_monitoring().await;
        eprintln!("Stopped after {} observations", seen.load(Ordering::Relaxed));
        Ok(())
    }
}
