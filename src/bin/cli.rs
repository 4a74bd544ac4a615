use clap::Parser;
use token_wallet_sdk::api::{Cli, CliHandler};
use token_wallet_sdk::config::SdkConfig;
use token_wallet_sdk::logging::{init_logging, ErrorLogger, LogContext};
use token_wallet_sdk::TokenSdk;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.command.is_offline() {
        println!("{}", SdkConfig::generate_sample_config()?);
        return Ok(());
    }

    // validated by TokenSdk::new once command-line overrides are applied
    let mut config = match SdkConfig::load_from_file().and_then(|mut config| {
        config.apply_env_overrides()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config.logging)?;

    if let Err(e) = cli.apply_overrides(&mut config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let sdk = match TokenSdk::new(config).await {
        Ok(sdk) => sdk,
        Err(e) => {
            ErrorLogger::log_error(&e, Some(LogContext::new("cli", "initialization")));
            eprintln!("Failed to initialize SDK: {}", e);
            std::process::exit(1);
        }
    };

    let cli_handler = CliHandler::new(sdk);

    if let Err(e) = cli_handler.execute_command(&cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
