use std::process::ExitCode;

use clap::Parser;

use graphpost::cli::{self, Cli, Command, ConfigCommand, CredentialsCommand};
use graphpost::config;
use graphpost::logging::{init_logging, LoggingConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // `config path` and `version` must work even with a broken config file.
    match cli.command {
        Command::Version => {
            cli::handle_version();
            return ExitCode::SUCCESS;
        }
        Command::Config(ConfigCommand::Path) => {
            cli::handle_config_path();
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    let cfg = match config::load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            let _ = init_logging(&LoggingConfig::default());
            tracing::error!(error = %e, "failed to load configuration");
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&cfg.logging) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let result = match cli.command {
        Command::Publish {
            items,
            continue_on_fail,
            api_version,
        } => cli::handle_publish(&cfg, &items, continue_on_fail, api_version).await,
        Command::Resources => cli::handle_resources(&cfg).map(|_| true),
        Command::Config(ConfigCommand::Show) => cli::handle_config_show(&cfg).map(|_| true),
        Command::Config(ConfigCommand::Get { key }) => cli::handle_config_get(&cfg, &key),
        Command::Credentials(CredentialsCommand::Store { token }) => {
            cli::handle_credentials_store(&cfg, &token).map(|_| true)
        }
        Command::Credentials(CredentialsCommand::Clear) => {
            cli::handle_credentials_clear(&cfg).map(|_| true)
        }
        Command::Version | Command::Config(ConfigCommand::Path) => Ok(true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
