use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

use validate_openapi::{
    ARGUMENT_ERROR_EXIT, BatchValidator, Cli, ConfigManager, HttpClientConfig, ValidationClient,
    ValidationOptions, Verbosity,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(ARGUMENT_ERROR_EXIT),
            };
        }
    };

    init_tracing();

    let config = match ConfigManager::load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("validate-openapi: configuration error: {e}");
            return ExitCode::from(ARGUMENT_ERROR_EXIT);
        }
    };

    let options = ValidationOptions {
        url: config.url,
        headers: config.headers,
        verbosity: Verbosity(config.verbosity),
        ..Default::default()
    };

    match run(&cli, options).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("validate-openapi: {e:#}");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: &Cli, options: ValidationOptions) -> anyhow::Result<u8> {
    let client = ValidationClient::new(HttpClientConfig::default())
        .context("failed to create HTTP client")?;
    let batch = BatchValidator::new(client, options);
    let outcome = batch.run(&cli.targets()).await;
    Ok(outcome.exit_code())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
