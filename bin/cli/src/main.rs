mod cli;
mod commands;
mod error;

use clap::Parser;
use clinic_portal_platform_access::{
    ApiClient, ClientConfig, FileCredentialStore, ReqwestTransport, SessionController,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::commands::TerminalNavigator;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(report) => {
            eprintln!("error: {report}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> clinic_portal_core::Result<(), CliError> {
    let mut config = ClientConfig::from_env().map_err(|e| CliError::Setup {
        details: format!("invalid configuration: {e}"),
    })?;
    cli.apply(&mut config);

    let store = FileCredentialStore::open(config.credential_file.clone()).map_err(|report| {
        CliError::Setup {
            details: report.to_string(),
        }
    })?;
    let transport = ReqwestTransport::new(&config.api_base_url, config.request_timeout())
        .map_err(|report| CliError::Setup {
            details: report.to_string(),
        })?;

    let client = ApiClient::new(Arc::new(transport), Arc::new(store));
    let session = SessionController::new(
        client,
        Arc::new(TerminalNavigator),
        config.session_routes(),
    );

    commands::run(cli.command, &session).await
}
