use clap::Parser;
use lookup_protocol::config::Settings;
use lookup_protocol::service::{LookupClient, LookupOutcome};
use lookup_protocol::utils::logging::init_logging;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Greet the server, run the configured lookups, and say goodbye
#[derive(Parser, Debug)]
#[command(name = "lookup-client", version, about)]
struct Args {
    /// Settings file (.json or .toml)
    #[arg(short, long, default_value = "Setting.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match Settings::load(&args.config) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = init_logging(&settings.logging) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let client = match LookupClient::bind(&settings).await {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "Client failed to start");
            return ExitCode::FAILURE;
        }
    };

    let report = match client.run().await {
        Ok(report) => report,
        Err(err) => {
            error!(error = %err, "Exchange failed");
            return ExitCode::FAILURE;
        }
    };

    info!(banner = %report.banner, "Server greeted us");
    for outcome in &report.outcomes {
        match outcome {
            LookupOutcome::Found(record) => info!(
                record_type = %record.record_type,
                name = %record.name,
                value = %record.value,
                "Resolved"
            ),
            LookupOutcome::NotFound { query, reason } => {
                info!(%query, %reason, "Not resolved")
            }
        }
    }
    if report.ended_by_server {
        info!("Server ended the session early");
    }

    ExitCode::SUCCESS
}
