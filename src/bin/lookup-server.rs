use clap::Parser;
use lookup_protocol::config::Settings;
use lookup_protocol::service::LookupServer;
use lookup_protocol::utils::logging::init_logging;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

/// Answer lookup requests from the configured record table
#[derive(Parser, Debug)]
#[command(name = "lookup-server", version, about)]
struct Args {
    /// Settings file (.json or .toml)
    #[arg(short, long, default_value = "Setting.json")]
    config: PathBuf,

    /// Record table, overriding `server.records_path`
    #[arg(short, long)]
    records: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut settings = match Settings::from_file(&args.config) {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    settings.apply_env();
    if let Some(records) = args.records {
        settings.server.records_path = Some(records);
    }
    if let Err(err) = settings.validate_strict() {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    if let Err(err) = init_logging(&settings.logging) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let mut server = match LookupServer::bind(&settings).await {
        Ok(server) => server,
        Err(err) => {
            error!(error = %err, "Server failed to start");
            return ExitCode::FAILURE;
        }
    };

    match server.run_until_ctrl_c().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Server stopped");
            ExitCode::FAILURE
        }
    }
}
