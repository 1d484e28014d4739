//! sql-console - run ad-hoc SQL against PostgreSQL.

mod cli;

use cli::{Cli, Command, ExecArgs, ServeArgs};
use sql_console::api::start_server;
use sql_console::config::Config;
use sql_console::error::{ConsoleError, Result};
use sql_console::logging;
use sql_console::query::StatementExecutor;
use std::process::ExitCode;
use tracing::{error, info};

/// Exit code when the database rejected the statement.
const EXIT_CLIENT_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    logging::init_stderr_logging();

    let cli = Cli::parse_args();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}: {}", e.category(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config_path();

    match cli.command {
        Command::Serve(args) => serve(&config_path, args).await,
        Command::Exec(args) => exec(args).await,
    }
}

async fn serve(config_path: &std::path::Path, args: ServeArgs) -> Result<ExitCode> {
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(config_path)?;

    // Precedence: CLI flags > environment > config file > defaults
    let mut server = config.server;
    server.apply_env_overrides()?;
    if let Some(host) = args.host {
        server.host = host;
    }
    if let Some(port) = args.port {
        server.port = port;
    }

    start_server(&server, StatementExecutor::postgres()).await?;
    Ok(ExitCode::SUCCESS)
}

async fn exec(args: ExecArgs) -> Result<ExitCode> {
    let params = args.to_connection_parameters()?;
    info!("Connection: {}", params.display_string());

    match StatementExecutor::postgres()
        .execute(Some(&params), &args.statement)
        .await
    {
        Ok(result) => {
            let json = serde_json::to_string_pretty(&result)
                .map_err(|e| ConsoleError::internal(format!("Failed to encode result: {e}")))?;
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        Err(classified) => {
            eprintln!("{classified}");
            if classified.is_client_error() {
                Ok(ExitCode::from(EXIT_CLIENT_ERROR))
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
