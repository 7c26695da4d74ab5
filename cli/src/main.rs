mod cli;
mod commands;
mod logging;
mod prompt;

use std::process::ExitCode;

use api::{config::AppConfig, globals};
use clap::Parser;
use cli::{Cli, Commands};
use commands::Output;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

/// Run one command. `Ok(false)` means it ran but reported a problem.
async fn run(args: Cli) -> commands::Result<bool> {
    let config = AppConfig::from_env().map_err(api::ApiError::from)?;
    let engine = globals::init(&config).await?;
    let out = Output { json: args.json };

    match args.command {
        Commands::Analyze => commands::analyze(engine, out).await?,
        Commands::Show => commands::show(engine, out).await?,
        Commands::Execute { ids, yes } => commands::execute(engine, ids, yes, out).await?,
        Commands::Stats => commands::stats(engine, out).await?,
        Commands::Health => return commands::health(engine, out).await,
        Commands::Cleanup { keep } => commands::cleanup(engine, keep, out).await?,
    }
    Ok(true)
}
