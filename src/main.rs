mod cli;
mod commands;
mod error;
mod generator;
mod index;
mod logging;
mod report;

use crate::cli::Cli;
use clap::Parser;
use mipmap_config::Config;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init("info", cli.verbose);
            tracing::error!(error = ?e, "Could not load configuration");
            return ExitCode::FAILURE;
        },
    };
    logging::init(&config.log_level, cli.verbose);

    match commands::run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "{e}");
            ExitCode::FAILURE
        },
    }
}
