//! Vardr - container startup supervisor.
//!
//! Imports custom CA certificates into a trust bundle, then runs the FastAPI
//! application with that bundle and exits with the application's status.

mod config;
mod orchestrator;

use clap::Parser;
use config::{Cli, Config};
use orchestrator::{Orchestrator, FATAL_EXIT};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vardr_common::Logger;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not failures.
            std::process::exit(if e.use_stderr() { FATAL_EXIT } else { 0 });
        }
    };

    init_tracing(cli.verbose, cli.json_logs);

    let config = Config::from(cli);
    tracing::debug!(?config, "Configuration resolved");

    let log = Logger::stdout(config.json_logs);
    let code = Orchestrator::new(config, log).run().await;
    std::process::exit(code);
}

/// Diagnostics go to stderr so stdout stays a clean operator log.
fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("VARDR_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
