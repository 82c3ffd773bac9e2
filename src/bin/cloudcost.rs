//! cloudcost CLI
//!
//! Stateless entry point: resolve environment settings, initialize
//! tracing, dispatch the command, and map library errors onto the exit
//! code contract.

use clap::Parser;
use cloudcost::cli::Cli;
use cloudcost::config::{self, Settings};
use cloudcost::error::CostError;
use colored::Colorize;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{} {err}", "error:".red().bold());
            std::process::exit(3);
        }
    };

    if let Err(err) = config::init_tracing(&settings, cli.debug) {
        eprintln!("{} {err}", "error:".red().bold());
        std::process::exit(3);
    }

    if let Err(err) = cli.run(&settings).await {
        let code = err
            .downcast_ref::<CostError>()
            .map(CostError::exit_code)
            .unwrap_or(2);
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(code);
    }
}
