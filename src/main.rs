//! JourneyVault - bounded, deduplicated history of test-journey executions

use clap::Parser;

mod cache;
mod cli;
mod client;
mod clock;
mod config;
mod error;
mod models;
mod output;
mod retention;
mod storage;

use cli::args::GlobalOptions;
use cli::{Cli, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// `warn` by default, `debug` with --debug; RUST_LOG always wins
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Init { force } => cli::init::run(&opts, force),
        Commands::Status => cli::status::run(&opts),
        Commands::Version => {
            println!("journeyvault version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Retain(args) => cli::retain::run(&opts, &args).await,
        Commands::Rebuild(args) => cli::rebuild::run(&opts, &args),
        Commands::Fetch(args) => cli::fetch::run(&opts, &args).await,
    }
}
