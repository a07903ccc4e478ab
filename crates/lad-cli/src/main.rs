//! `lad`: command-line interface for Local Agent Discovery.
//!
//! `serve` advertises one agent, `discover` finds agents on the current
//! network, `keygen` and `init` prepare signing keys and configuration.

mod cli;
mod cmd;
mod ui;

use crate::cli::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. `RUST_LOG` wins over the configured level.
pub(crate) fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run `f` with a temporary warn-level subscriber so problems found while
/// loading configuration are reported before the real subscriber exists.
pub(crate) fn with_bootstrap_logging<T>(f: impl FnOnce() -> T) -> T {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::with_default(subscriber, f)
}

fn main() {
    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Serve(args) => cmd::serve::cmd_serve(cli.config, args),
        Commands::Discover(args) => cmd::discover::cmd_discover(cli.config, args),
        Commands::Keygen { dir } => cmd::keys::cmd_keygen(&dir),
        Commands::Init { path, force } => cmd::init::cmd_init(path, force),
    };
    std::process::exit(code);
}
