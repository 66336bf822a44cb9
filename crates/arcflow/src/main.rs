//! `arcflow` command line: archive a directory or a file list, extract an
//! archive, list supported formats.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

mod cli;

use cli::{Cli, Commands};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);
    tracing::debug!(?cli, "parsed arguments");

    let result = match cli.command {
        Commands::Archive(args) => cli::handle_archive(args),
        Commands::Pack(args) => cli::handle_pack(args),
        Commands::Extract(args) => cli::handle_extract(args),
        Commands::Formats => cli::handle_formats(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("command failed: {e:?}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise `warn`, or `debug` with `--debug`.
fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
