use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod check_cmd;
mod cli;
mod compile_cmd;
mod inspect_cmd;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Compile(args) => compile_cmd::run_compile(args),
        Command::Check(args) => check_cmd::run_check(args),
        Command::Inspect(args) => inspect_cmd::run_inspect(args),
    }
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
