use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "junos-convert")]
#[command(about = "Compile Junos filters, zone policies and NAT into packet models")]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Compile one or more configurations and write <hostname>.json for each.
    Compile(CompileArgs),
    /// Compile one configuration and report diagnostics without writing output.
    Check(CheckArgs),
    /// Show a compiled model.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Vendor configuration documents (.json or .toml).
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Directory receiving <hostname>.json files.
    #[arg(long)]
    pub output_dir: PathBuf,
    /// Optional settings TOML overriding the embedded profile.
    #[arg(long)]
    pub settings: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Treat warnings as failures.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Vendor configuration document to check.
    pub input: PathBuf,
    #[arg(long)]
    pub settings: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Treat warnings as failures.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Compiled model written by `compile`.
    pub file: PathBuf,
    /// Only show this interface.
    #[arg(long)]
    pub interface: Option<String>,
    /// Show the lines of this ACL instead of interfaces.
    #[arg(long)]
    pub acl: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
