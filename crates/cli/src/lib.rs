pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "carmarket",
    about = "Carmarket operator CLI",
    long_about = "Apply migrations, load demo listings, inspect configuration, and run lifecycle sweeps on demand.",
    after_help = "Examples:\n  carmarket migrate\n  carmarket config\n  carmarket sweep expire\n  carmarket sweep all"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo owners and listings, then verify they are present")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Run a lifecycle sweep once (expire, purge, finalize, hot-deal-expiry, pre-expiry-warning, pre-deletion-warning, or all)")]
    Sweep {
        #[arg(value_name = "KIND", default_value = "all")]
        kind: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Sweep { kind } => commands::sweep::run(&kind),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
