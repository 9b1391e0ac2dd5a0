pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "compass",
    about = "Compass operator CLI",
    long_about = "Inspect Compass configuration, check CRM connectivity, and run one-off \
                  aggregation or sync passes without starting the HTTP server.",
    after_help = "Examples:\n  compass doctor --json\n  compass config\n  compass dashboard"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Validate config, CRM credentials, and platform connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Aggregate every connected platform and print the dashboard summary")]
    Dashboard,
    #[command(about = "Run a full sync against every connected platform")]
    Sync,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Dashboard => commands::dashboard::run(),
        Command::Sync => commands::sync::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
