pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "quotecraft",
    about = "Quotecraft operator CLI",
    long_about = "Generate quotes from the terminal, inspect effective configuration, and check provider readiness.",
    after_help = "Examples:\n  quotecraft generate stoicism courage\n  quotecraft generate --json rain\n  quotecraft doctor --json\n  quotecraft config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Generate quotes for the given keywords using the configured provider")]
    Generate {
        #[arg(help = "Keywords to inspire the quotes; joined with spaces")]
        keywords: Vec<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and quote provider readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
        #[arg(long, help = "Send one real generation request to the provider")]
        probe: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Generate { keywords, json } => commands::generate::run(&keywords.join(" "), json),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json, probe } => commands::doctor::run(json, probe),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
