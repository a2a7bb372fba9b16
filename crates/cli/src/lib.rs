pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::commands::quote::QuoteArgs;

#[derive(Debug, Parser)]
#[command(
    name = "quoteline",
    about = "Quoteline operator CLI",
    long_about = "Inspect configuration, check readiness, and run the quote engine in-process.",
    after_help = "Examples:\n  quoteline doctor --json\n  quoteline config\n  quoteline quote --item CARDS_4_4_500=500 --item FLYER_A5=100 --price FLYER_A5=12.50"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config and report assistant and reply-channel readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Submit an inquiry, apply price replies in order, and print every notice")]
    Quote {
        #[arg(long = "item", value_name = "CODE=QTY", help = "Requested line item (repeatable)")]
        items: Vec<String>,
        #[arg(
            long = "price",
            value_name = "CODE=PRICE",
            help = "Price reply applied after the inquiry (repeatable)"
        )]
        prices: Vec<String>,
        #[arg(
            long,
            conflicts_with = "items",
            help = "Free-text inquiry priced by the assistant's product and area choice"
        )]
        text: Option<String>,
        #[arg(long, help = "Inquiry subject passed to the quote composer")]
        subject: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Quote { items, prices, text, subject } => {
            commands::quote::run(QuoteArgs { items, prices, text, subject })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
