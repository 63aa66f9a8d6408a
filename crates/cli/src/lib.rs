pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use shelfsense_core::config::{ConfigOverrides, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "shelfsense",
    about = "Guarded inventory analytics assistant",
    long_about = "Ask questions about the retail inventory database, inspect sales figures and forecasts, and check runtime readiness.",
    after_help = "Examples:\n  shelfsense seed\n  shelfsense ask \"What is the total revenue?\"\n  shelfsense chat\n  shelfsense doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a shelfsense.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override database.url")]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Answer one question about the inventory data")]
    Ask {
        #[arg(required = true, num_args = 1.., help = "The question, in plain language")]
        question: Vec<String>,
    },
    #[command(about = "Start an interactive chat session on stdin/stdout")]
    Chat,
    #[command(about = "Report revenue, orders, items sold and the top products")]
    Kpis,
    #[command(about = "Predict next month's sales from the monthly history")]
    Forecast,
    #[command(about = "Load the deterministic demo dataset into the configured database")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, model credentials, read-only database access and the forecast model")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                database_url: self.database_url.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();
    logging::init_from_options(&options);

    let result = match cli.command {
        Command::Ask { question } => commands::ask::run(options, &question.join(" ")),
        Command::Chat => commands::chat::run(options),
        Command::Kpis => commands::kpis::run(options),
        Command::Forecast => commands::forecast::run(options),
        Command::Seed => commands::seed::run(options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(options, json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
