pub mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use fairquote_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing::Level;

use crate::commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "fairquote",
    about = "Historical labor-hour quote estimator",
    long_about = "Match a discrepancy and corrective action against historical work orders and derive a fair labor-hour quote.",
    after_help = concat!(
        "Examples:\n",
        "  fairquote search --data history.xlsx --discrepancy \"Leak at L/H MLG\" --corrective \"Replaced seal\"\n",
        "  fairquote inspect --data history.xlsx --json\n",
        "  fairquote config"
    )
)]
pub struct Cli {
    #[arg(long = "config-file", global = true, help = "Path to a fairquote.toml config file")]
    config_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Find exact and approximate historical matches and the fair quote")]
    Search {
        #[arg(long, help = "Historical work-order workbook (.xlsx)")]
        data: PathBuf,
        #[arg(long, help = "Discrepancy text to look up")]
        discrepancy: String,
        #[arg(long, help = "Corrective action text to look up")]
        corrective: String,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Report loaded and dropped rows, resolved columns and the content hash")]
    Inspect {
        #[arg(long, help = "Historical work-order workbook (.xlsx)")]
        data: PathBuf,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = execute(cli);
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

pub fn execute(cli: Cli) -> CommandResult {
    let config_path = cli.config_file.as_deref();
    if let Command::Config = cli.command {
        return commands::config::run(config_path);
    }

    let config = match AppConfig::load(LoadOptions {
        config_path: config_path.map(PathBuf::from),
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => return CommandResult::from_config_error(command_name(&cli.command), &error),
    };
    init_logging(&config);

    match cli.command {
        Command::Search { data, discrepancy, corrective, json } => {
            commands::search::run(&config, &data, &discrepancy, &corrective, json)
        }
        Command::Inspect { data, json } => commands::inspect::run(&data, json),
        Command::Config => commands::config::run(config_path),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Search { .. } => "search",
        Command::Inspect { .. } => "inspect",
        Command::Config => "config",
    }
}

/// Logs go to stderr so stdout stays parseable. A second call is a no-op.
fn init_logging(config: &AppConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
