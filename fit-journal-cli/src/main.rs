use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod sheets;

use commands::{
    ClearCommand, ConfigCommand, DashboardCommand, DeleteCommand, ExportCommand, HistoryCommand,
    LogCommand, SettingsCommand, SheetsCommand, TrendsCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "fitj")]
#[command(version)]
#[command(about = "A fitness journal with Google Sheets sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a day's measurements
    Log(LogCommand),

    /// Show logged days
    History(HistoryCommand),

    /// Delete a day's entry
    Delete(DeleteCommand),

    /// Show latest figures and changes
    Dashboard(DashboardCommand),

    /// Show weight, waist, nutrition and phase trends
    Trends(TrendsCommand),

    /// View or change journal settings
    Settings(SettingsCommand),

    /// Export the journal as JSON
    Export(ExportCommand),

    /// Delete all entries
    Clear(ClearCommand),

    /// Google Sheets sync
    Sheets(SheetsCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Save config path for init command
    let cli_config_path = cli.config.clone();

    let config = Config::load(cli.config)?;
    tracing::debug!("Using data directory {}", config.data_dir.value.display());

    execute_command(&cli.command, &config, cli_config_path)
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let default_filter = format!("fit_journal_core={0},fitj={0}", default_level);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn execute_command(
    command: &Option<Commands>,
    config: &Config,
    cli_config_path: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Some(Commands::Log(cmd)) => cmd.run(config)?,
        Some(Commands::History(cmd)) => cmd.run(config)?,
        Some(Commands::Delete(cmd)) => cmd.run(config)?,
        Some(Commands::Dashboard(cmd)) => cmd.run(config)?,
        Some(Commands::Trends(cmd)) => cmd.run(config)?,
        Some(Commands::Settings(cmd)) => cmd.run(config)?,
        Some(Commands::Export(cmd)) => cmd.run(config)?,
        Some(Commands::Clear(cmd)) => cmd.run(config)?,
        Some(Commands::Sheets(cmd)) => cmd.run(config)?,
        Some(Commands::Config(cmd)) => cmd.run(config, cli_config_path)?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
