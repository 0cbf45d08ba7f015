use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# fit-journal configuration

# Directory for journal.json and the cached Google token
# (default: ~/.local/share/fit-journal)
# data_dir: ~/.local/share/fit-journal

# Google Sheets sync. Create an OAuth client of type "Desktop app" and an
# API key in the Google Cloud console, then paste the values below.
sheets:
  api_key: YOUR_API_KEY
  client_id: YOUR_CLIENT_ID.apps.googleusercontent.com
  # client_secret: YOUR_CLIENT_SECRET
  spreadsheet_id: YOUR_SPREADSHEET_ID
  # range: Sheet1!A:H
"#;

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        cli_config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                let masked = masked(config);
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&masked)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("data_dir: {}", config.data_dir.value.display());
                        println!("  source: {}", config.data_dir.source);
                        println!();

                        let sheets = &masked.sheets;
                        println!("sheets:");
                        println!("  api_key: {}", show(&sheets.api_key));
                        println!("  client_id: {}", show(&sheets.client_id));
                        println!("  client_secret: {}", show(&sheets.client_secret));
                        println!("  spreadsheet_id: {}", show(&sheets.spreadsheet_id));
                        println!("  range: {}", sheets.range());
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = cli_config_path.unwrap_or_else(Config::default_config_path);

                // Check if config already exists
                if config_path.exists() {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'fitj config show' to view current configuration.");
                    return Ok(());
                }

                // Create parent directory
                if let Some(parent) = config_path.parent() {
                    fs::create_dir_all(parent)?;
                }

                let mut file = fs::File::create(&config_path)?;
                file.write_all(DEFAULT_CONFIG.as_bytes())?;

                println!("Created config file: {}", config_path.display());
                println!("\nEdit this file to add your Google Sheets credentials.");
                Ok(())
            }
        }
    }
}

/// Copy of `config` with secrets masked for display.
fn masked(config: &Config) -> Config {
    let mut masked = config.clone();
    masked.sheets.api_key = masked.sheets.api_key.as_deref().map(mask);
    masked.sheets.client_secret = masked.sheets.client_secret.as_deref().map(mask);
    masked
}

fn mask(secret: &str) -> String {
    if secret.len() > 8 && secret.is_ascii() {
        format!("{}...{}", &secret[..4], &secret[secret.len() - 4..])
    } else {
        "****".to_string()
    }
}

fn show(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(not set)")
}
