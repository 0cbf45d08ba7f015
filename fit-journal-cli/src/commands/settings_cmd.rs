use clap::{Args, Subcommand};
use fit_journal_core::{SettingKey, SettingValue};

use super::open_store;
use crate::config::Config;

/// View or change journal settings
#[derive(Args)]
pub struct SettingsCommand {
    #[command(subcommand)]
    command: SettingsSubcommand,
}

#[derive(Subcommand)]
enum SettingsSubcommand {
    /// Show all settings
    Show,

    /// Show one setting
    Get {
        /// Setting name (theme, autoSync, googleSheetsConnected, sheetUrl, spreadsheetId, lastSync)
        key: String,
    },

    /// Change a setting
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
    },
}

impl SettingsCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let mut store = open_store(config);

        match &self.command {
            SettingsSubcommand::Show => {
                for key in SettingKey::ALL {
                    println!("{:<22} {}", key, display(store.settings().get(key)));
                }
            }
            SettingsSubcommand::Get { key } => {
                let key: SettingKey = key.parse()?;
                println!("{}", display(store.settings().get(key)));
            }
            SettingsSubcommand::Set { key, value } => {
                let key: SettingKey = key.parse()?;
                let value = SettingValue::parse_for(key, value)?;
                store.set_setting(key, value.clone())?;
                println!("{} = {}", key, value);
            }
        }
        Ok(())
    }
}

fn display(value: Option<SettingValue>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}
