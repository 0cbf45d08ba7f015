use clap::Args;
use std::io::{self, Write};
use std::path::PathBuf;

use super::open_store;
use crate::config::Config;

/// Write the whole journal as JSON
#[derive(Args)]
pub struct ExportCommand {
    /// Output file (default: stdout)
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl ExportCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let store = open_store(config);
        let snapshot = store.export_snapshot()?;

        match &self.output {
            Some(path) => {
                std::fs::write(path, snapshot)?;
                println!(
                    "Exported {} entries to {}",
                    store.list_entries().len(),
                    path.display()
                );
            }
            None => println!("{}", snapshot),
        }
        Ok(())
    }
}

/// Delete every entry (settings are kept)
#[derive(Args)]
pub struct ClearCommand {
    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,
}

impl ClearCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let mut store = open_store(config);
        let count = store.list_entries().len();
        if count == 0 {
            println!("Journal is already empty.");
            return Ok(());
        }

        if !self.yes && !confirm(&format!("Delete all {} entries? This cannot be undone.", count))? {
            println!("Cancelled.");
            return Ok(());
        }

        let removed = store.clear_all()?;
        println!("Deleted {} entries.", removed);
        Ok(())
    }
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
