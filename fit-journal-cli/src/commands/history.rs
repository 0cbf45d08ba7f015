use clap::Args;
use fit_journal_core::{Entry, HistoryFilter};

use super::{open_store, OutputFormat};
use crate::config::Config;

/// List logged days, most recent first
#[derive(Args)]
pub struct HistoryCommand {
    /// Only show entries with this phase
    #[arg(long)]
    phase: Option<String>,

    /// Case-insensitive text search across all fields
    #[arg(long, short)]
    search: Option<String>,

    /// Maximum number of entries to show
    #[arg(long, short)]
    limit: Option<usize>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl HistoryCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let store = open_store(config);
        let filter = HistoryFilter {
            phase: self.phase.clone(),
            search: self.search.clone(),
        };

        let mut entries = filter.apply(store.list_entries());
        if let Some(limit) = self.limit {
            entries.truncate(limit);
        }

        match self.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            }
            OutputFormat::Text => {
                if entries.is_empty() {
                    println!("No entries found.");
                    return Ok(());
                }
                println!(
                    "{:<10}  {:>7}  {:>6}  {:>8}  {:>7}  {:<12}  {}",
                    "Date", "Weight", "Waist", "Calories", "Protein", "Phase", "Mood"
                );
                println!("{}", "-".repeat(72));
                for entry in &entries {
                    print_row(entry);
                }
                println!("\nTotal: {} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
            }
        }
        Ok(())
    }
}

fn print_row(entry: &Entry) {
    let cell = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    println!(
        "{:<10}  {:>7}  {:>6}  {:>8}  {:>7}  {:<12}  {}",
        entry.date,
        cell(entry.weight.map(|v| format!("{:.1}", v))),
        cell(entry.waist.map(|v| format!("{:.1}", v))),
        cell(entry.calories.map(|v| v.to_string())),
        cell(entry.protein.map(|v| v.to_string())),
        cell(entry.phase.clone()),
        cell(entry.mood.clone()),
    );
    if let Some(notes) = &entry.training_notes {
        println!("            Notes: {}", notes);
    }
}
