use chrono::{Local, NaiveDate};
use clap::Args;
use fit_journal_core::{EntryForm, SyncOutcome, UpsertOutcome, DATE_FORMAT};

use super::{open_store, open_tracker, runtime};
use crate::config::Config;

/// Record measurements for a day. Logging the same date again replaces it.
#[derive(Args)]
pub struct LogCommand {
    /// Date (YYYY-MM-DD), defaults to today
    #[arg(long, short)]
    date: Option<String>,

    /// Body weight
    #[arg(long, short)]
    weight: Option<String>,

    /// Waist measurement
    #[arg(long)]
    waist: Option<String>,

    /// Calories eaten
    #[arg(long)]
    calories: Option<String>,

    /// Protein eaten (grams)
    #[arg(long, short)]
    protein: Option<String>,

    /// How you felt
    #[arg(long, short)]
    mood: Option<String>,

    /// Training phase (e.g. Cutting, Bulking, Maintenance)
    #[arg(long)]
    phase: Option<String>,

    /// Training notes
    #[arg(long, short)]
    notes: Option<String>,
}

impl LogCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let form = EntryForm {
            date: Some(
                self.date
                    .clone()
                    .unwrap_or_else(|| Local::now().date_naive().format(DATE_FORMAT).to_string()),
            ),
            weight: self.weight.clone(),
            waist: self.waist.clone(),
            calories: self.calories.clone(),
            protein: self.protein.clone(),
            mood: self.mood.clone(),
            phase: self.phase.clone(),
            training_notes: self.notes.clone(),
        };

        let rt = runtime()?;
        let tracker = open_tracker(config);
        let submission = rt.block_on(tracker.submit_entry(form))?;

        match submission.outcome {
            UpsertOutcome::Inserted => println!("Saved entry for {}", submission.date),
            UpsertOutcome::Updated => println!("Updated entry for {}", submission.date),
        }
        if let Some(entry) = rt.block_on(async {
            tracker
                .store()
                .lock()
                .await
                .entry(submission.date)
                .cloned()
        }) {
            println!("  {}", entry);
        }

        match submission.auto_sync {
            Some(Ok(SyncOutcome::Synced { rows_written })) => {
                println!("Synced to Google Sheets ({} new rows)", rows_written)
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => eprintln!("Warning: auto-sync failed: {}", e),
            None => {}
        }

        let (pending, connected) = rt.block_on(async {
            let store = tracker.store().lock().await;
            (
                store.is_sync_pending(),
                store.settings().google_sheets_connected,
            )
        });
        if pending && connected {
            println!("Not in Google Sheets yet; run `fitj sheets sync` to push it.");
        }
        Ok(())
    }
}

/// Delete the entry for a day
#[derive(Args)]
pub struct DeleteCommand {
    /// Date (YYYY-MM-DD)
    date: String,
}

impl DeleteCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let date = parse_date(&self.date)?;
        let mut store = open_store(config);

        if store.delete_entry(date)? {
            println!("Deleted entry for {}", date);
        } else {
            println!("No entry for {}", date);
        }
        Ok(())
    }
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| format!("Invalid date format '{}'. Use YYYY-MM-DD.", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date(" 2024-03-01 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(
            parse_date("March 1").unwrap_err(),
            "Invalid date format 'March 1'. Use YYYY-MM-DD."
        );
    }
}
