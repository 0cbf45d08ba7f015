use chrono::Local;
use clap::Args;
use fit_journal_core::{Dashboard, TrendSeries};

use super::{open_store, OutputFormat};
use crate::config::Config;

/// Show the latest figures and recent changes
#[derive(Args)]
pub struct DashboardCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl DashboardCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let store = open_store(config);
        let dash = Dashboard::from_entries(store.list_entries(), Local::now().date_naive());

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&dash)?),
            OutputFormat::Text => {
                println!("Dashboard");
                println!("=========\n");
                if dash.total_entries == 0 {
                    println!("No entries yet. Use 'fitj log' to add one.");
                    return Ok(());
                }

                if let Some(date) = dash.latest_date {
                    println!("Latest entry:     {}", date);
                }
                println!(
                    "Current weight:   {}{}",
                    value(dash.current_weight, " kg"),
                    change(dash.weight_change)
                );
                println!(
                    "Current waist:    {}{}",
                    value(dash.current_waist, "\""),
                    change(dash.waist_change)
                );
                if let Some(phase) = &dash.current_phase {
                    println!("Phase:            {} ({} days)", phase, dash.phase_days);
                }
                println!("This week:        {} entries", dash.entries_this_week);
                println!("Total:            {} entries", dash.total_entries);
            }
        }
        Ok(())
    }
}

/// Show chart series (weight, waist, nutrition, phases)
#[derive(Args)]
pub struct TrendsCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl TrendsCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let store = open_store(config);
        let trends = TrendSeries::from_entries(store.list_entries());

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&trends)?),
            OutputFormat::Text => {
                println!("Weight");
                for (date, weight) in &trends.weight {
                    println!("  {}  {:>6.1}", date, weight);
                }
                println!("\nWaist");
                for (date, waist) in &trends.waist {
                    println!("  {}  {:>6.1}", date, waist);
                }
                println!("\nCalories vs protein");
                for (calories, protein) in &trends.nutrition {
                    println!("  {:>5} kcal  {:>4} g", calories, protein);
                }
                println!("\nDays per phase");
                for (phase, days) in &trends.phase_days {
                    println!("  {:<14} {}", phase, days);
                }
            }
        }
        Ok(())
    }
}

fn value(v: Option<f64>, unit: &str) -> String {
    v.map(|v| format!("{:.1}{}", v, unit))
        .unwrap_or_else(|| "-".to_string())
}

fn change(delta: Option<f64>) -> String {
    match delta {
        Some(d) => format!(" ({:+.1})", d),
        None => String::new(),
    }
}
