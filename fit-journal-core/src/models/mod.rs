mod entry;
mod journal;
mod settings;
mod theme;

pub use entry::{Entry, EntryError, EntryForm, DATE_FORMAT};
pub use journal::{Journal, UpsertOutcome};
pub use settings::{SettingError, SettingKey, SettingValue, Settings};
pub use theme::Theme;
