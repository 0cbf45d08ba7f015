//! Google implementation of the spreadsheet remote.

mod google;
mod oauth;

pub use google::GoogleSheetsRemote;
