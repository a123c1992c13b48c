//! Google service account authentication.

pub mod credentials;
pub mod token;

/// Read/write scope for the Sheets API.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

#[cfg(test)]
mod testutil;
