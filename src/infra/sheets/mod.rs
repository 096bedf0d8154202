// Destination side: Google Sheets values API.

#[path = "sheets_client.rs"]
pub mod sheets_client;

pub use sheets_client::SheetsClient;
