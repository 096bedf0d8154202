// This is the entry point of the sheet mirror.
//
// **Architecture Overview:**
// - `core/` = Sync and credential logic (no HTTP, no files)
// - `infra/` = Implementations of core traits (Firebase, Sheets, OAuth, token file)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run the polling loop until interrupted

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

mod config;

use anyhow::Context;

use crate::config::Config;
use crate::core::credentials::CredentialProvider;
use crate::core::sync::{SyncService, UpdateTarget};
use crate::infra::firebase::FirebaseClient;
use crate::infra::google_auth::{GoogleOAuthClient, TokenFile};
use crate::infra::http::build_client;
use crate::infra::sheets::SheetsClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    if config.firebase_api_key.is_some() {
        tracing::info!("FIREBASE_API_KEY is set but not sent; put any auth into FIREBASE_URL");
    }

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================

    let http = build_client(config.http_timeout).context("Failed to build HTTP client")?;

    let credentials = CredentialProvider::new(
        TokenFile::new(&config.token_file),
        GoogleOAuthClient::new(http.clone(), &config.client_secrets_file),
    );

    let source = FirebaseClient::new(http.clone(), config.firebase_url.clone());
    let sheets = SheetsClient::new(http).context("Failed to create Sheets client")?;

    let target = UpdateTarget {
        spreadsheet_id: config.spreadsheet_id.clone(),
        range: config.sheet_range.clone(),
    };

    let sync = SyncService::new(source, sheets, credentials, target)
        .with_clear_before_write(config.clear_before_write);

    tracing::info!(
        range = %config.sheet_range,
        interval_secs = config.poll_interval.as_secs(),
        "Starting sheet mirror"
    );

    sync.run_forever(config.poll_interval)
        .await
        .context("Authentication failed, stopping")?;

    Ok(())
}
