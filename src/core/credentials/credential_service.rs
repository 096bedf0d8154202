// Credential provider for the spreadsheet API.
// Nothing in here talks HTTP or touches the disk directly: the token file and
// the OAuth endpoints sit behind the two ports below, so the decision logic
// (cached? still valid? refreshable? ask the operator?) can be tested alone.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// OAuth scope required for writing spreadsheet values.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// A token is only handed out if it stays valid for at least this long.
const EXPIRY_MARGIN_SECS: i64 = 60;

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// Bearer token plus the metadata needed to renew it.
///
/// Serialized in the "authorized user" JSON layout so an existing
/// `token.json` written by other Google tooling can be picked up as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl Credential {
    /// Valid means: has a token, and does not expire within the safety margin.
    /// Credentials without an expiry are assumed to be valid.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.token.is_empty() {
            return false;
        }
        match self.expiry {
            Some(expiry) => expiry > now + Duration::seconds(EXPIRY_MARGIN_SECS),
            None => true,
        }
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Anything that keeps us from producing a usable bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Client secrets file unusable: {0}")]
    ClientSecrets(String),

    #[error("Interactive authorization failed: {0}")]
    Consent(String),

    #[error("Token endpoint error: {0}")]
    TokenEndpoint(String),

    #[error("Failed to persist credential: {0}")]
    Store(#[from] StoreError),
}

// ============================================================================
// PORTS
// ============================================================================

/// Where the credential lives between runs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns `None` when nothing usable has been persisted yet.
    async fn load(&self) -> Option<Credential>;
    async fn save(&self, credential: &Credential) -> Result<(), StoreError>;
}

/// The OAuth authorization server.
#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// Exchange the refresh token for a new access token.
    async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError>;

    /// Run the interactive consent flow and return a brand new credential.
    async fn authorize(&self) -> Result<Credential, AuthError>;
}

// ============================================================================
// SERVICE
// ============================================================================

/// Hands out a valid credential, renewing or re-authorizing when needed.
///
/// The last good credential is kept in memory, so the common case (token
/// still valid) costs neither file I/O nor a network round-trip.
pub struct CredentialProvider<S: CredentialStore, O: OAuthClient> {
    store: S,
    oauth: O,
    cached: RwLock<Option<Credential>>,
}

impl<S, O> CredentialProvider<S, O>
where
    S: CredentialStore,
    O: OAuthClient,
{
    pub fn new(store: S, oauth: O) -> Self {
        Self {
            store,
            oauth,
            cached: RwLock::new(None),
        }
    }

    pub async fn obtain_credential(&self) -> Result<Credential, AuthError> {
        let now = Utc::now();

        {
            let cached = self.cached.read().await;
            if let Some(credential) = cached.as_ref() {
                if credential.is_valid_at(now) {
                    return Ok(credential.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;

        // Prefer what we already hold in memory; only hit the file when empty.
        let current = match cached.take() {
            Some(credential) => Some(credential),
            None => self.store.load().await,
        };

        if let Some(credential) = current.as_ref() {
            if credential.is_valid_at(now) {
                *cached = Some(credential.clone());
                return Ok(credential.clone());
            }
        }

        let renewed = match current {
            Some(credential) if credential.can_refresh() => {
                match self.oauth.refresh(&credential).await {
                    Ok(fresh) => {
                        tracing::info!("Refreshed spreadsheet access token");
                        Some(fresh)
                    }
                    Err(e) => {
                        tracing::warn!("Token refresh failed, falling back to consent: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        let credential = match renewed {
            Some(credential) => credential,
            None => {
                tracing::info!("No usable credential, starting interactive authorization");
                self.oauth.authorize().await?
            }
        };

        self.store.save(&credential).await?;
        *cached = Some(credential.clone());
        Ok(credential)
    }
}
