use async_trait::async_trait;

use crate::core::credentials::{AuthError, CredentialProvider, CredentialStore, OAuthClient};

use super::sync_models::{FetchDegraded, Payload, PushFailure, Row, UpdateTarget};

/// Read side: the data store being mirrored.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Read the current payload. Every failure here is a degraded read,
    /// never an error that should stop the loop.
    async fn fetch(&self) -> Result<Payload, FetchDegraded>;
}

/// Write side: the spreadsheet values API.
#[async_trait]
pub trait SheetWriter: Send + Sync {
    /// Overwrite `target` with `rows`, all in one request.
    async fn write_rows(
        &self,
        token: &str,
        target: &UpdateTarget,
        rows: &[Row],
    ) -> Result<(), PushFailure>;

    /// Blank out every cell of `target`.
    async fn clear_range(&self, token: &str, target: &UpdateTarget) -> Result<(), PushFailure>;
}

/// Supplies the bearer token for the write side.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn bearer_token(&self) -> Result<String, AuthError>;
}

#[async_trait]
impl<S, O> TokenSource for CredentialProvider<S, O>
where
    S: CredentialStore,
    O: OAuthClient,
{
    async fn bearer_token(&self) -> Result<String, AuthError> {
        Ok(self.obtain_credential().await?.token)
    }
}
