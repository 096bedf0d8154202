use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::core::sync::{FetchDegraded, Payload, SnapshotSource};

/// Reads the mirrored collection from a Firebase Realtime Database REST URL.
///
/// The URL is used verbatim; any access key has to already be part of it.
pub struct FirebaseClient {
    client: Client,
    url: String,
}

impl FirebaseClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl SnapshotSource for FirebaseClient {
    async fn fetch(&self) -> Result<Payload, FetchDegraded> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchDegraded::Transport(e.to_string()))?;

        if resp.status() != StatusCode::OK {
            return Err(FetchDegraded::Status(resp.status().as_u16()));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| FetchDegraded::Transport(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(FetchDegraded::Empty);
        }

        let body: Value =
            serde_json::from_str(&text).map_err(|e| FetchDegraded::Shape(e.to_string()))?;
        Payload::from_json(body)
    }
}
