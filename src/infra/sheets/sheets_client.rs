use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::json;

use crate::core::sync::{PushFailure, Row, SheetWriter, UpdateTarget};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Thin client for the Sheets v4 `values` endpoints. Only the two calls the
/// sync loop needs are exposed.
pub struct SheetsClient {
    client: Client,
    base_url: Url,
}

impl SheetsClient {
    pub fn new(client: Client) -> Result<Self, PushFailure> {
        Self::with_base_url(client, SHEETS_API_BASE)
    }

    pub fn with_base_url(client: Client, base_url: &str) -> Result<Self, PushFailure> {
        let base_url = Url::parse(base_url).map_err(|e| PushFailure::Transport(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// `{base}/{spreadsheetId}/values/{range}{suffix}`, with the range encoded
    /// as a single path segment.
    fn values_url(&self, target: &UpdateTarget, suffix: &str) -> Result<Url, PushFailure> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PushFailure::Transport("Sheets base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(&target.spreadsheet_id)
            .push("values")
            .push(&format!("{}{}", target.range, suffix));
        Ok(url)
    }

    async fn check(resp: reqwest::Response) -> Result<serde_json::Value, PushFailure> {
        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(PushFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json().await.unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl SheetWriter for SheetsClient {
    async fn write_rows(
        &self,
        token: &str,
        target: &UpdateTarget,
        rows: &[Row],
    ) -> Result<(), PushFailure> {
        let mut url = self.values_url(target, "")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");

        let body = json!({
            "range": target.range,
            "majorDimension": "ROWS",
            "values": rows,
        });

        let resp = self
            .client
            .put(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| PushFailure::Transport(e.to_string()))?;

        let ack = Self::check(resp).await?;
        tracing::debug!(
            updated_range = ack["updatedRange"].as_str().unwrap_or_default(),
            updated_cells = ack["updatedCells"].as_u64().unwrap_or_default(),
            "Sheets acknowledged update"
        );
        Ok(())
    }

    async fn clear_range(&self, token: &str, target: &UpdateTarget) -> Result<(), PushFailure> {
        let url = self.values_url(target, ":clear")?;

        let resp = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| PushFailure::Transport(e.to_string()))?;

        Self::check(resp).await?;
        tracing::debug!(range = %target.range, "Cleared target range");
        Ok(())
    }
}
