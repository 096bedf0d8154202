// =============================================================================
// GOOGLE OAUTH 2.0 (INSTALLED APP FLOW)
// =============================================================================
//
// Two calls against Google's authorization server:
//
// 1. **Refresh**: trade the stored refresh token for a new access token.
// 2. **Consent**: first run only. yup-oauth2's installed flow prints an
//    authorization URL and waits on a loopback redirect (OS-assigned port)
//    for the operator to approve access in a browser. The grant it produces
//    is captured through a `TokenStorage` so the refresh token ends up in our
//    own credential file rather than yup's.
//
// The client id/secret come from the `credentials.json` downloaded from the
// Google Cloud Console ("Desktop app" OAuth client). Both the `installed` and
// `web` layouts are accepted.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use yup_oauth2::storage::{TokenInfo, TokenStorage};
use yup_oauth2::{ApplicationSecret, InstalledFlowAuthenticator, InstalledFlowReturnMethod};

use crate::core::credentials::{AuthError, Credential, OAuthClient, SHEETS_SCOPE};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// How long we wait for the operator to finish consent in the browser.
const CONSENT_TIMEOUT: StdDuration = StdDuration::from_secs(300);

/// Keeps whatever grant the installed flow hands to its token storage.
#[derive(Clone, Default)]
struct GrantCapture(Arc<Mutex<Option<TokenInfo>>>);

#[async_trait]
impl TokenStorage for GrantCapture {
    async fn set(&self, _scopes: &[&str], token: TokenInfo) -> anyhow::Result<()> {
        *self.0.lock().await = Some(token);
        Ok(())
    }

    async fn get(&self, _scopes: &[&str]) -> Option<TokenInfo> {
        self.0.lock().await.clone()
    }
}

/// Build our credential from a fresh grant and the client it was issued to.
fn credential_from_grant(
    secret: &ApplicationSecret,
    access_token: String,
    refresh_token: Option<String>,
    expires_at_unix: Option<i64>,
) -> Credential {
    Credential {
        token: access_token,
        refresh_token,
        token_uri: Some(secret.token_uri.clone()),
        client_id: Some(secret.client_id.clone()),
        client_secret: Some(secret.client_secret.clone()),
        scopes: vec![SHEETS_SCOPE.to_string()],
        expiry: expires_at_unix.and_then(|secs| DateTime::from_timestamp(secs, 0)),
    }
}

/// Response from Google's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    /// Fold the response into `base`, keeping the old refresh token when the
    /// server did not issue a new one.
    fn apply_to(self, mut base: Credential) -> Credential {
        base.token = self.access_token;
        if self.refresh_token.is_some() {
            base.refresh_token = self.refresh_token;
        }
        base.expiry = self
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        base
    }
}

/// Talks to Google's OAuth endpoints for the spreadsheet scope.
pub struct GoogleOAuthClient {
    client: Client,
    secrets_path: PathBuf,
}

impl GoogleOAuthClient {
    pub fn new(client: Client, secrets_path: impl AsRef<Path>) -> Self {
        Self {
            client,
            secrets_path: secrets_path.as_ref().to_path_buf(),
        }
    }

    async fn load_secrets(&self) -> Result<ApplicationSecret, AuthError> {
        yup_oauth2::read_application_secret(&self.secrets_path)
            .await
            .map_err(|e| {
                AuthError::ClientSecrets(format!("{}: {}", self.secrets_path.display(), e))
            })
    }

    async fn request_token(
        &self,
        token_uri: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::TokenEndpoint(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenEndpoint(format!(
                "token exchange failed ({}): {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AuthError::TokenEndpoint(e.to_string()))
    }
}

#[async_trait]
impl OAuthClient for GoogleOAuthClient {
    async fn refresh(&self, credential: &Credential) -> Result<Credential, AuthError> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::TokenEndpoint("no refresh token".to_string()))?;
        let client_id = credential
            .client_id
            .as_deref()
            .ok_or_else(|| AuthError::TokenEndpoint("credential has no client_id".to_string()))?;
        let client_secret = credential.client_secret.as_deref().unwrap_or_default();
        let token_uri = credential.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);

        let response = self
            .request_token(
                token_uri,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                ],
            )
            .await?;

        Ok(response.apply_to(credential.clone()))
    }

    async fn authorize(&self) -> Result<Credential, AuthError> {
        let secret = self.load_secrets().await?;
        let capture = GrantCapture::default();

        let auth = InstalledFlowAuthenticator::builder(
            secret.clone(),
            InstalledFlowReturnMethod::HTTPRedirect,
        )
        .with_storage(Box::new(capture.clone()))
        .build()
        .await
        .map_err(|e| AuthError::Consent(e.to_string()))?;

        tracing::info!("Waiting for OAuth consent in the browser");
        let access = tokio::time::timeout(CONSENT_TIMEOUT, auth.token(&[SHEETS_SCOPE]))
            .await
            .map_err(|_| AuthError::Consent("timed out waiting for consent".to_string()))?
            .map_err(|e| AuthError::Consent(e.to_string()))?;

        let grant = capture.0.lock().await.take();
        let access_token = grant
            .as_ref()
            .and_then(|g| g.access_token.clone())
            .or_else(|| access.token().map(str::to_string))
            .ok_or_else(|| AuthError::Consent("grant carried no access token".to_string()))?;
        let refresh_token = grant.as_ref().and_then(|g| g.refresh_token.clone());
        let expires_at = grant
            .as_ref()
            .and_then(|g| g.expires_at)
            .or_else(|| access.expiration_time())
            .map(|at| at.unix_timestamp());

        Ok(credential_from_grant(
            &secret,
            access_token,
            refresh_token,
            expires_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::test_server::{direct_client, serve_once};
    use tempfile::TempDir;

    const INSTALLED_SECRETS: &str = r#"{"installed": {
        "client_id": "abc.apps.googleusercontent.com",
        "project_id": "sheet-mirror",
        "auth_uri": "https://accounts.google.com/o/oauth2/auth",
        "token_uri": "https://oauth2.googleapis.com/token",
        "auth_provider_x509_cert_url": "https://www.googleapis.com/oauth2/v1/certs",
        "client_secret": "shh",
        "redirect_uris": ["http://localhost"]
    }}"#;

    fn stored(token_uri: String) -> Credential {
        Credential {
            token: "old".to_string(),
            refresh_token: Some("keep-me".to_string()),
            token_uri: Some(token_uri),
            client_id: Some("abc".to_string()),
            client_secret: Some("shh".to_string()),
            scopes: vec![SHEETS_SCOPE.to_string()],
            expiry: None,
        }
    }

    #[tokio::test]
    async fn grant_carries_client_details_from_secrets_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, INSTALLED_SECRETS).unwrap();
        let client = GoogleOAuthClient::new(direct_client(), &path);

        let secret = client.load_secrets().await.unwrap();
        let credential = credential_from_grant(
            &secret,
            "access".to_string(),
            Some("refresh".to_string()),
            Some(4_102_444_800),
        );

        assert_eq!(credential.token, "access");
        assert_eq!(credential.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(
            credential.client_id.as_deref(),
            Some("abc.apps.googleusercontent.com")
        );
        assert_eq!(credential.client_secret.as_deref(), Some("shh"));
        assert_eq!(credential.token_uri.as_deref(), Some(DEFAULT_TOKEN_URI));
        assert_eq!(credential.scopes, vec![SHEETS_SCOPE.to_string()]);
        assert_eq!(credential.expiry.unwrap().timestamp(), 4_102_444_800);
        assert!(credential.can_refresh());
    }

    #[tokio::test]
    async fn unreadable_secrets_file_is_a_client_secrets_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, r#"{"service_account": {}}"#).unwrap();
        let client = GoogleOAuthClient::new(direct_client(), &path);

        let err = client.authorize().await.unwrap_err();
        assert!(matches!(err, AuthError::ClientSecrets(ref msg) if msg.contains("credentials.json")));
    }

    #[test]
    fn grant_without_expiry_has_none() {
        let secret = ApplicationSecret {
            client_id: "id".to_string(),
            client_secret: "s".to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            ..Default::default()
        };
        let credential = credential_from_grant(&secret, "a".to_string(), None, None);

        assert!(credential.expiry.is_none());
        assert!(!credential.can_refresh());
    }

    #[test]
    fn token_response_keeps_refresh_token_when_absent() {
        let response = TokenResponse {
            access_token: "new".to_string(),
            expires_in: Some(3599),
            refresh_token: None,
        };
        let credential = response.apply_to(stored(DEFAULT_TOKEN_URI.to_string()));

        assert_eq!(credential.token, "new");
        assert_eq!(credential.refresh_token.as_deref(), Some("keep-me"));
        assert!(credential.is_valid_at(Utc::now()));
    }

    #[tokio::test]
    async fn refresh_posts_refresh_grant() {
        let (base, server) =
            serve_once("200 OK", r#"{"access_token":"fresh","expires_in":3600}"#).await;
        let client = GoogleOAuthClient::new(direct_client(), "unused.json");

        let credential = client
            .refresh(&stored(format!("{}/token", base)))
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /token "));
        assert!(request.contains("grant_type=refresh_token"));
        assert!(request.contains("refresh_token=keep-me"));
        assert_eq!(credential.token, "fresh");
        assert_eq!(credential.refresh_token.as_deref(), Some("keep-me"));
    }

    #[tokio::test]
    async fn rejected_refresh_is_a_token_endpoint_error() {
        let (base, server) = serve_once("400 Bad Request", r#"{"error":"invalid_grant"}"#).await;
        let client = GoogleOAuthClient::new(direct_client(), "unused.json");

        let err = client
            .refresh(&stored(format!("{}/token", base)))
            .await
            .unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, AuthError::TokenEndpoint(ref msg) if msg.contains("invalid_grant")));
    }

    #[tokio::test]
    async fn consent_without_client_secrets_fails_fast() {
        let dir = TempDir::new().unwrap();
        let client = GoogleOAuthClient::new(direct_client(), dir.path().join("credentials.json"));

        let err = client.authorize().await.unwrap_err();
        assert!(matches!(err, AuthError::ClientSecrets(_)));
    }
}
