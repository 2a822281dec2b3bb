//! Azure AD client-credentials authentication for Microsoft Graph.
//!
//! Tokens are cached per authenticator and refreshed when they are within
//! 60 seconds of expiry, so back-to-back Graph calls reuse one token.

use chrono::{DateTime, Duration, Utc};
use newsbrief_core::error::MailError;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

/// How close to expiry a cached token may be before it is refreshed.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Acquires and caches app-only access tokens for Microsoft Graph.
pub struct GraphAuthenticator {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    client: reqwest::Client,
    cached: RwLock<Option<CachedToken>>,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Utc::now() + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

impl GraphAuthenticator {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            client,
            cached: RwLock::new(None),
        }
    }

    /// Get a valid access token, reusing the cached one when still fresh.
    pub async fn access_token(&self) -> Result<String, MailError> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref()
                && token.is_fresh()
            {
                return Ok(token.access_token.clone());
            }
        }

        let token = self.fetch_token().await?;
        let access_token = token.access_token.clone();

        let mut cached = self.cached.write().await;
        *cached = Some(token);

        Ok(access_token)
    }

    async fn fetch_token(&self) -> Result<CachedToken, MailError> {
        let url = format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        );

        debug!(tenant = %self.tenant_id, "Requesting Graph access token");

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", "https://graph.microsoft.com/.default"),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|e| MailError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 400 || status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::AuthenticationFailed(format!(
                "Token request rejected (status {status}): {body}"
            )));
        }

        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::AuthenticationFailed(format!(
                "Token endpoint returned status {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MailError::AuthenticationFailed(format!("Malformed token response: {e}")))?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}
