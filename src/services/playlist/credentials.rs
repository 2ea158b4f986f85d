//! OAuth credential providers for the playlist API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::PlaylistError;

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthCredentials {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl OAuthCredentials {
    /// True while the access token has more than the refresh margin left.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        (self.expires_at - now).num_seconds() > EXPIRY_MARGIN_SECS
    }
}

/// Source of OAuth credentials for the playlist API.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Credentials usable right now, refreshing first if they are about to expire.
    async fn valid_credentials(&self) -> Result<OAuthCredentials, PlaylistError>;

    /// Force a refresh and return the new credentials.
    async fn refresh(&self) -> Result<OAuthCredentials, PlaylistError>;
}

/// Response from the OAuth token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Credentials cached in a JSON file and refreshed with the refresh-token grant.
pub struct FileCredentialProvider {
    path: PathBuf,
    client_id: String,
    client_secret: String,
    token_url: String,
    http: Client,
    cached: Mutex<Option<OAuthCredentials>>,
}

impl FileCredentialProvider {
    pub fn new(
        path: impl Into<PathBuf>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PlaylistError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            path: path.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_url: token_url.into(),
            http,
            cached: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_cache(&self) -> Result<OAuthCredentials, PlaylistError> {
        if !self.path.exists() {
            return Err(PlaylistError::CredentialsUnavailable(format!(
                "no credential cache at {}",
                self.path.display()
            )));
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| PlaylistError::CacheError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| PlaylistError::CacheError(e.to_string()))
    }

    fn write_cache(&self, credentials: &OAuthCredentials) -> Result<(), PlaylistError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PlaylistError::CacheError(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(credentials)
            .map_err(|e| PlaylistError::CacheError(e.to_string()))?;
        std::fs::write(&self.path, content).map_err(|e| PlaylistError::CacheError(e.to_string()))
    }

    async fn exchange_refresh_token(
        &self,
        current: &OAuthCredentials,
    ) -> Result<OAuthCredentials, PlaylistError> {
        let refresh_token = current.refresh_token.clone().ok_or_else(|| {
            PlaylistError::RefreshFailed("cached credentials have no refresh token".to_string())
        })?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self.http.post(&self.token_url).form(&params).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PlaylistError::RefreshFailed(format!(
                "status {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PlaylistError::InvalidResponse(e.to_string()))?;

        Ok(OAuthCredentials {
            access_token: token.access_token,
            // Google omits the refresh token on refresh; keep the old one.
            refresh_token: token.refresh_token.or(Some(refresh_token)),
            expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
            token_type: token.token_type.unwrap_or_else(default_token_type),
        })
    }
}

#[async_trait]
impl CredentialProvider for FileCredentialProvider {
    async fn valid_credentials(&self) -> Result<OAuthCredentials, PlaylistError> {
        let current = {
            let mut cached = self.cached.lock().await;
            if cached.is_none() {
                *cached = Some(self.read_cache()?);
            }
            cached.clone()
        };

        match current {
            Some(credentials) if credentials.is_fresh_at(Utc::now()) => Ok(credentials),
            _ => {
                debug!(path = %self.path.display(), "access token expired, refreshing");
                self.refresh().await
            }
        }
    }

    async fn refresh(&self) -> Result<OAuthCredentials, PlaylistError> {
        let mut cached = self.cached.lock().await;
        let current = match cached.clone() {
            Some(c) => c,
            None => self.read_cache()?,
        };
        let refreshed = self.exchange_refresh_token(&current).await?;
        self.write_cache(&refreshed)?;
        info!(expires_at = %refreshed.expires_at, "refreshed playlist credentials");
        *cached = Some(refreshed.clone());
        Ok(refreshed)
    }
}
