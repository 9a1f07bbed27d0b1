//! Google OAuth for the calendar card.
//!
//! The dashboard uses the offline authorization-code flow: the operator signs
//! in once through the consent URL, the resulting code is exchanged for an
//! access/refresh token pair, and the access token is then refreshed shortly
//! before it expires. Tokens are persisted to `token.json` in the state
//! directory so a restart does not need a new sign-in, and a token saved by
//! `dashboard-cli sign-in` is picked up by a running dashboard.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::config::GoogleAuthConfig;
use crate::error::{DashboardError, DashboardResult};

const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const TOKEN_FILE: &str = "token.json";

/// Seconds before expiry at which the access token is refreshed
const REFRESH_MARGIN_SECS: i64 = 60;

/// Wait before retrying a refresh that failed without being rejected
const RETRY_DELAY: Duration = Duration::from_secs(60);

/// How often a signed-out dashboard looks for a new sign-in
const SIGNED_OUT_POLL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    /// Lifetime of `access_token` in seconds, as reported when it was issued
    pub expires_in: i64,
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token_expires_in: Option<i64>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Token endpoint response; refreshes omit the refresh token
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
    #[serde(default)]
    scope: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    id_token: Option<String>,
    refresh_token_expires_in: Option<i64>,
}

#[derive(Serialize)]
struct ExchangeRequest<'a> {
    code: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    grant_type: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
}

/// Holds the signed-in token and keeps it fresh.
///
/// Clones share the same token.
#[derive(Clone)]
pub struct Authenticator {
    config: GoogleAuthConfig,
    client: reqwest::Client,
    token: Arc<RwLock<Option<Token>>>,
    /// Set while the last refresh failed for a transient reason
    refresh_failed: Arc<AtomicBool>,
    token_path: PathBuf,
}

impl Authenticator {
    pub fn new(config: GoogleAuthConfig, state_dir: &Path) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            token: Arc::new(RwLock::new(None)),
            refresh_failed: Arc::new(AtomicBool::new(false)),
            token_path: state_dir.join(TOKEN_FILE),
        }
    }

    /// Create an authenticator primed with the persisted token, if there is one.
    pub async fn load(config: GoogleAuthConfig, state_dir: &Path) -> Self {
        let auth = Self::new(config, state_dir);
        if !auth.reload().await {
            tracing::info!("No saved Google token, sign-in required");
        }
        auth
    }

    /// Replace the in-memory token with the persisted one. Returns false when
    /// there is no usable token file.
    async fn reload(&self) -> bool {
        match tokio::fs::read(&self.token_path).await {
            Ok(bytes) => match serde_json::from_slice::<Token>(&bytes) {
                Ok(token) => {
                    tracing::info!("Loaded saved Google token from {}", self.token_path.display());
                    self.set_token(Some(token));
                    self.refresh_failed.store(false, Ordering::SeqCst);
                    true
                }
                Err(e) => {
                    tracing::warn!("Ignoring unreadable token file: {}", e);
                    false
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!("Failed to read token file: {}", e);
                false
            }
        }
    }

    /// Held token, falling back to one saved since we last looked.
    async fn current_token(&self) -> Option<Token> {
        if let Some(token) = self.token() {
            return Some(token);
        }
        if self.reload().await {
            self.token()
        } else {
            None
        }
    }

    /// Consent URL the operator visits to obtain an authorization code.
    pub fn auth_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.config.auth_url,
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(CALENDAR_SCOPE),
        )
    }

    pub fn token(&self) -> Option<Token> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.token().is_some()
    }

    /// Current access token, or an auth error when nobody is signed in.
    pub async fn access_token(&self) -> DashboardResult<String> {
        self.current_token()
            .await
            .map(|token| token.access_token)
            .ok_or_else(|| DashboardError::auth("Not signed in to Google"))
    }

    fn set_token(&self, token: Option<Token>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    /// Exchange a one-time authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> DashboardResult<Token> {
        tracing::info!("Exchanging authorization code");
        let request = self.client.post(&self.config.token_url).form(&ExchangeRequest {
            code,
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            redirect_uri: &self.config.redirect_uri,
            grant_type: "authorization_code",
        });

        let result: DashboardResult<Token> = async {
            let response = request_token(request).await?;
            let refresh_token = response
                .refresh_token
                .ok_or_else(|| DashboardError::auth("No refresh token received"))?;
            Ok(Token {
                access_token: response.access_token,
                expires_in: response.expires_in,
                refresh_token,
                scope: response.scope,
                token_type: response.token_type,
                id_token: response.id_token,
                refresh_token_expires_in: response.refresh_token_expires_in,
            })
        }
        .await;

        self.settle(result).await
    }

    /// Trade the held refresh token for a new access token.
    pub async fn refresh(&self) -> DashboardResult<Token> {
        let current = self
            .current_token()
            .await
            .ok_or_else(|| DashboardError::auth("No token to refresh"))?;

        tracing::info!("Refreshing access token");
        let request = self.client.post(&self.config.token_url).form(&RefreshRequest {
            refresh_token: &current.refresh_token,
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            grant_type: "refresh_token",
        });

        let result = request_token(request).await.map(|response| Token {
            access_token: response.access_token,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token.unwrap_or(current.refresh_token.clone()),
            id_token: response.id_token.or(current.id_token.clone()),
            ..current
        });

        self.settle(result).await
    }

    /// Store a new token. A rejected request forgets the old one; transport
    /// and server failures keep it for the next attempt.
    async fn settle(&self, result: DashboardResult<Token>) -> DashboardResult<Token> {
        match result {
            Ok(token) => {
                self.set_token(Some(token.clone()));
                self.refresh_failed.store(false, Ordering::SeqCst);
                if let Err(e) = self.persist(&token).await {
                    tracing::error!("Failed to save token: {}", e);
                }
                tracing::info!("New access token expires in {}s", token.expires_in);
                Ok(token)
            }
            Err(e) if e.is_auth() => {
                tracing::warn!("Token request rejected, sign-in required: {}", e);
                self.sign_out().await;
                Err(e)
            }
            Err(e) => {
                tracing::warn!("Token request failed, keeping current token: {}", e);
                self.refresh_failed.store(true, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn persist(&self, token: &Token) -> DashboardResult<()> {
        if let Some(dir) = self.token_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let bytes = serde_json::to_vec_pretty(token).map_err(std::io::Error::from)?;
        tokio::fs::write(&self.token_path, bytes).await?;
        Ok(())
    }

    /// Drop the in-memory and persisted token.
    pub async fn sign_out(&self) {
        self.set_token(None);
        self.refresh_failed.store(false, Ordering::SeqCst);
        match tokio::fs::remove_file(&self.token_path).await {
            Ok(()) => tracing::debug!("Removed {}", self.token_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!("Failed to remove token file: {}", e),
        }
    }

    /// Interval function for the refresh poller: shortly before the held token
    /// expires, a short retry after a failed refresh, and a slow check for a
    /// new sign-in while nobody is signed in.
    pub fn refresh_interval(&self) -> impl Fn(DateTime<Local>) -> Option<Duration> + Send + Sync + 'static {
        let auth = self.clone();
        move |_| {
            let delay = match auth.token() {
                None => SIGNED_OUT_POLL,
                Some(_) if auth.refresh_failed.load(Ordering::SeqCst) => RETRY_DELAY,
                Some(token) => Duration::from_secs((token.expires_in - REFRESH_MARGIN_SECS).max(0) as u64),
            };
            Some(delay)
        }
    }
}

async fn request_token(request: reqwest::RequestBuilder) -> DashboardResult<TokenResponse> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_server_error() {
        tracing::error!("Token endpoint unavailable: {}", status);
        return Err(DashboardError::http(status));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!("Token request failed: {} - {}", status, body);
        return Err(DashboardError::auth(format!(
            "Token retrieval failed: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )));
    }

    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| DashboardError::auth(format!("Invalid token response: {}", e)))
}
