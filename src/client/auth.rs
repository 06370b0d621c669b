//! Token acquisition and background refresh
//!
//! The refresher is the only writer of the auth snapshot; every HTTP call
//! reads the current snapshot without locking.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::models::{Token, User};
use crate::config::Credentials;
use crate::error::{ApiError, Result};

/// Delay between refresh attempts after a failure
pub const RETRY_INTERVAL: Duration = Duration::from_secs(10);

/// Immutable view of the current session
#[derive(Debug, Clone)]
pub struct AuthSnapshot {
    pub token: String,
    pub user: User,
    /// Business group the agent acts in
    pub org_id: String,
    pub lifetime: Duration,
}

/// Single-writer, many-reader holder of the current [`AuthSnapshot`]
#[derive(Default)]
pub struct TokenStore {
    current: ArcSwapOption<AuthSnapshot>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot atomically
    pub fn publish(&self, snapshot: AuthSnapshot) {
        self.current.store(Some(Arc::new(snapshot)));
    }

    pub fn snapshot(&self) -> Option<Arc<AuthSnapshot>> {
        self.current.load_full()
    }

    pub fn token(&self) -> Result<String> {
        self.snapshot()
            .map(|s| s.token.clone())
            .ok_or_else(|| ApiError::Auth("not authenticated".to_string()).into())
    }

    pub fn org_id(&self) -> Result<String> {
        self.snapshot()
            .map(|s| s.org_id.clone())
            .ok_or_else(|| ApiError::Auth("not authenticated".to_string()).into())
    }
}

/// Refresh at 75% of the reported lifetime, never sooner than [`RETRY_INTERVAL`]
pub fn refresh_threshold(lifetime: Duration) -> Duration {
    lifetime.mul_f64(0.75).max(RETRY_INTERVAL)
}

/// Something that can produce a fresh session
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self) -> Result<AuthSnapshot>;
}

/// Password or client-credentials login against the accounts API
pub struct Login {
    http: HttpClient,
    base_url: String,
    credentials: Credentials,
    org_name: String,
    lifetime: Duration,
}

impl Login {
    pub fn new(
        http: HttpClient,
        base_url: impl Into<String>,
        credentials: Credentials,
        org_name: impl Into<String>,
        lifetime: Duration,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            credentials,
            org_name: org_name.into(),
            lifetime,
        }
    }

    async fn acquire_token(&self) -> Result<(String, Duration)> {
        let (url, body) = match &self.credentials {
            Credentials::Password { username, password } => (
                format!("{}/accounts/login", self.base_url),
                json!({ "username": username, "password": password }),
            ),
            Credentials::ClientCredentials {
                client_id,
                client_secret,
            } => (
                format!("{}/accounts/oauth2/token", self.base_url),
                json!({
                    "grant_type": "client_credentials",
                    "client_id": client_id,
                    "client_secret": client_secret,
                }),
            ),
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        let text = response.text().await.map_err(ApiError::from)?;
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Auth(format!("login rejected ({}): {}", status, text)).into());
        }
        if !status.is_success() {
            return Err(ApiError::UnexpectedResponse {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        let token: Token = serde_json::from_str(&text)
            .map_err(|e| ApiError::Parse(format!("login response: {}", e)))?;
        let lifetime = token
            .expires_in
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(self.lifetime);
        Ok((token.access_token, lifetime))
    }

    async fn fetch_user(&self, token: &str) -> Result<User> {
        #[derive(Deserialize)]
        struct MeResponse {
            user: User,
        }

        let response = self
            .http
            .get(format!("{}/accounts/api/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(ApiError::from)?;

        let status = response.status();
        let text = response.text().await.map_err(ApiError::from)?;
        if status == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Auth(text).into());
        }
        if !status.is_success() {
            return Err(ApiError::UnexpectedResponse {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        let me: MeResponse = serde_json::from_str(&text)
            .map_err(|e| ApiError::Parse(format!("current user: {}", e)))?;
        Ok(me.user)
    }
}

#[async_trait]
impl Authenticator for Login {
    async fn login(&self) -> Result<AuthSnapshot> {
        let (token, lifetime) = self.acquire_token().await?;
        let user = self.fetch_user(&token).await?;

        let org_id = user
            .business_group(&self.org_name)
            .map(|org| org.id.clone())
            .ok_or_else(|| {
                ApiError::Auth(format!(
                    "user {} is not a member of business group '{}'",
                    user.username, self.org_name
                ))
            })?;

        debug!("Authenticated as {} in org {}", user.username, org_id);
        Ok(AuthSnapshot {
            token,
            user,
            org_id,
            lifetime,
        })
    }
}

/// Handle to the background refresh task
pub struct TokenRefresher {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TokenRefresher {
    /// Start refreshing. The first refresh happens at 75% of `lifetime`.
    pub fn spawn<A>(auth: Arc<A>, store: Arc<TokenStore>, lifetime: Duration) -> Self
    where
        A: Authenticator + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(refresh_loop(
            auth,
            store,
            refresh_threshold(lifetime),
            stop_rx,
        ));
        Self { stop_tx, handle }
    }

    /// Signal the task and wait for it to exit
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!("Token refresher ended abnormally: {}", e);
        }
    }
}

async fn refresh_loop<A: Authenticator>(
    auth: Arc<A>,
    store: Arc<TokenStore>,
    first_delay: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut delay = first_delay;
    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    debug!("Token refresher stopping");
                    break;
                }
            }
            _ = tokio::time::sleep(delay) => {
                match auth.login().await {
                    Ok(snapshot) => {
                        delay = refresh_threshold(snapshot.lifetime);
                        info!("Refreshed Anypoint token, next refresh in {:?}", delay);
                        store.publish(snapshot);
                    }
                    Err(e) => {
                        warn!("Failed to refresh Anypoint token, retrying in {:?}: {}", RETRY_INTERVAL, e);
                        delay = RETRY_INTERVAL;
                    }
                }
            }
        }
    }
}
