//! Bearer token session against the back office.

use std::time::{Duration, Instant};

use pratica_core::accounting::RemoteCallError;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::transport::{Request, Transport};

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
    /// Lifetime in seconds.
    expires_in: u64,
}

/// Upper bound on how long a token is trusted, whatever the server claims.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_after: Instant,
}

/// Caches the bearer token and logs in again shortly before it expires.
pub(crate) struct TokenSession {
    username: String,
    password: String,
    refresh_margin: Duration,
    current: Mutex<Option<CachedToken>>,
}

impl TokenSession {
    pub(crate) fn new(username: String, password: String, refresh_margin: Duration) -> Self {
        Self {
            username,
            password,
            refresh_margin,
            current: Mutex::new(None),
        }
    }

    /// Returns a valid token, logging in when none is cached or it is about
    /// to expire.
    pub(crate) async fn token(&self, transport: &Transport) -> Result<String, RemoteCallError> {
        let mut current = self.current.lock().await;
        if let Some(cached) = current
            .as_ref()
            .filter(|c| Instant::now() < c.refresh_after)
        {
            return Ok(cached.value.clone());
        }

        let fresh = self.login(transport).await?;
        let value = fresh.value.clone();
        *current = Some(fresh);
        Ok(value)
    }

    /// Drops the cached token if it is still `rejected`.
    ///
    /// A token already replaced by another task is kept.
    pub(crate) async fn invalidate(&self, rejected: &str) {
        let mut current = self.current.lock().await;
        if current.as_ref().is_some_and(|c| c.value == rejected) {
            warn!("Accounting API rejected bearer token, forcing re-login");
            *current = None;
        }
    }

    async fn login(&self, transport: &Transport) -> Result<CachedToken, RemoteCallError> {
        let body = LoginRequest {
            username: &self.username,
            password: &self.password,
        };
        let request = Request::with_body(Method::POST, &["auth", "login"], &body);

        let response: LoginResponse = transport.send(&request, None).await.map_err(|e| match e {
            RemoteCallError::Status { status, body } => {
                RemoteCallError::Auth(format!("login returned {status}: {body}"))
            }
            other => other,
        })?;

        let refresh_after =
            refresh_deadline(Instant::now(), response.expires_in, self.refresh_margin);
        info!(
            expires_in_secs = response.expires_in,
            "Logged in to accounting API"
        );

        Ok(CachedToken {
            value: response.token,
            refresh_after,
        })
    }
}

/// When a token issued at `now` must be replaced.
fn refresh_deadline(now: Instant, expires_in_secs: u64, margin: Duration) -> Instant {
    let lifetime = Duration::from_secs(expires_in_secs).min(MAX_TOKEN_LIFETIME);
    now.checked_add(lifetime.saturating_sub(margin)).unwrap_or(now)
}
