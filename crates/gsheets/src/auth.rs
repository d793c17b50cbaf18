//! Credential providers.
//!
//! A [`CredentialProvider`] yields the header to attach to every request.
//! How tokens are obtained (service account, OAuth flow, metadata server)
//! is left to a [`TokenSource`]; [`RefreshingCredentials`] caches its tokens
//! and refreshes them with at most one fetch in flight.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::transport::BoxFuture;

/// An HTTP header carrying credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub name: String,
    pub value: String,
}

impl AuthHeader {
    pub fn bearer(token: &str) -> Self {
        Self {
            name: "authorization".to_string(),
            value: format!("Bearer {token}"),
        }
    }

    pub fn api_key(key: &str) -> Self {
        Self {
            name: "x-goog-api-key".to_string(),
            value: key.to_string(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct AuthError(pub String);

pub trait CredentialProvider: Send + Sync {
    fn auth_header(&self) -> BoxFuture<'_, Result<AuthHeader, AuthError>>;
}

/// API key auth. Read-only access to public documents.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(..)")
    }
}

impl CredentialProvider for ApiKey {
    fn auth_header(&self) -> BoxFuture<'_, Result<AuthHeader, AuthError>> {
        Box::pin(async move { Ok(AuthHeader::api_key(&self.0)) })
    }
}

/// A fixed bearer token, managed by the caller.
#[derive(Clone)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

impl CredentialProvider for BearerToken {
    fn auth_header(&self) -> BoxFuture<'_, Result<AuthHeader, AuthError>> {
        Box::pin(async move { Ok(AuthHeader::bearer(&self.0)) })
    }
}

/// An OAuth access token with its expiry
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// `None` means the token does not expire
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Whether the token expires within `margin` of `now`
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - margin <= now,
            None => false,
        }
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"..")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Fetches fresh access tokens
pub trait TokenSource: Send + Sync {
    fn fetch_token(&self) -> BoxFuture<'_, Result<AccessToken, AuthError>>;
}

/// Caches tokens from a [`TokenSource`] and refreshes them before expiry.
///
/// Concurrent callers that find the token stale wait on the same refresh
/// instead of each fetching their own.
pub struct RefreshingCredentials<S> {
    source: S,
    cached: Mutex<Option<AccessToken>>,
    refresh_margin: Duration,
    refreshes: AtomicU64,
}

impl<S: TokenSource> RefreshingCredentials<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cached: Mutex::new(None),
            refresh_margin: Duration::seconds(60),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Refresh tokens this long before they expire (default 60s)
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Number of tokens fetched so far
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Drop the cached token so the next request fetches a new one
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

impl<S> fmt::Debug for RefreshingCredentials<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshingCredentials")
            .field("refresh_margin", &self.refresh_margin)
            .field("refreshes", &self.refreshes.load(Ordering::Relaxed))
            .finish()
    }
}

impl<S: TokenSource> CredentialProvider for RefreshingCredentials<S> {
    fn auth_header(&self) -> BoxFuture<'_, Result<AuthHeader, AuthError>> {
        Box::pin(async move {
            // Held across the fetch: later callers wait and reuse the result.
            let mut cached = self.cached.lock().await;
            if let Some(token) = cached.as_ref() {
                if !token.expires_within(Utc::now(), self.refresh_margin) {
                    return Ok(AuthHeader::bearer(&token.token));
                }
            }

            tracing::debug!("refreshing access token");
            let token = self.source.fetch_token().await?;
            self.refreshes.fetch_add(1, Ordering::Relaxed);
            let header = AuthHeader::bearer(&token.token);
            *cached = Some(token);
            Ok(header)
        })
    }
}
