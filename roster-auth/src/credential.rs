//! Client-credentials token lifecycle.
//!
//! A [`CredentialFetcher`] owns the single cached [`Credential`] of a run.
//! Every decision to exchange happens under one mutex: a caller that finds
//! the cache stale performs the exchange while holding the lock, and any
//! concurrent caller waits for it and then reuses the fresh credential
//! instead of starting a second exchange.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::clock::{to_chrono, Clock};
use crate::error::AuthError;
use crate::transport::{ApiRequest, Method, Transport};

/// Longest slice of a response body quoted in an error.
const MAX_DETAIL_LEN: usize = 200;

/// A bearer token and the instant after which it must not be handed out.
///
/// `usable_until` already has the expiry buffer subtracted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    usable_until: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>, usable_until: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            usable_until,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn usable_until(&self) -> DateTime<Utc> {
        self.usable_until
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now < self.usable_until
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("usable_until", &self.usable_until)
            .finish()
    }
}

/// Where and as whom to exchange.
#[derive(Clone)]
pub struct ClientCredentials {
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Retry and expiry-buffer policy for token exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Total exchange attempts before giving up. Zero is treated as one.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub retry_interval: Duration,
    /// Margin subtracted from the reported lifetime.
    pub expiry_buffer: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_interval: Duration::from_secs(15),
            expiry_buffer: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Obtains and caches bearer credentials for one run.
pub struct CredentialFetcher {
    client: ClientCredentials,
    policy: TokenPolicy,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    cached: Mutex<Option<Credential>>,
}

impl CredentialFetcher {
    pub fn new(
        client: ClientCredentials,
        policy: TokenPolicy,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            policy,
            transport,
            clock,
            cached: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    /// Return the cached credential if it is outside the expiry buffer,
    /// otherwise exchange for a new one.
    pub fn fetch(&self) -> Result<Credential, AuthError> {
        let mut cached = self.lock();
        if let Some(credential) = cached.as_ref() {
            if credential.is_usable_at(self.clock.now()) {
                debug!("reusing cached credential");
                return Ok(credential.clone());
            }
            debug!(
                usable_until = %credential.usable_until,
                "cached credential inside expiry buffer"
            );
        }
        let fresh = self.exchange_with_retry()?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    /// Replace a credential the server rejected.
    ///
    /// If another caller already replaced `rejected` with a credential that is
    /// still usable, that one is returned without a new exchange.
    pub fn force_refresh(&self, rejected: &Credential) -> Result<Credential, AuthError> {
        let mut cached = self.lock();
        if let Some(current) = cached.as_ref() {
            if current.token != rejected.token && current.is_usable_at(self.clock.now()) {
                debug!("credential already refreshed by another caller");
                return Ok(current.clone());
            }
        }
        *cached = None;
        let fresh = self.exchange_with_retry()?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Credential>> {
        self.cached.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn exchange_with_retry(&self) -> Result<Credential, AuthError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.exchange_once() {
                Ok(credential) => {
                    info!(attempt, usable_until = %credential.usable_until, "obtained credential");
                    return Ok(credential);
                }
                Err(last_error) if attempt >= max_attempts => {
                    warn!(attempt, error = %last_error, "token exchange failed; giving up");
                    return Err(AuthError {
                        attempts: attempt,
                        last_error,
                    });
                }
                Err(error) => {
                    warn!(
                        attempt,
                        error = %error,
                        retry_in_secs = self.policy.retry_interval.as_secs(),
                        "token exchange failed; retrying"
                    );
                    self.clock.sleep(self.policy.retry_interval);
                    attempt += 1;
                }
            }
        }
    }

    fn exchange_once(&self) -> Result<Credential, String> {
        let issued_at = self.clock.now();
        let request = ApiRequest::new(Method::Post, &self.client.token_endpoint).form(&[
            ("grant_type", "client_credentials"),
            ("client_id", self.client.client_id.as_str()),
            ("client_secret", self.client.client_secret.as_str()),
            ("response_type", "token"),
        ]);

        let response = self.transport.send(&request).map_err(|e| e.to_string())?;
        if !response.is_success() {
            return Err(format!(
                "token endpoint returned {}: {}",
                response.status,
                truncate(&response.body)
            ));
        }

        let parsed: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| format!("malformed token response: {e}"))?;
        if parsed.access_token.is_empty() {
            return Err("token endpoint returned an empty access token".to_string());
        }

        let lifetime = Duration::from_secs(parsed.expires_in);
        let effective = lifetime.saturating_sub(self.policy.expiry_buffer);
        if effective.is_zero() {
            warn!(
                expires_in = parsed.expires_in,
                buffer_secs = self.policy.expiry_buffer.as_secs(),
                "token lifetime does not exceed the expiry buffer; it will be refreshed on every use"
            );
        }
        let usable_until = issued_at
            .checked_add_signed(to_chrono(effective))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Ok(Credential::new(parsed.access_token, usable_until))
    }
}

fn truncate(body: &str) -> &str {
    match body.char_indices().nth(MAX_DETAIL_LEN) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}
