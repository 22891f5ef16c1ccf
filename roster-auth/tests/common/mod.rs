//! Scripted transport shared by the fetcher and gateway tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use roster_auth::{
    ApiRequest, ApiResponse, ClientCredentials, CredentialFetcher, Gateway, ManualClock,
    TokenPolicy, Transport, TransportError,
};

pub const TOKEN_URL: &str = "https://uaa.test/oauth/token";

/// What the token endpoint does on one exchange.
pub enum TokenReply {
    /// Issue a fresh token with this lifetime in seconds.
    Grant(u64),
    Status(u16),
    Unreachable,
}

#[derive(Default)]
struct Script {
    token_replies: VecDeque<TokenReply>,
    api_replies: VecDeque<ApiResponse>,
    exchanges: usize,
    issued: usize,
    api_calls: Vec<ApiRequest>,
}

/// Replays queued replies. When a queue is empty the token endpoint grants a
/// one-hour token and the API answers `200 {}`.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_token(&self, reply: TokenReply) {
        self.script.lock().unwrap().token_replies.push_back(reply);
    }

    pub fn push_api(&self, status: u16, body: &str) {
        self.script
            .lock()
            .unwrap()
            .api_replies
            .push_back(ApiResponse::new(status, body));
    }

    pub fn exchanges(&self) -> usize {
        self.script.lock().unwrap().exchanges
    }

    pub fn api_calls(&self) -> Vec<ApiRequest> {
        self.script.lock().unwrap().api_calls.clone()
    }

    /// Bearer token presented on each API call, in order.
    pub fn bearers(&self) -> Vec<String> {
        self.api_calls()
            .into_iter()
            .map(|c| c.bearer.unwrap_or_default())
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut script = self.script.lock().unwrap();
        if request.url == TOKEN_URL {
            script.exchanges += 1;
            return match script.token_replies.pop_front().unwrap_or(TokenReply::Grant(3600)) {
                TokenReply::Grant(expires_in) => {
                    script.issued += 1;
                    Ok(ApiResponse::new(
                        200,
                        format!(
                            r#"{{"access_token":"token-{}","token_type":"bearer","expires_in":{expires_in}}}"#,
                            script.issued
                        ),
                    ))
                }
                TokenReply::Status(status) => {
                    Ok(ApiResponse::new(status, r#"{"error":"unauthorized"}"#))
                }
                TokenReply::Unreachable => Err(TransportError("connection refused".into())),
            };
        }
        script.api_calls.push(request.clone());
        Ok(script
            .api_replies
            .pop_front()
            .unwrap_or_else(|| ApiResponse::new(200, "{}")))
    }
}

pub fn start() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
}

pub fn policy(max_attempts: u32, expiry_buffer_secs: u64) -> TokenPolicy {
    TokenPolicy {
        max_attempts,
        retry_interval: Duration::from_secs(15),
        expiry_buffer: Duration::from_secs(expiry_buffer_secs),
    }
}

pub fn fetcher(
    transport: &Arc<ScriptedTransport>,
    clock: &Arc<ManualClock>,
    policy: TokenPolicy,
) -> CredentialFetcher {
    CredentialFetcher::new(
        ClientCredentials {
            token_endpoint: TOKEN_URL.to_string(),
            client_id: "admin".to_string(),
            client_secret: "s3cret".to_string(),
        },
        policy,
        transport.clone(),
        clock.clone(),
    )
}

pub fn gateway(transport: &Arc<ScriptedTransport>, clock: &Arc<ManualClock>) -> Gateway {
    Gateway::new(fetcher(transport, clock, policy(3, 30)), transport.clone())
}
