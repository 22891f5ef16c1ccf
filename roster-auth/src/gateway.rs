//! Authenticated request gateway.
//!
//! Attaches the current bearer credential to every call. A response that
//! signals a stale credential triggers exactly one forced refresh and one
//! retry; every other failure surfaces immediately.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::credential::{Credential, CredentialFetcher};
use crate::error::{AuthError, CallError, HttpError, HttpErrorKind};
use crate::transport::{ApiRequest, ApiResponse, Transport};

const MAX_DETAIL_LEN: usize = 300;

/// Issues bearer-authenticated calls against both platform APIs.
pub struct Gateway {
    fetcher: CredentialFetcher,
    transport: Arc<dyn Transport>,
}

impl Gateway {
    pub fn new(fetcher: CredentialFetcher, transport: Arc<dyn Transport>) -> Self {
        Self { fetcher, transport }
    }

    /// Current credential, exchanging for one if needed.
    pub fn credential(&self) -> Result<Credential, AuthError> {
        self.fetcher.fetch()
    }

    /// Send `request` with a bearer credential and return the 2xx response.
    pub fn call(&self, request: ApiRequest) -> Result<ApiResponse, CallError> {
        let credential = self.fetcher.fetch()?;
        let response = self.send(&request, &credential)?;
        if !is_stale_credential(&response) {
            return classify(&request, response);
        }

        warn!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            "credential rejected; forcing refresh and retrying once"
        );
        let refreshed = self.fetcher.force_refresh(&credential)?;
        let retried = self.send(&request, &refreshed)?;
        if is_stale_credential(&retried) {
            return Err(error(&request, HttpErrorKind::Unauthorized, &retried).into());
        }
        classify(&request, retried)
    }

    /// [`Gateway::call`] and decode the JSON body.
    pub fn call_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, CallError> {
        let url = request.url.clone();
        let response = self.call(request)?;
        serde_json::from_str(&response.body).map_err(|source| CallError::Decode { url, source })
    }

    fn send(
        &self,
        request: &ApiRequest,
        credential: &Credential,
    ) -> Result<ApiResponse, HttpError> {
        let mut authorized = request.clone();
        authorized.bearer = Some(credential.token().to_string());
        debug!(method = %request.method, url = %request.url, "sending request");
        self.transport.send(&authorized).map_err(|err| HttpError {
            kind: HttpErrorKind::Transport,
            method: request.method,
            url: request.url.clone(),
            status: None,
            detail: err.to_string(),
        })
    }
}

/// 401 always means the credential is stale; 403 only when the body says the
/// token itself is invalid. A plain 403 is a business rejection.
fn is_stale_credential(response: &ApiResponse) -> bool {
    match response.status {
        401 => true,
        403 => {
            response.body.contains("invalid_token") || response.body.contains("InvalidAuthToken")
        }
        _ => false,
    }
}

fn classify(request: &ApiRequest, response: ApiResponse) -> Result<ApiResponse, CallError> {
    let kind = match response.status {
        200..=299 => return Ok(response),
        404 => HttpErrorKind::NotFound,
        400..=499 => HttpErrorKind::Rejected,
        _ => HttpErrorKind::ServerError,
    };
    Err(error(request, kind, &response).into())
}

fn error(request: &ApiRequest, kind: HttpErrorKind, response: &ApiResponse) -> HttpError {
    HttpError {
        kind,
        method: request.method,
        url: request.url.clone(),
        status: Some(response.status),
        detail: describe(&response.body),
    }
}

/// Prefer the platform's own error description over the raw body.
fn describe(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["description", "error_description", "message", "error"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    body.chars().take(MAX_DETAIL_LEN).collect()
}
