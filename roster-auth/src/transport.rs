//! Outbound HTTP seam.
//!
//! Everything that leaves the process goes through [`Transport::send`], so
//! tests can substitute a scripted or in-memory platform. [`UreqTransport`]
//! is the production implementation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::TransportError;

/// HTTP verbs used by the platform APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }

    /// `true` for verbs that change remote state.
    pub fn is_mutating(self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Form(Vec<(String, String)>),
}

/// A fully described outbound request.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    /// Query pairs, encoded by the transport.
    pub query: Vec<(String, String)>,
    pub body: Option<Body>,
    pub bearer: Option<String>,
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            Some(Body::Json(value)) => Some(value.to_string()),
            Some(Body::Form(_)) => Some("[form]".to_string()),
            None => None,
        };
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query", &self.query)
            .field("body", &body)
            .field("bearer", &self.bearer.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(Body::Json(body));
        self
    }

    pub fn form(mut self, pairs: &[(&str, &str)]) -> Self {
        self.body = Some(Body::Form(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        self
    }

    /// Value of a query parameter, if present.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status and body of any HTTP response, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests. Non-2xx statuses are responses, not errors.
pub trait Transport: Send + Sync {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// `ureq`-backed transport.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Build a transport. Certificate validation stays on unless
    /// `skip_tls_verification` is set.
    pub fn new(timeout: Duration, skip_tls_verification: bool) -> Result<Self, TransportError> {
        let mut builder = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("roster/", env!("CARGO_PKG_VERSION")));

        if skip_tls_verification {
            tracing::warn!(
                "TLS certificate verification is DISABLED; connections to unverifiable hosts will be accepted"
            );
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
                .map_err(|e| TransportError(format!("failed to build TLS connector: {e}")))?;
            builder = builder.tls_connector(Arc::new(connector));
        }

        Ok(Self {
            agent: builder.build(),
        })
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut req = self.agent.request(request.method.as_str(), &request.url);
        for (key, value) in &request.query {
            req = req.query(key, value);
        }
        if let Some(token) = &request.bearer {
            req = req.set("Authorization", &format!("bearer {token}"));
        }
        req = req.set("Accept", "application/json");

        let result = match &request.body {
            Some(Body::Json(value)) => req.send_json(value.clone()),
            Some(Body::Form(pairs)) => {
                let borrowed: Vec<(&str, &str)> = pairs
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect();
                req.send_form(&borrowed)
            }
            None => req.call(),
        };

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => return Err(TransportError(err.to_string())),
        };

        let status = response.status();
        let body = response
            .into_string()
            .map_err(|e| TransportError(format!("failed to read response body: {e}")))?;
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_bearer_and_form() {
        let mut request = ApiRequest::new(Method::Post, "https://uaa.example.com/oauth/token")
            .form(&[("client_secret", "hunter2")]);
        request.bearer = Some("abc.def".into());
        let rendered = format!("{request:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("abc.def"));
    }

    #[test]
    fn query_value_finds_first_match() {
        let request = ApiRequest::new(Method::Get, "https://api.example.com/v2/organizations")
            .query("q", "name:acme");
        assert_eq!(request.query_value("q"), Some("name:acme"));
        assert_eq!(request.query_value("page"), None);
    }

    #[test]
    fn only_get_is_non_mutating() {
        assert!(!Method::Get.is_mutating());
        assert!(Method::Put.is_mutating());
        assert!(Method::Post.is_mutating());
    }
}
