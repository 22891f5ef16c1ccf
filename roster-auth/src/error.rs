//! Error types for roster-auth.

use std::fmt;

use thiserror::Error;

use crate::transport::Method;

/// The token exchange kept failing until the retry budget ran out.
///
/// Fatal for a run: no further API call can succeed without a credential.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("token exchange failed after {attempts} attempt(s): {last_error}")]
pub struct AuthError {
    pub attempts: u32,
    pub last_error: String,
}

/// Classification of a failed API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    /// The bearer credential was rejected, even after one forced refresh.
    Unauthorized,
    NotFound,
    /// Any other 4xx: a business-level rejection, never retried.
    Rejected,
    ServerError,
    /// The request never produced an HTTP response.
    Transport,
}

impl fmt::Display for HttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpErrorKind::Unauthorized => write!(f, "unauthorized"),
            HttpErrorKind::NotFound => write!(f, "not found"),
            HttpErrorKind::Rejected => write!(f, "rejected"),
            HttpErrorKind::ServerError => write!(f, "server error"),
            HttpErrorKind::Transport => write!(f, "transport error"),
        }
    }
}

/// A single API call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{method} {url}: {kind}{}: {detail}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
pub struct HttpError {
    pub kind: HttpErrorKind,
    pub method: Method,
    pub url: String,
    pub status: Option<u16>,
    pub detail: String,
}

impl HttpError {
    pub fn is_not_found(&self) -> bool {
        self.kind == HttpErrorKind::NotFound
    }
}

/// Failure to produce any HTTP response at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Everything a gateway call can fail with.
#[derive(Debug, Error)]
pub enum CallError {
    /// Credential could not be obtained. Callers must abort the run.
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Http(#[from] HttpError),

    /// The call succeeded but its body did not match the expected shape.
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CallError {
    /// `true` when the remote reported the resource as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CallError::Http(err) if err.is_not_found())
    }
}
