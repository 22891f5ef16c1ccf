//! # roster-auth
//!
//! Credential lifecycle and authenticated HTTP for the platform APIs.
//!
//! Build a [`CredentialFetcher`] over a [`Transport`] and a [`Clock`], wrap it
//! in a [`Gateway`], and send every API call through [`Gateway::call`].

pub mod clock;
pub mod credential;
pub mod error;
pub mod gateway;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credential::{ClientCredentials, Credential, CredentialFetcher, TokenPolicy};
pub use error::{AuthError, CallError, HttpError, HttpErrorKind, TransportError};
pub use gateway::Gateway;
pub use transport::{ApiRequest, ApiResponse, Body, Method, Transport, UreqTransport};
