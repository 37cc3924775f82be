//! Shared provider error kinds and error value helpers.
//!
//! ```rust
//! use rprovider::{ProviderError, ProviderErrorKind};
//!
//! let auth = ProviderError::from_status(401, "bad key");
//! assert_eq!(auth.kind, ProviderErrorKind::Authentication);
//! assert!(!auth.retryable);
//!
//! let server = ProviderError::from_status(500, "boom");
//! assert_eq!(server.kind, ProviderErrorKind::Server);
//! assert_eq!(server.status, Some(500));
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Authentication,
    RateLimited,
    InvalidRequest,
    Timeout,
    Connection,
    Server,
    /// Canonical and wire shapes cannot be reconciled. Raised before any network call.
    Mapping,
    /// The backend emitted fragments or payloads this layer cannot interpret.
    Protocol,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
    pub status: Option<u16>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            status: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message, false)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message, true)
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Connection, message, true)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Server, message, true)
    }

    pub fn mapping(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Mapping, message, false)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Protocol, message, false)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, message, false)
    }

    /// Classifies a non-2xx backend status, keeping the status code on the error.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let error = match status {
            401 | 403 => Self::authentication(message),
            429 => Self::rate_limited(message),
            408 | 504 => Self::timeout(message),
            400 | 404 | 409 | 413 | 422 => Self::invalid_request(message),
            500..=599 => Self::server(message),
            _ => Self::other(message),
        };

        error.with_status(status)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_mapping(&self) -> bool {
        self.kind == ProviderErrorKind::Mapping
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?} ({status}): {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ProviderError {}
