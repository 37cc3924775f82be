//! Chat-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use rprovider::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    Provider,
    Cancelled,
    Channel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    provider_error: Option<ProviderError>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider_error: None,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn provider(error: ProviderError) -> Self {
        Self {
            kind: ChatErrorKind::Provider,
            message: error.to_string(),
            provider_error: Some(error),
        }
    }

    pub fn cancelled(round: u32) -> Self {
        Self::new(
            ChatErrorKind::Cancelled,
            format!("run cancelled during round {round}"),
        )
    }

    pub fn channel(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Channel, message)
    }

    /// The backend failure with its original classification, for provider errors.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        self.provider_error.as_ref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ChatErrorKind::Cancelled
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.provider_error
            .as_ref()
            .map(|error| error as &(dyn Error + 'static))
    }
}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        ChatError::provider(value)
    }
}
