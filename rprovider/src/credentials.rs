//! Redacted in-memory secrets and API-key resolution.

use serde::{Deserialize, Deserializer};

use crate::ProviderError;

#[derive(Clone, PartialEq, Eq)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        // Zero bytes keep the buffer valid UTF-8.
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Picks the configured key, falling back to the first non-empty environment variable.
pub fn resolve_api_key(
    configured: Option<SecretString>,
    env_vars: &[&str],
) -> Result<SecretString, ProviderError> {
    if let Some(key) = configured
        && !key.is_empty()
    {
        return Ok(key);
    }

    env_vars
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(SecretString::new)
        .find(|key| !key.is_empty())
        .ok_or_else(|| {
            ProviderError::authentication(format!(
                "api key must not be empty (set it in config or via {})",
                env_vars.join(" / ")
            ))
        })
}
