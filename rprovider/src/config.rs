//! Static per-provider configuration and provider construction.
//!
//! ```rust
//! use rprovider::{ProviderConfig, ProviderId};
//!
//! let config = ProviderConfig::from_json(r#"{"provider": "ollama", "model": "qwen2.5"}"#)
//!     .expect("config should parse");
//! assert_eq!(config.provider_id(), ProviderId::Ollama);
//! ```

use std::sync::Arc;
#[cfg(feature = "http")]
use std::time::Duration;

use serde::Deserialize;

use crate::{
    ChatProvider, NoopOperationHooks, ProviderError, ProviderId, ProviderOperationHooks,
    SecretString,
};

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const COHERE_API_KEY_ENVS: [&str; 2] = ["COHERE_API_KEY", "CO_API_KEY"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// No timeout is applied when absent.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssistantsConfig {
    pub assistant_id: String,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CohereConfig {
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OllamaConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Provider selection by configuration tag. Dispatch is a plain variant match.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "provider")]
pub enum ProviderConfig {
    #[serde(rename = "openai")]
    OpenAi(OpenAiConfig),
    #[serde(rename = "openai-assistants")]
    OpenAiAssistants(AssistantsConfig),
    #[serde(rename = "cohere")]
    Cohere(CohereConfig),
    #[serde(rename = "ollama")]
    Ollama(OllamaConfig),
}

impl ProviderConfig {
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        serde_json::from_str(json)
            .map_err(|err| ProviderError::invalid_request(format!("invalid provider config: {err}")))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ProviderError> {
        serde_json::from_value(value)
            .map_err(|err| ProviderError::invalid_request(format!("invalid provider config: {err}")))
    }

    pub fn provider_id(&self) -> ProviderId {
        match self {
            Self::OpenAi(_) => ProviderId::OpenAi,
            Self::OpenAiAssistants(_) => ProviderId::OpenAiAssistants,
            Self::Cohere(_) => ProviderId::Cohere,
            Self::Ollama(_) => ProviderId::Ollama,
        }
    }

    /// Resolves credentials and builds the provider over a reqwest transport.
    pub fn build(&self) -> Result<Arc<dyn ChatProvider>, ProviderError> {
        self.build_with_hooks(Arc::new(NoopOperationHooks))
    }

    /// Like [`ProviderConfig::build`], reporting every backend call to `hooks`.
    pub fn build_with_hooks(
        &self,
        hooks: Arc<dyn ProviderOperationHooks>,
    ) -> Result<Arc<dyn ChatProvider>, ProviderError> {
        match self {
            Self::OpenAi(config) => build_openai(config, hooks),
            Self::OpenAiAssistants(config) => build_assistants(config, hooks),
            Self::Cohere(config) => build_cohere(config, hooks),
            Self::Ollama(config) => build_ollama(config, hooks),
        }
    }
}

#[cfg(feature = "http")]
fn http_transport(
    base_url: Option<&str>,
    default_base_url: &str,
    timeout_secs: Option<u64>,
) -> Result<crate::HttpTransport, ProviderError> {
    let mut client = reqwest::Client::builder();
    if let Some(timeout_secs) = timeout_secs {
        client = client.timeout(Duration::from_secs(timeout_secs));
    }

    let client = client
        .build()
        .map_err(|err| ProviderError::invalid_request(format!("failed to build client: {err}")))?;

    Ok(crate::HttpTransport::new(
        client,
        base_url.unwrap_or(default_base_url),
    ))
}

#[cfg(not(all(
    feature = "provider-openai",
    feature = "provider-openai-assistants",
    feature = "provider-cohere",
    feature = "provider-ollama"
)))]
fn disabled(provider: ProviderId) -> ProviderError {
    ProviderError::invalid_request(format!(
        "provider '{provider}' is not enabled in this build"
    ))
}

#[cfg(feature = "provider-openai")]
fn build_openai(
    config: &OpenAiConfig,
    hooks: Arc<dyn ProviderOperationHooks>,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    use crate::adapters::openai::{OPENAI_BASE_URL, OpenAiProvider};

    let api_key = crate::resolve_api_key(config.api_key.clone(), &[OPENAI_API_KEY_ENV])?;
    let transport = http_transport(
        config.base_url.as_deref(),
        OPENAI_BASE_URL,
        config.timeout_secs,
    )?;
    let mut provider = OpenAiProvider::new(Arc::new(transport), Some(api_key));
    if let Some(model) = &config.model {
        provider = provider.with_default_model(model);
    }

    Ok(Arc::new(provider.with_hooks(hooks)))
}

#[cfg(not(feature = "provider-openai"))]
fn build_openai(
    _config: &OpenAiConfig,
    _hooks: Arc<dyn ProviderOperationHooks>,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    Err(disabled(ProviderId::OpenAi))
}

#[cfg(feature = "provider-openai-assistants")]
fn build_assistants(
    config: &AssistantsConfig,
    hooks: Arc<dyn ProviderOperationHooks>,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    use crate::adapters::assistants::AssistantsProvider;
    use crate::adapters::openai::OPENAI_BASE_URL;

    let api_key = crate::resolve_api_key(config.api_key.clone(), &[OPENAI_API_KEY_ENV])?;
    let transport = http_transport(
        config.base_url.as_deref(),
        OPENAI_BASE_URL,
        config.timeout_secs,
    )?;
    let mut provider =
        AssistantsProvider::new(Arc::new(transport), api_key, config.assistant_id.clone());
    if let Some(model) = &config.model {
        provider = provider.with_default_model(model);
    }

    Ok(Arc::new(provider.with_hooks(hooks)))
}

#[cfg(not(feature = "provider-openai-assistants"))]
fn build_assistants(
    _config: &AssistantsConfig,
    _hooks: Arc<dyn ProviderOperationHooks>,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    Err(disabled(ProviderId::OpenAiAssistants))
}

#[cfg(feature = "provider-cohere")]
fn build_cohere(
    config: &CohereConfig,
    hooks: Arc<dyn ProviderOperationHooks>,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    use crate::adapters::cohere::{COHERE_BASE_URL, CohereProvider};

    let api_key = crate::resolve_api_key(config.api_key.clone(), &COHERE_API_KEY_ENVS)?;
    let transport = http_transport(
        config.base_url.as_deref(),
        COHERE_BASE_URL,
        config.timeout_secs,
    )?;
    let mut provider = CohereProvider::new(Arc::new(transport), api_key);
    if let Some(model) = &config.model {
        provider = provider.with_default_model(model);
    }

    Ok(Arc::new(provider.with_hooks(hooks)))
}

#[cfg(not(feature = "provider-cohere"))]
fn build_cohere(
    _config: &CohereConfig,
    _hooks: Arc<dyn ProviderOperationHooks>,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    Err(disabled(ProviderId::Cohere))
}

#[cfg(feature = "provider-ollama")]
fn build_ollama(
    config: &OllamaConfig,
    hooks: Arc<dyn ProviderOperationHooks>,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    use crate::adapters::ollama::{OLLAMA_BASE_URL, OllamaProvider};

    let transport = http_transport(
        config.base_url.as_deref(),
        OLLAMA_BASE_URL,
        config.timeout_secs,
    )?;
    let mut provider = OllamaProvider::new(Arc::new(transport));
    if let Some(model) = &config.model {
        provider = provider.with_default_model(model);
    }

    Ok(Arc::new(provider.with_hooks(hooks)))
}

#[cfg(not(feature = "provider-ollama"))]
fn build_ollama(
    _config: &OllamaConfig,
    _hooks: Arc<dyn ProviderOperationHooks>,
) -> Result<Arc<dyn ChatProvider>, ProviderError> {
    Err(disabled(ProviderId::Ollama))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn tagged_configs_parse_per_provider() {
        let openai = ProviderConfig::from_json(
            r#"{"provider": "openai", "api_key": "sk-test", "model": "gpt-4.1", "timeout_secs": 30}"#,
        )
        .expect("openai config should parse");
        assert_eq!(openai.provider_id(), ProviderId::OpenAi);

        let assistants = ProviderConfig::from_json(
            r#"{"provider": "openai-assistants", "assistant_id": "asst_1"}"#,
        )
        .expect("assistants config should parse");
        assert_eq!(assistants.provider_id(), ProviderId::OpenAiAssistants);

        let cohere = ProviderConfig::from_json(r#"{"provider": "cohere"}"#)
            .expect("cohere config should parse");
        assert_eq!(cohere.provider_id(), ProviderId::Cohere);
    }

    #[test]
    fn unknown_tag_and_unknown_fields_are_rejected() {
        let error = ProviderConfig::from_json(r#"{"provider": "bard"}"#)
            .expect_err("unknown provider should fail");
        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);

        let error = ProviderConfig::from_json(r#"{"provider": "ollama", "api_token": "x"}"#)
            .expect_err("unknown field should fail");
        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
    }

    #[test]
    fn api_key_is_redacted_in_debug_output() {
        let config = ProviderConfig::from_json(r#"{"provider": "openai", "api_key": "sk-live"}"#)
            .expect("config should parse");
        assert!(!format!("{config:?}").contains("sk-live"));
    }

    #[cfg(feature = "provider-ollama")]
    #[test]
    fn ollama_builds_without_credentials() {
        let provider = ProviderConfig::Ollama(OllamaConfig::default())
            .build()
            .expect("ollama should build");
        assert_eq!(provider.id(), ProviderId::Ollama);
    }

    #[cfg(feature = "provider-openai")]
    #[test]
    fn configured_key_builds_openai_provider() {
        let provider = ProviderConfig::OpenAi(OpenAiConfig {
            api_key: Some(SecretString::new("sk-test")),
            ..OpenAiConfig::default()
        })
        .build()
        .expect("openai should build");
        assert_eq!(provider.id(), ProviderId::OpenAi);
    }
}
