//! Wiring helpers for config-driven and observed chats.
//!
//! ```rust
//! use ragged::{TracingObservabilityHooks, chat_builder_from_config, observed};
//! use ragged::ProviderConfig;
//!
//! # fn demo() -> Result<(), ragged::ChatError> {
//! let config = ProviderConfig::from_json(r#"{"provider": "ollama", "model": "llama3.2"}"#)?;
//! let chat = observed(chat_builder_from_config(&config)?, TracingObservabilityHooks)
//!     .system_prompt("Be brief.")
//!     .build();
//! assert!(chat.history().is_empty());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::{
    Chat, ChatBuilder, ChatError, ChatRuntimeHooks, ProviderConfig, ProviderOperationHooks,
    SafeChatHooks, SafeProviderHooks, SafeToolHooks, ToolRuntimeHooks,
};

/// Builds the configured provider and returns a builder for adding tools, hooks and prompts.
pub fn chat_builder_from_config(config: &ProviderConfig) -> Result<ChatBuilder, ChatError> {
    Ok(Chat::builder(config.build()?))
}

/// Same as [`chat_builder_from_config`], with provider calls reported to `hooks`.
pub fn chat_builder_from_config_with_hooks<H>(
    config: &ProviderConfig,
    hooks: H,
) -> Result<ChatBuilder, ChatError>
where
    H: ProviderOperationHooks + 'static,
{
    let provider = config.build_with_hooks(Arc::new(SafeProviderHooks::new(hooks)))?;
    Ok(Chat::builder(provider))
}

/// Parses a tagged provider config (`{"provider": "openai", ...}`) into a ready chat.
pub fn chat_from_json_config(json: &str) -> Result<Chat, ChatError> {
    let config = ProviderConfig::from_json(json)?;
    Ok(chat_builder_from_config(&config)?.build())
}

/// Attaches `hooks` to both the chat loop and the tool runtime, isolated from panics.
pub fn observed<H>(builder: ChatBuilder, hooks: H) -> ChatBuilder
where
    H: ChatRuntimeHooks + ToolRuntimeHooks + Clone + 'static,
{
    builder
        .tool_hooks(Arc::new(SafeToolHooks::new(hooks.clone())))
        .hooks(Arc::new(SafeChatHooks::new(hooks)))
}
