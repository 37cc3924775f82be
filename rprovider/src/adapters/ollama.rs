//! Ollama provider implemented over the OpenAI-compatible chat-completions endpoint.

use std::sync::Arc;

use crate::adapters::openai::{OpenAiMapper, OpenAiProvider};
use crate::{
    BoxedEventStream, ChatProvider, ChatRequest, ChatResponse, ProviderError, ProviderFuture,
    ProviderId, ProviderOperationHooks, Transport,
};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.2";

/// Local model server. No API key is sent.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    inner: OpenAiProvider,
}

impl OllamaProvider {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let mapper = OpenAiMapper::new(ProviderId::Ollama, OLLAMA_DEFAULT_MODEL);
        Self {
            inner: OpenAiProvider::new(transport, None).with_mapper(mapper),
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.inner = self.inner.with_default_model(model);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.inner = self.inner.with_hooks(hooks);
        self
    }

    pub fn default_http_transport(client: reqwest::Client) -> crate::HttpTransport {
        crate::HttpTransport::new(client, OLLAMA_BASE_URL)
    }
}

impl ChatProvider for OllamaProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Ollama
    }

    fn chat<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<ChatResponse, ProviderError>> {
        self.inner.chat(request)
    }

    fn chat_stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        self.inner.chat_stream(request)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::Message;
    use crate::adapters::fakes::FakeTransport;

    #[tokio::test]
    async fn ollama_uses_local_defaults_without_credentials() {
        let transport = Arc::new(FakeTransport::default().with_response(Ok(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"},
                "finish_reason": "stop"}]
        }))));
        let provider = OllamaProvider::new(transport.clone());

        let response = provider
            .chat(ChatRequest::new(vec![Message::user("hello")]))
            .await
            .expect("chat should succeed");

        assert_eq!(response.provider, ProviderId::Ollama);
        assert_eq!(response.model, OLLAMA_DEFAULT_MODEL);

        let sent = transport.sent();
        assert!(sent[0].auth.is_none());
        assert_eq!(sent[0].body["model"], OLLAMA_DEFAULT_MODEL);
    }

    #[test]
    fn default_transport_targets_local_server() {
        let transport = OllamaProvider::default_http_transport(reqwest::Client::new());
        assert_eq!(transport.base_url(), OLLAMA_BASE_URL);
    }
}
