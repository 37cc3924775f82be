//! The chat capability every backend, and any caller-supplied substitute, implements.
//!
//! ```rust
//! use rprovider::{ChatProvider, ChatRequest, ChatResponse, FnProvider, Message, ProviderId};
//!
//! let provider = FnProvider::new(|request: ChatRequest| async move {
//!     let echoed = request.history.last().map(|m| m.text.clone()).unwrap_or_default();
//!     Ok(ChatResponse::new(ProviderId::Custom, "echo", vec![Message::bot(echoed)]))
//! });
//!
//! assert_eq!(provider.id(), ProviderId::Custom);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rcommon::BoxFuture;

use crate::{
    BoxedEventStream, ChatRequest, ChatResponse, ProviderError, ProviderId, VecEventStream,
};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait ChatProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn chat<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<ChatResponse, ProviderError>>;

    /// Streams one response. Providers without native streaming replay their `chat` result.
    fn chat_stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            let response = self.chat(request).await?;
            Ok(Box::pin(VecEventStream::replay(response)) as BoxedEventStream<'a>)
        })
    }
}

impl<P> ChatProvider for Arc<P>
where
    P: ChatProvider + ?Sized,
{
    fn id(&self) -> ProviderId {
        (**self).id()
    }

    fn chat<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<ChatResponse, ProviderError>> {
        (**self).chat(request)
    }

    fn chat_stream<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<BoxedEventStream<'a>, ProviderError>> {
        (**self).chat_stream(request)
    }
}

type ChatHandler =
    dyn Fn(ChatRequest) -> BoxFuture<'static, Result<ChatResponse, ProviderError>> + Send + Sync;

/// Adapts an async closure into a [`ChatProvider`].
#[derive(Clone)]
pub struct FnProvider {
    id: ProviderId,
    handler: Arc<ChatHandler>,
}

impl FnProvider {
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(ChatRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ChatResponse, ProviderError>> + Send + 'static,
    {
        let handler: Arc<ChatHandler> = Arc::new(move |request| Box::pin(handler(request)));

        Self {
            id: ProviderId::Custom,
            handler,
        }
    }

    pub fn with_id(mut self, id: ProviderId) -> Self {
        self.id = id;
        self
    }
}

impl ChatProvider for FnProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn chat<'a>(
        &'a self,
        request: ChatRequest,
    ) -> ProviderFuture<'a, Result<ChatResponse, ProviderError>> {
        (self.handler)(request)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;
    use crate::{Message, StreamEvent};

    fn echo_provider() -> FnProvider {
        FnProvider::new(|request: ChatRequest| async move {
            let last = request
                .history
                .last()
                .map(|message| message.text.clone())
                .unwrap_or_default();
            Ok(ChatResponse::new(
                ProviderId::Custom,
                "echo",
                vec![Message::bot(format!("echo: {last}"))],
            ))
        })
    }

    #[tokio::test]
    async fn fn_provider_invokes_closure() {
        let provider = echo_provider().with_id(ProviderId::Ollama);
        let response = provider
            .chat(ChatRequest::new(vec![Message::user("ping")]))
            .await
            .expect("chat should succeed");

        assert_eq!(provider.id(), ProviderId::Ollama);
        assert_eq!(response.text(), "echo: ping");
    }

    #[tokio::test]
    async fn default_chat_stream_replays_chat_response() {
        let provider: Arc<dyn ChatProvider> = Arc::new(echo_provider());
        let mut stream = provider
            .chat_stream(ChatRequest::new(vec![Message::user("ping")]))
            .await
            .expect("stream should open");

        let mut events = Vec::new();
        while let Some(event) = stream.next().await {
            events.push(event.expect("event should be ok"));
        }

        assert_eq!(events.first(), Some(&StreamEvent::Started));
        match events.last() {
            Some(StreamEvent::Finished(response)) => assert_eq!(response.text(), "echo: ping"),
            other => panic!("unexpected terminal event: {other:?}"),
        }
    }
}
