//! The public conversation facade: owns history and the recording switch, and runs each call
//! through a [`ToolOrchestrator`].
//!
//! ```rust
//! use rchat::Chat;
//! use rprovider::{ChatRequest, ChatResponse, Message, ProviderId};
//!
//! # async fn demo() -> Result<(), rchat::ChatError> {
//! let mut chat = Chat::from_fn(|request: ChatRequest| async move {
//!     let heard = request.history.last().map(|m| m.text.clone()).unwrap_or_default();
//!     Ok(ChatResponse::new(ProviderId::Custom, "echo", vec![Message::bot(heard)]))
//! });
//!
//! let reply = chat.chat("Hello, how are you?").await?;
//! assert_eq!(reply.text(), "Hello, how are you?");
//! assert_eq!(chat.history().len(), 2);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use rcommon::ConversationId;
use rprovider::{
    ChatProvider, ChatRequest, ChatResponse, FnProvider, Message, ProviderConfig, ProviderError,
};
use rtooling::{DefaultToolRuntime, Tool, ToolRegistry, ToolRuntime, ToolRuntimeHooks};
use tokio_util::sync::CancellationToken;

use crate::{
    ChatCallOptions, ChatError, ChatEventSender, ChatInput, ChatPolicy, ChatReply,
    ChatRuntimeHooks, HistoryMode, RunOutcome, ToolOrchestrator,
};

pub struct Chat {
    orchestrator: ToolOrchestrator,
    system_prompt: Option<String>,
    model: Option<String>,
    history: Vec<Message>,
    recording: bool,
}

impl Chat {
    pub fn new<P>(provider: P) -> Self
    where
        P: ChatProvider + 'static,
    {
        Self::builder(Arc::new(provider)).build()
    }

    /// Accepts any async function with the chat contract as the backend.
    pub fn from_fn<F, Fut>(handler: F) -> Self
    where
        F: Fn(ChatRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ChatResponse, ProviderError>> + Send + 'static,
    {
        Self::new(FnProvider::new(handler))
    }

    pub fn from_config(config: &ProviderConfig) -> Result<Self, ChatError> {
        Ok(Self::builder(config.build()?).build())
    }

    pub fn builder(provider: Arc<dyn ChatProvider>) -> ChatBuilder {
        ChatBuilder::new(provider)
    }

    pub async fn chat(&mut self, input: impl Into<ChatInput>) -> Result<ChatReply, ChatError> {
        self.chat_with(input, ChatCallOptions::default()).await
    }

    pub async fn chat_with(
        &mut self,
        input: impl Into<ChatInput>,
        options: ChatCallOptions,
    ) -> Result<ChatReply, ChatError> {
        let call = self.prepare(input.into(), options)?;
        let outcome = call.orchestrator.run(call.request, &call.cancel).await?;
        Ok(self.complete(call.input, outcome, call.mode))
    }

    /// Streams every round into `sender`. The caller drains the paired receiver concurrently.
    pub async fn chat_stream(
        &mut self,
        input: impl Into<ChatInput>,
        sender: &mut ChatEventSender,
    ) -> Result<ChatReply, ChatError> {
        self.chat_stream_with(input, ChatCallOptions::default(), sender)
            .await
    }

    pub async fn chat_stream_with(
        &mut self,
        input: impl Into<ChatInput>,
        options: ChatCallOptions,
        sender: &mut ChatEventSender,
    ) -> Result<ChatReply, ChatError> {
        let call = self.prepare(input.into(), options)?;
        let outcome = call
            .orchestrator
            .run_streaming(call.request, &call.cancel, sender)
            .await?;
        Ok(self.complete(call.input, outcome, call.mode))
    }

    /// While disabled, calls read the frozen history but never extend it.
    pub fn record(&mut self, enabled: bool) {
        self.recording = enabled;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn conversation_id(&self) -> &ConversationId {
        self.orchestrator.conversation_id()
    }

    fn prepare(
        &self,
        input: ChatInput,
        options: ChatCallOptions,
    ) -> Result<PreparedCall, ChatError> {
        let input = input.into_messages();
        if input.is_empty() {
            return Err(ChatError::invalid_request(
                "chat input must contain at least one message",
            ));
        }

        let mut history = Vec::with_capacity(self.history.len() + input.len() + 1);
        if let Some(system_prompt) = &self.system_prompt {
            history.push(Message::system(system_prompt.clone()));
        }
        history.extend(self.history.iter().cloned());
        history.extend(input.iter().cloned());

        let mut request = ChatRequest::new(history)
            .with_tool_choice(options.tool_choice)
            .with_options(options.generation);
        request.overrides = options.overrides;
        if let Some(model) = options.model.or_else(|| self.model.clone()) {
            request = request.with_model(model);
        }

        let mut policy = self.orchestrator.policy();
        if let Some(max_rounds) = options.max_rounds {
            policy = policy.with_max_rounds(max_rounds);
        }
        let mode = options.history_mode.unwrap_or(policy.history_mode);

        Ok(PreparedCall {
            input,
            request,
            orchestrator: self.orchestrator.clone().with_policy(policy),
            cancel: options.cancellation.unwrap_or_default(),
            mode,
        })
    }

    fn complete(
        &mut self,
        input: Vec<Message>,
        outcome: RunOutcome,
        mode: HistoryMode,
    ) -> ChatReply {
        let messages = match mode {
            HistoryMode::Delta => outcome.messages.clone(),
            HistoryMode::Full => self
                .history
                .iter()
                .chain(input.iter())
                .chain(outcome.messages.iter())
                .cloned()
                .collect(),
        };

        if self.recording {
            self.history.extend(input);
            self.history.extend(outcome.messages);
        }

        ChatReply {
            status: outcome.status,
            messages,
            rounds: outcome.rounds,
            stop_reason: outcome.stop_reason,
            usage: outcome.usage,
        }
    }
}

struct PreparedCall {
    input: Vec<Message>,
    request: ChatRequest,
    orchestrator: ToolOrchestrator,
    cancel: CancellationToken,
    mode: HistoryMode,
}

impl std::fmt::Debug for Chat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chat")
            .field("orchestrator", &self.orchestrator)
            .field("model", &self.model)
            .field("history_len", &self.history.len())
            .field("recording", &self.recording)
            .finish_non_exhaustive()
    }
}

pub struct ChatBuilder {
    provider: Arc<dyn ChatProvider>,
    registry: ToolRegistry,
    runtime: Option<Arc<dyn ToolRuntime>>,
    tool_hooks: Option<Arc<dyn ToolRuntimeHooks>>,
    hooks: Option<Arc<dyn ChatRuntimeHooks>>,
    policy: ChatPolicy,
    conversation_id: Option<ConversationId>,
    system_prompt: Option<String>,
    model: Option<String>,
    history: Vec<Message>,
    recording: bool,
}

impl ChatBuilder {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            provider,
            registry: ToolRegistry::new(),
            runtime: None,
            tool_hooks: None,
            hooks: None,
            policy: ChatPolicy::default(),
            conversation_id: None,
            system_prompt: None,
            model: None,
            history: Vec::new(),
            recording: true,
        }
    }

    pub fn tool<T>(mut self, tool: T) -> Self
    where
        T: Tool + 'static,
    {
        self.registry.register(tool);
        self
    }

    pub fn tools(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the registry-backed runtime entirely; registered tools are then ignored.
    pub fn tool_runtime(mut self, runtime: Arc<dyn ToolRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn tool_hooks(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.tool_hooks = Some(hooks);
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn ChatRuntimeHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn policy(mut self, policy: ChatPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_rounds(mut self, max_rounds: u32) -> Self {
        self.policy = self.policy.with_max_rounds(max_rounds);
        self
    }

    pub fn history_mode(mut self, history_mode: HistoryMode) -> Self {
        self.policy = self.policy.with_history_mode(history_mode);
        self
    }

    pub fn conversation_id(mut self, conversation_id: impl Into<ConversationId>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Sent first on every call; never stored in the history.
    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn recording(mut self, recording: bool) -> Self {
        self.recording = recording;
        self
    }

    pub fn build(self) -> Chat {
        let runtime = self.runtime.unwrap_or_else(|| {
            let runtime = DefaultToolRuntime::new(Arc::new(self.registry));
            match self.tool_hooks {
                Some(hooks) => Arc::new(runtime.with_hooks(hooks)),
                None => Arc::new(runtime),
            }
        });

        let mut orchestrator = ToolOrchestrator::new(self.provider)
            .with_tools(runtime)
            .with_policy(self.policy);
        if let Some(hooks) = self.hooks {
            orchestrator = orchestrator.with_hooks(hooks);
        }
        if let Some(conversation_id) = self.conversation_id {
            orchestrator = orchestrator.with_conversation_id(conversation_id);
        }

        Chat {
            orchestrator,
            system_prompt: self.system_prompt,
            model: self.model,
            history: self.history,
            recording: self.recording,
        }
    }
}
