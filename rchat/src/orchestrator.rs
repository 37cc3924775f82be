//! Bounded tool-calling loop over a [`ChatProvider`].
//!
//! Each round sends the accumulated history, executes every tool call the backend issued and
//! appends the results in the backend's order. Tool failures never abort a run: they become
//! tool-result messages so the model can correct itself.

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use futures_util::future::join_all;
use rcommon::ConversationId;
use rprovider::{
    ChatProvider, ChatRequest, ChatResponse, Message, ProviderError, ProviderId, StopReason,
    StreamEvent, TokenUsage, ToolCall,
};
use rtooling::{DefaultToolRuntime, ToolExecutionContext, ToolExecutionResult, ToolRuntime};
use tokio_util::sync::CancellationToken;

use crate::{
    ChatError, ChatEvent, ChatEventSender, ChatPolicy, ChatRuntimeHooks, NoopChatRuntimeHooks,
    RunOutcome, RunStatus,
};

#[derive(Clone)]
pub struct ToolOrchestrator {
    provider: Arc<dyn ChatProvider>,
    tools: Arc<dyn ToolRuntime>,
    policy: ChatPolicy,
    hooks: Arc<dyn ChatRuntimeHooks>,
    conversation_id: ConversationId,
}

impl ToolOrchestrator {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            provider,
            tools: Arc::new(DefaultToolRuntime::default()),
            policy: ChatPolicy::default(),
            hooks: Arc::new(NoopChatRuntimeHooks),
            conversation_id: ConversationId::generate(),
        }
    }

    pub fn with_tools(mut self, tools: Arc<dyn ToolRuntime>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_policy(mut self, policy: ChatPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ChatRuntimeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<ConversationId>) -> Self {
        self.conversation_id = conversation_id.into();
        self
    }

    pub fn policy(&self) -> ChatPolicy {
        self.policy
    }

    pub fn provider_id(&self) -> ProviderId {
        self.provider.id()
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    /// Runs the loop to completion or to the round limit.
    ///
    /// Cancellation drops the in-flight provider call or tool batch; nothing from the
    /// interrupted round is kept.
    pub async fn run(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, ChatError> {
        self.drive(request, cancel, None).await
    }

    /// Same loop as [`ToolOrchestrator::run`], streaming each round and forwarding every event.
    pub async fn run_streaming(
        &self,
        request: ChatRequest,
        cancel: &CancellationToken,
        sender: &mut ChatEventSender,
    ) -> Result<RunOutcome, ChatError> {
        self.drive(request, cancel, Some(sender)).await
    }

    async fn drive(
        &self,
        mut request: ChatRequest,
        cancel: &CancellationToken,
        mut sender: Option<&mut ChatEventSender>,
    ) -> Result<RunOutcome, ChatError> {
        if request.tools.is_empty() {
            request.tools = self.tools.definitions();
        }

        let initial_len = request.history.len();
        let max_rounds = self.policy.max_rounds.max(1);
        let mut tally = RunTally {
            usage: TokenUsage::default(),
            stop_reason: StopReason::Other,
            provider: self.provider.id(),
            model: request.model.clone().unwrap_or_default(),
        };

        for round in 1..=max_rounds {
            if let Some(sender) = sender.as_deref_mut() {
                sender.send(ChatEvent::RoundStarted { round }).await?;
            }
            self.hooks.on_round_start(&self.conversation_id, round);
            let started = Instant::now();

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled(round)),
                response = self.request_round(request.clone(), sender.as_deref_mut()) => response?,
            };

            tally.record(&response);

            let calls = response.tool_calls().cloned().collect::<Vec<_>>();
            let mut appended = response.history;

            if !calls.is_empty() {
                let results = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(self.cancelled(round)),
                    results = self.execute_calls(&calls, round) => results,
                };

                for result in results {
                    let message = result.into_message();
                    if let Some(sender) = sender.as_deref_mut() {
                        sender
                            .send(ChatEvent::ToolResult {
                                round,
                                message: message.clone(),
                            })
                            .await?;
                    }
                    appended.push(message);
                }
            }

            request.history.extend(appended);
            self.hooks.on_round_complete(
                &self.conversation_id,
                round,
                calls.len(),
                started.elapsed(),
            );

            let required_called = request
                .required_tool()
                .is_some_and(|required| calls.iter().any(|call| call.tool_id == required));
            if calls.is_empty() || required_called {
                let outcome =
                    tally.into_outcome(RunStatus::Finished, request.history, initial_len, round);
                return self.finish(outcome, sender).await;
            }
        }

        self.hooks
            .on_round_limit_exceeded(&self.conversation_id, max_rounds);
        if let Some(sender) = sender.as_deref_mut() {
            sender
                .send(ChatEvent::RoundLimitExceeded { max_rounds })
                .await?;
        }

        let outcome = tally.into_outcome(
            RunStatus::RoundLimitExceeded,
            request.history,
            initial_len,
            max_rounds,
        );
        self.finish(outcome, sender).await
    }

    async fn request_round(
        &self,
        request: ChatRequest,
        sender: Option<&mut ChatEventSender>,
    ) -> Result<ChatResponse, ChatError> {
        let Some(sender) = sender else {
            return Ok(self.provider.chat(request).await?);
        };

        let mut events = self.provider.chat_stream(request).await?;
        let mut finished = None;
        while let Some(event) = events.next().await {
            let event = event?;
            if let StreamEvent::Finished(response) = &event {
                finished = Some(response.clone());
            }
            sender.send(ChatEvent::Provider(event)).await?;
        }

        finished.ok_or_else(|| {
            ChatError::provider(ProviderError::protocol(
                "provider stream ended without a final response",
            ))
        })
    }

    async fn execute_calls(&self, calls: &[ToolCall], round: u32) -> Vec<ToolExecutionResult> {
        let context = ToolExecutionContext::new(self.conversation_id.clone()).with_round(round);
        let executions = calls.iter().map(|call| {
            let context = context.clone();
            async move {
                match self.tools.execute(call.clone(), context).await {
                    Ok(result) => result,
                    Err(error) => ToolExecutionResult::from_error(call, &error),
                }
            }
        });

        join_all(executions).await
    }

    fn cancelled(&self, round: u32) -> ChatError {
        self.hooks.on_cancelled(&self.conversation_id, round);
        ChatError::cancelled(round)
    }

    async fn finish(
        &self,
        outcome: RunOutcome,
        sender: Option<&mut ChatEventSender>,
    ) -> Result<RunOutcome, ChatError> {
        if let Some(sender) = sender {
            sender
                .send(ChatEvent::Completed {
                    status: outcome.status,
                    rounds: outcome.rounds,
                })
                .await?;
        }
        self.hooks.on_run_finished(&self.conversation_id, &outcome);
        Ok(outcome)
    }
}

/// Totals carried across rounds; the last response decides stop reason and model.
struct RunTally {
    usage: TokenUsage,
    stop_reason: StopReason,
    provider: ProviderId,
    model: String,
}

impl RunTally {
    fn record(&mut self, response: &ChatResponse) {
        self.usage += response.usage;
        self.stop_reason = response.stop_reason;
        self.provider = response.provider;
        self.model = response.model.clone();
    }

    fn into_outcome(
        self,
        status: RunStatus,
        history: Vec<Message>,
        initial_len: usize,
        rounds: u32,
    ) -> RunOutcome {
        RunOutcome {
            status,
            messages: history[initial_len..].to_vec(),
            history,
            rounds,
            stop_reason: self.stop_reason,
            usage: self.usage,
            provider: self.provider,
            model: self.model,
        }
    }
}

impl std::fmt::Debug for ToolOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolOrchestrator")
            .field("provider", &self.provider.id())
            .field("policy", &self.policy)
            .field("conversation_id", &self.conversation_id)
            .finish_non_exhaustive()
    }
}
