//! Tool runtime trait and default registry-backed executor.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;
use rprovider::{ToolCall, ToolDefinition};

use crate::{
    NoopToolRuntimeHooks, ToolError, ToolExecutionContext, ToolExecutionResult, ToolFuture,
    ToolRegistry, ToolRuntimeHooks, parse_arguments,
};

pub trait ToolRuntime: Send + Sync {
    /// Tools declared to the backend on every round.
    fn definitions(&self) -> Vec<ToolDefinition>;

    fn execute<'a>(
        &'a self,
        tool_call: ToolCall,
        context: ToolExecutionContext,
    ) -> ToolFuture<'a, Result<ToolExecutionResult, ToolError>>;
}

#[derive(Clone)]
pub struct DefaultToolRuntime {
    registry: Arc<ToolRegistry>,
    hooks: Arc<dyn ToolRuntimeHooks>,
}

impl Default for DefaultToolRuntime {
    fn default() -> Self {
        Self::new(Arc::new(ToolRegistry::new()))
    }
}

impl DefaultToolRuntime {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            hooks: Arc::new(NoopToolRuntimeHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn registry(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.registry)
    }

    async fn invoke(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
    ) -> Result<ToolExecutionResult, ToolError> {
        let Some(tool) = self.registry.get(&tool_call.tool_id) else {
            let available = self.registry.ids();
            self.hooks.on_unknown_tool(tool_call, &available);
            return Err(ToolError::not_found(format!(
                "invalid tool id '{}', available options are: {}",
                tool_call.tool_id,
                available.join(", ")
            )));
        };

        self.hooks.on_execution_start(tool_call, context);
        let started = Instant::now();

        let outcome = match parse_arguments(&tool_call.raw_arguments) {
            Ok(args) => AssertUnwindSafe(async { tool.invoke(args, context).await })
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| {
                    Err(ToolError::execution(format!(
                        "tool panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                }),
            Err(error) => Err(error),
        };

        match outcome {
            Ok(output) => {
                let result = ToolExecutionResult::from_call(tool_call, output);
                self.hooks
                    .on_execution_success(tool_call, context, &result, started.elapsed());
                Ok(result)
            }
            Err(error) => {
                self.hooks
                    .on_execution_failure(tool_call, context, &error, started.elapsed());
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for DefaultToolRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultToolRuntime")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl ToolRuntime for DefaultToolRuntime {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    fn execute<'a>(
        &'a self,
        tool_call: ToolCall,
        context: ToolExecutionContext,
    ) -> ToolFuture<'a, Result<ToolExecutionResult, ToolError>> {
        Box::pin(async move {
            self.invoke(&tool_call, &context).await.map_err(|error| {
                error
                    .with_tool_id(tool_call.tool_id.clone())
                    .with_tool_call_id(tool_call.id.clone())
            })
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
