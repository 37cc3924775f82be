//! Tool trait contract for registry-managed capabilities.
//!
//! ```rust
//! use rprovider::ToolDefinition;
//! use rtooling::{FunctionTool, Tool};
//!
//! let tool = FunctionTool::new(
//!     ToolDefinition::new("echo", "Echoes input"),
//!     |args, _ctx| async move { Ok(args.to_string()) },
//! );
//!
//! assert_eq!(tool.definition().id, "echo");
//! ```

use std::future::Future;
use std::sync::Arc;

use rcommon::BoxFuture;
use rprovider::ToolDefinition;
use serde_json::Value;

use crate::{ToolError, ToolExecutionContext};

pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

/// A callable tool. Failure is signalled only through `Err`, never through an error-shaped `Ok`.
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    fn invoke<'a>(
        &'a self,
        args: Value,
        context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, Result<String, ToolError>>;
}

type ToolHandler =
    dyn Fn(Value, ToolExecutionContext) -> ToolFuture<'static, Result<String, ToolError>>
        + Send
        + Sync;

#[derive(Clone)]
pub struct FunctionTool {
    definition: ToolDefinition,
    handler: Arc<ToolHandler>,
}

impl FunctionTool {
    pub fn new<F, Fut>(definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(Value, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        let handler: Arc<ToolHandler> =
            Arc::new(move |args, context| Box::pin(handler(args, context)));

        Self {
            definition,
            handler,
        }
    }

    pub fn from_sync<F>(definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(Value, ToolExecutionContext) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        Self::new(definition, move |args, context| {
            let output = handler(args, context);
            async move { output }
        })
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

impl Tool for FunctionTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    fn invoke<'a>(
        &'a self,
        args: Value,
        context: &'a ToolExecutionContext,
    ) -> ToolFuture<'a, Result<String, ToolError>> {
        (self.handler)(args, context.clone())
    }
}
