//! Tool layer for the ragged conversational client: declaring tools, registering them by id
//! and executing backend-issued tool calls.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use rtooling::{DefaultToolRuntime, ToolBuilder, ToolRegistry, ToolRuntime};
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(
//!     ToolBuilder::new("ls")
//!         .description("List files")
//!         .sync_handler(|_args, _ctx| Ok("Cargo.toml".to_string())),
//! );
//!
//! let runtime = DefaultToolRuntime::new(Arc::new(registry));
//! assert_eq!(runtime.definitions()[0].id, "ls");
//! ```

mod args;
mod builder;
mod error;
mod hooks;
mod registry;
mod runtime;
mod tool;
mod types;

pub mod prelude {
    pub use crate::{
        DefaultToolRuntime, FunctionTool, Tool, ToolBuilder, ToolError, ToolErrorKind,
        ToolExecutionContext, ToolExecutionResult, ToolFuture, ToolRegistry, ToolRuntime,
    };
}

pub use args::{deserialize_arguments, parse_arguments, required_number, required_string};
pub use builder::ToolBuilder;
pub use error::{ToolError, ToolErrorKind};
pub use hooks::{NoopToolRuntimeHooks, ToolRuntimeHooks};
pub use registry::ToolRegistry;
pub use runtime::{DefaultToolRuntime, ToolRuntime};
pub use tool::{FunctionTool, Tool, ToolFuture};
pub use types::{ToolExecutionContext, ToolExecutionResult};
