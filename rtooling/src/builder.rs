//! Declarative tool construction independent of any backend's function-calling schema.
//!
//! ```rust
//! use rtooling::{Tool, ToolBuilder, required_string};
//!
//! let tool = ToolBuilder::new("weather")
//!     .description("Current weather for a city")
//!     .string_field("city", "City name")
//!     .require("city")
//!     .boolean_field("metric", "Use metric units")
//!     .handler(|args, _ctx| async move {
//!         let city = required_string(&args, "city")?;
//!         Ok(format!("sunny in {city}"))
//!     });
//!
//! let definition = tool.definition();
//! assert_eq!(definition.id, "weather");
//! assert!(definition.input_schema.is_some());
//! ```

use std::future::Future;

use rprovider::{FieldSchema, FieldType, ToolDefinition};
use serde_json::Value;

use crate::{FunctionTool, ToolError, ToolExecutionContext};

#[derive(Debug, Clone, PartialEq)]
pub struct ToolBuilder {
    id: String,
    description: String,
    input: Option<FieldSchema>,
}

impl ToolBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            input: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds a top-level input field. The first field turns the tool into one that takes input.
    pub fn field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        let root = self.input.take().unwrap_or_else(|| FieldSchema::object(""));
        self.input = Some(root.field(name, schema));
        self
    }

    pub fn string_field(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.field(name, FieldSchema::string(description))
    }

    pub fn number_field(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.field(name, FieldSchema::number(description))
    }

    pub fn boolean_field(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.field(name, FieldSchema::boolean(description))
    }

    pub fn array_field(
        self,
        name: impl Into<String>,
        items: FieldSchema,
        description: impl Into<String>,
    ) -> Self {
        self.field(name, FieldSchema::array(items, description))
    }

    /// Marks an already-declared top-level field as required. Unknown names are ignored.
    pub fn require(mut self, name: &str) -> Self {
        if let Some(FieldSchema {
            field_type: FieldType::Object(fields),
            ..
        }) = &mut self.input
            && let Some(field) = fields.get_mut(name)
        {
            field.required = true;
        }
        self
    }

    pub fn definition(&self) -> ToolDefinition {
        let definition = ToolDefinition::new(self.id.clone(), self.description.clone());
        match &self.input {
            Some(schema) => definition.with_input_schema(schema.clone()),
            None => definition,
        }
    }

    pub fn handler<F, Fut>(self, handler: F) -> FunctionTool
    where
        F: Fn(Value, ToolExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        FunctionTool::new(self.definition(), handler)
    }

    pub fn sync_handler<F>(self, handler: F) -> FunctionTool
    where
        F: Fn(Value, ToolExecutionContext) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        FunctionTool::from_sync(self.definition(), handler)
    }
}
