//! Declarative field trees describing tool input.
//!
//! ```rust
//! use rprovider::FieldSchema;
//! use serde_json::json;
//!
//! let schema = FieldSchema::object("Search arguments")
//!     .field("query", FieldSchema::string("Text to search for").required())
//!     .field("limit", FieldSchema::number("Maximum hits"));
//!
//! assert_eq!(
//!     schema.to_json_schema(),
//!     json!({
//!         "type": "object",
//!         "description": "Search arguments",
//!         "properties": {
//!             "query": {"type": "string", "description": "Text to search for"},
//!             "limit": {"type": "number", "description": "Maximum hits"}
//!         },
//!         "required": ["query"]
//!     })
//! );
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "of", rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array(Box<FieldSchema>),
    Object(IndexMap<String, FieldSchema>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub field_type: FieldType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

impl FieldSchema {
    pub fn new(field_type: FieldType, description: impl Into<String>) -> Self {
        Self {
            field_type,
            description: description.into(),
            required: false,
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::new(FieldType::String, description)
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::new(FieldType::Number, description)
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(FieldType::Boolean, description)
    }

    pub fn array(items: FieldSchema, description: impl Into<String>) -> Self {
        Self::new(FieldType::Array(Box::new(items)), description)
    }

    pub fn object(description: impl Into<String>) -> Self {
        Self::new(FieldType::Object(IndexMap::new()), description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Adds a child field. On non-object schemas the call is ignored.
    pub fn field(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        if let FieldType::Object(fields) = &mut self.field_type {
            fields.insert(name.into(), schema);
        }
        self
    }

    pub fn is_object(&self) -> bool {
        matches!(self.field_type, FieldType::Object(_))
    }

    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();
        let type_name = match &self.field_type {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array(_) => "array",
            FieldType::Object(_) => "object",
        };
        out.insert("type".to_string(), Value::from(type_name));

        if !self.description.is_empty() {
            out.insert(
                "description".to_string(),
                Value::from(self.description.clone()),
            );
        }

        match &self.field_type {
            FieldType::Array(items) => {
                out.insert("items".to_string(), items.to_json_schema());
            }
            FieldType::Object(fields) => {
                let properties = fields
                    .iter()
                    .map(|(name, field)| (name.clone(), field.to_json_schema()))
                    .collect::<Map<_, _>>();
                out.insert("properties".to_string(), Value::Object(properties));

                let required = fields
                    .iter()
                    .filter(|(_, field)| field.required)
                    .map(|(name, _)| Value::from(name.clone()))
                    .collect::<Vec<_>>();
                if !required.is_empty() {
                    out.insert("required".to_string(), Value::Array(required));
                }
            }
            FieldType::String | FieldType::Number | FieldType::Boolean => {}
        }

        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn nested_arrays_and_objects_render_recursively() {
        let schema = FieldSchema::object("")
            .field(
                "paths",
                FieldSchema::array(FieldSchema::string("A path"), "Paths to list").required(),
            )
            .field(
                "filter",
                FieldSchema::object("Filter").field("hidden", FieldSchema::boolean("")),
            );

        assert_eq!(
            schema.to_json_schema(),
            json!({
                "type": "object",
                "properties": {
                    "paths": {
                        "type": "array",
                        "description": "Paths to list",
                        "items": {"type": "string", "description": "A path"}
                    },
                    "filter": {
                        "type": "object",
                        "description": "Filter",
                        "properties": {"hidden": {"type": "boolean"}}
                    }
                },
                "required": ["paths"]
            })
        );
    }

    #[test]
    fn empty_object_omits_required_list() {
        let rendered = FieldSchema::object("").to_json_schema();
        assert_eq!(rendered, json!({"type": "object", "properties": {}}));
    }

    #[test]
    fn field_on_scalar_is_ignored() {
        let schema = FieldSchema::string("name").field("x", FieldSchema::number(""));
        assert!(!schema.is_object());
        assert_eq!(schema.field_type, FieldType::String);
    }
}
