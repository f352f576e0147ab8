//! Tool trait definition

use agent_core::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serializable description of a tool, as handed to an agent or printed by a CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema of the tool input
    pub input_schema: Value,
}

/// Trait for tools that agents can execute
///
/// Each tool provides a name, a description, and a JSON schema for its input.
/// Tools report domain-level failures inside their JSON output (for example a
/// `{"status": "error"}` object) and reserve `Err` for calls that could not be
/// executed at all, such as parameters that fail to deserialize.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with given parameters
    ///
    /// # Arguments
    ///
    /// * `params` - Tool input as JSON value (should match input_schema)
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Get the tool's name
    ///
    /// Must be unique within a ToolRegistry
    fn name(&self) -> &str;

    /// Get the tool's description
    fn description(&self) -> &str;

    /// Get the tool's input schema (JSON Schema format)
    ///
    /// # Example
    ///
    /// ```
    /// use serde_json::json;
    ///
    /// // Schema for a tool taking an optional crisis id:
    /// let schema = json!({
    ///     "type": "object",
    ///     "properties": {
    ///         "crisis_id": { "type": "string" }
    ///     }
    /// });
    /// assert!(schema["properties"]["crisis_id"].is_object());
    /// ```
    fn input_schema(&self) -> Value;

    /// Build the serializable definition of this tool
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}
