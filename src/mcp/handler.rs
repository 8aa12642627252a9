//! Tool registry and dispatch.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::mcp::protocol::{ContentBlock, Tool, ToolResult};
use crate::mcp::schema::{self, SchemaError};

/// Handler for MCP tool calls.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Get the tool definition.
    fn definition(&self) -> Tool;

    /// Execute the tool with arguments that already passed the input schema.
    async fn execute(&self, arguments: HashMap<String, Value>) -> Result<ToolResult>;

    /// The client-facing error for arguments that fail the input schema.
    /// `None` falls back to a generic message naming the property.
    fn reject_arguments(&self, _err: &SchemaError) -> Option<Error> {
        None
    }
}

struct RegisteredTool {
    definition: Tool,
    handler: Arc<dyn ToolHandler>,
}

/// Registry of tool handlers. Built once at startup, then shared read-only.
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool handler. Names are unique.
    pub fn register<T: ToolHandler + 'static>(&mut self, handler: T) -> Result<()> {
        self.register_arc(Arc::new(handler))
    }

    /// Register a tool handler (Arc version).
    pub fn register_arc(&mut self, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let definition = handler.definition();
        if self.tools.contains_key(&definition.name) {
            return Err(Error::ToolAlreadyRegistered(definition.name));
        }

        let name = definition.name.clone();
        self.order.push(name.clone());
        self.tools.insert(
            name,
            RegisteredTool {
                definition,
                handler,
            },
        );
        Ok(())
    }

    /// Get all registered tools, in registration order.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.definition.clone())
            .collect()
    }

    /// Check if a tool exists.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get the number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Validate `raw` against the tool's input schema, run it, and check the
    /// structured output against the output schema.
    pub async fn dispatch(&self, name: &str, raw: Option<Value>) -> Result<ToolResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;

        let raw = raw.unwrap_or_else(|| Value::Object(Default::default()));
        if let Err(e) = schema::validate(&tool.definition.input_schema, &raw) {
            return Err(tool.handler.reject_arguments(&e).unwrap_or_else(|| {
                Error::InvalidInput(format!("Invalid arguments for tool {}: {}", name, e))
            }));
        }

        let arguments: HashMap<String, Value> = match raw {
            Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };

        debug!("Dispatching tool {}", name);
        let result = tool.handler.execute(arguments).await?;

        if let Some(output_schema) = &tool.definition.output_schema {
            if !result.is_error {
                let structured = result.structured_content.as_ref().ok_or_else(|| {
                    Error::SchemaViolation(format!("{} returned no structured content", name))
                })?;
                schema::validate(output_schema, structured)
                    .map_err(|e| Error::SchemaViolation(format!("{}: {}", name, e)))?;
            }
        }

        Ok(result)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper to create a text content block.
pub fn text_content(text: impl Into<String>) -> ContentBlock {
    ContentBlock::Text { text: text.into() }
}

/// Helper to turn validated arguments into a typed input struct.
pub fn parse_args<T: DeserializeOwned>(args: HashMap<String, Value>) -> Result<T> {
    let value = Value::Object(args.into_iter().collect());
    serde_json::from_value(value).map_err(|e| Error::InvalidInput(e.to_string()))
}

/// Helper to create a result carrying both the JSON text and the
/// structured form of `output`.
pub fn structured_result<T: Serialize>(output: &T) -> Result<ToolResult> {
    let structured = serde_json::to_value(output)?;
    Ok(ToolResult {
        content: vec![text_content(serde_json::to_string(&structured)?)],
        structured_content: Some(structured),
        is_error: false,
    })
}
