//! MCP tool implementations.
//!
//! - `greet` - Store greeting with live weather (`greet_store`)

pub mod greet;

use std::sync::Arc;

use crate::error::Result;
use crate::mcp::handler::ToolRegistry;
use crate::service::GreetingService;

/// Register all tools with the registry.
pub fn register_all_tools(
    registry: &mut ToolRegistry,
    greeting_service: Arc<GreetingService>,
) -> Result<()> {
    registry.register(greet::GreetStoreTool::new(greeting_service))?;
    Ok(())
}
