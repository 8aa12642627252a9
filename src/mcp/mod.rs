//! Model Context Protocol (MCP) implementation.
//!
//! # Architecture
//!
//! - `protocol` - Core MCP types and message definitions
//! - `server` - Method dispatch for one message at a time
//! - `session` - Session registry for the HTTP transport
//! - `handler` - Tool registration and schema-checked dispatch
//! - `schema` - Minimal JSON Schema validation

pub mod handler;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod session;

pub use handler::{ToolHandler, ToolRegistry};
pub use protocol::*;
pub use server::McpServer;
pub use session::{Session, SessionRegistry, SessionState};
