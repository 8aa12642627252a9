//! Store Greeter MCP Server
//!
//! A Model Context Protocol (MCP) server exposing a single tool,
//! `greet_store`, which finds a business by approximate name and answers
//! with a greeting and the current weather at its location.
//!
//! # Architecture
//!
//! 1. **SDK Layer** (`sdk`) - HTTP clients for Supabase and OpenWeatherMap
//! 2. **Service Layer** (`service`) - Store resolution, weather enrichment, greeting composition
//! 3. **MCP Layer** (`mcp`) - JSON-RPC protocol, sessions, tool registry
//! 4. **Tools Layer** (`tools`) - The `greet_store` tool
//! 5. **Transport** (`http`) - Streamable HTTP endpoint with session headers

pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod metrics;
pub mod sdk;
pub mod service;
pub mod tools;
pub mod types;

pub use error::{Error, Result};

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name reported during the MCP handshake
pub const SERVER_NAME: &str = "travel-store-server";
