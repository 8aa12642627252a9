//! Core type definitions for the Store Greeter.
//!
//! Shared types used across the services and tools, organized by domain.

pub mod greeting;
pub mod store;

// Re-export commonly used types
pub use greeting::*;
pub use store::*;
