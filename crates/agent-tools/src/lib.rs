//! Tool framework for agent-rs
//!
//! Tools are named, schema-described async functions that take JSON in and
//! hand JSON back. Stage operations of the crisis pipeline are exposed this
//! way so that an agent runtime, a CLI, or a test can drive them uniformly.

pub mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::{Tool, ToolDefinition};
