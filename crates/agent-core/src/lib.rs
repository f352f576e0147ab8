//! Core types shared across the agent-rs workspace
//!
//! This crate holds the error type that crosses crate boundaries, most
//! notably the boundary between tool implementations and their callers.

pub mod error;

pub use error::{Error, Result};
