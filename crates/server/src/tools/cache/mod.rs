//! Cache-related MCP tools.
//!
//! This module provides read access to the controlling cache generation.

pub mod get;

pub use get::{CacheGetParams, get_impl};
