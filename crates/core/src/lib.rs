//! Core types and shared functionality for the Top 10 offline shell.
//!
//! This crate provides:
//! - Versioned cache generations with a SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheStore, RequestKey, ResponseSnapshot};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
