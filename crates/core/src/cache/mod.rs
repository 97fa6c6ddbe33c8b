//! SQLite-backed store for versioned cache generations.
//!
//! This module provides a persistent, content-addressed cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named generations holding request/response snapshots
//! - Content-addressed entry keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entry;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use entry::{RequestKey, ResponseSnapshot};
pub use store::CacheStore;
