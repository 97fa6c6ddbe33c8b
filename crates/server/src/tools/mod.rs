//! MCP tool implementations.
//!
//! This module contains all tools exposed by the top10-offline server.

pub mod cache;
pub mod catalog;
pub mod resource_fetch;
pub mod shell;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::CatalogSnapshotParams;
pub use resource_fetch::ResourceFetchParams;
