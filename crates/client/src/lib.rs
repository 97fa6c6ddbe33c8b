//! Client side of the Top 10 offline shell.
//!
//! This crate provides the HTTP fetch pipeline, the offline shell worker and
//! request router, and the data manifest helpers shared by the server.

pub mod catalog;
pub mod fetch;
pub mod offline;

pub use catalog::{CatalogEntry, CatalogManifest, snapshot_path};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, Fetcher};
pub use offline::{
    HandledRequest, RequestRouter, RoutePolicy, ServedFrom, ShellManifest, ShellWorker, StartOutcome, Strategy,
    WorkerState,
};
