//! Offline shell: the cache store manager and the request router.
//!
//! [`ShellWorker`] installs the shell assets into the current cache
//! generation and takes over once they are all stored. [`RequestRouter`]
//! answers each request from that generation:
//!
//! - data URLs (matching the configured pattern) go **Network-First**
//! - everything else goes **Cache-First**
//! - non-GET requests pass straight through to the network

pub mod lifecycle;
pub mod router;
pub mod shell;

#[cfg(test)]
pub(crate) mod testing;

pub use lifecycle::{ReclaimFailure, ReclaimReport, ShellWorker, StartOutcome, WorkerState};
pub use router::{CacheWrite, HandledRequest, RequestRouter, RoutePolicy, ServedFrom, Strategy, WriteOutcome};
pub use shell::ShellManifest;
