//! Reconciliation of the personnel feed against the organisational
//! directory.
//!
//! [`Engine::sync_window`] reads one window of changed persons and
//! employments from a [`SourceFeed`](hrsync_core::store::SourceFeed), applies
//! every status transition to a
//! [`DirectoryWriter`](hrsync_core::store::DirectoryWriter) and then lets the
//! [primary selector](primary) settle each person's primary engagement.
//!
//! Faults are kept per person: one person's failure is recorded in the
//! [`RunSummary`] and the run moves on to the next person. Only feed
//! failures, unknown status codes and an unusable directory abort a run.

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod fault;
pub mod primary;
pub mod reconcile;
pub mod summary;

pub use catalog::Catalog;
pub use config::SyncConfig;
pub use error::{Error, Result};
pub use fault::{Fault, FaultKind, PersonFault};
pub use reconcile::Engine;
pub use summary::RunSummary;
