//! SQLite backend for the hrsync directory.
//!
//! Implements [`DirectoryReader`](hrsync_core::store::DirectoryReader) and
//! [`DirectoryWriter`](hrsync_core::store::DirectoryWriter) on a single
//! SQLite file. Details are kept as validity slices, so edits and
//! terminations behave like the remote directory's bitemporal registrations.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteDirectory;
