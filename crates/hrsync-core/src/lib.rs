//! Core types and trait definitions for hrsync.
//!
//! This crate is deliberately free of transport and database dependencies.
//! It holds the source and directory data models, the validity-interval
//! arithmetic, the status classifier, the engagement matcher and the
//! collaborator traits. Every other crate depends on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod directory;
pub mod employment;
pub mod error;
pub mod fraction;
pub mod interval;
pub mod job;
pub mod payload;
pub mod status;
pub mod store;
pub mod timeline;

pub use error::{Error, Result};
