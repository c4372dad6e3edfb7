//! File-backed source feed for the SD personnel system.
//!
//! Decodes the `GetEmploymentChangedAtDate20111201` and
//! `GetPersonChangedAtDate20111201` documents into the `hrsync-core` source
//! model. [`XmlFeed`] reads them from a directory holding one folder per
//! window; fetching and caching the documents is left to whoever fills that
//! directory.

pub mod document;
pub mod error;
mod feed;

pub use error::{Error, Result};
pub use feed::{EMPLOYMENT_DOCUMENT, PERSON_DOCUMENT, XmlFeed};
