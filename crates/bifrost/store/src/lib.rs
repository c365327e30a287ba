//! Bifrost bundle repository.
//!
//! This crate owns every read and write of bundle records:
//! - inserts of freshly created bundles
//! - lookups by id and by `(version, tag)`
//! - filtered, newest-first listings
//! - note updates
//! - conditional dispose/recover flips
//!
//! Design stance:
//! - SQLite (single shared connection, WAL) is the source of truth.
//! - State flips are one conditional write, so concurrent callers observe at
//!   most one `Transition::Applied` per flip.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(test)]
mod testsuite;
mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBundleStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBundleStore;
pub use traits::BundleStore;
