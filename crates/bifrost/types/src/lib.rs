//! Bifrost Types - Core types for over-the-air bundle distribution
//!
//! A **bundle** is one versioned release artifact set (one package per
//! platform) plus metadata. Bundles live under a **tag**, the release channel
//! or application they belong to, and move between two states:
//!
//! - **Active**: eligible to be served as the current release
//! - **Disposed**: retired, kept for history and rollback, never served
//!
//! Records are never deleted. "Latest" is always decided by `created_at`.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod bundle;
pub mod event;
pub mod filter;
pub mod ids;
pub mod platform;
pub mod validation;

pub use bundle::Bundle;
pub use event::LifecycleEvent;
pub use filter::{BundleFilter, BundleUpdate, Transition};
pub use ids::{sanitize_tag, BundleId};
pub use platform::Platform;
pub use validation::{
    NewBundle, ValidationError, MAX_NOTE_LEN, MAX_TAG_LEN, MAX_VERSION_LEN,
};
