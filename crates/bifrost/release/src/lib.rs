//! Bifrost release engine.
//!
//! Everything between a stored bundle and a client download:
//! - [`resolver`]: answers update polls, with distinct "no update" reasons
//! - [`rollback`]: retires the latest active bundle of a tag
//! - [`artifacts`]: per-platform package storage
//! - [`service`]: the [`BundleService`] facade request handlers call
//! - [`config`] and [`telemetry`]: layered configuration and tracing setup
//!
//! # Example
//!
//! ```no_run
//! use bifrost_release::{BifrostConfig, BundleService};
//! use bifrost_types::NewBundle;
//!
//! # async fn example() -> bifrost_release::ReleaseResult<()> {
//! let config = BifrostConfig::load(Some("bifrost.toml"))?;
//! let _ = bifrost_release::telemetry::init_tracing(&config.logging);
//!
//! let service = BundleService::from_config(config).await?;
//! let bundle = service
//!     .reserve(NewBundle::new("1.0.0", "prod"), "alice")
//!     .await?;
//! println!("reserved {}", bundle.id);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod artifacts;
pub mod config;
pub mod error;
pub mod resolver;
pub mod rollback;
pub mod service;
pub mod telemetry;

pub use artifacts::{ArtifactKey, ArtifactStore, FsArtifactStore, InMemoryArtifactStore};
pub use config::{BifrostConfig, DatabaseConfig, LoggingConfig, SlackConfig};
pub use error::{NoUpdate, ReleaseError, ReleaseResult};
pub use resolver::{ReleaseResolver, Update, UpdateRequest};
pub use rollback::RollbackSelector;
pub use service::{BundleService, UploadedArtifacts};
