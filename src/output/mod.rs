//! Delivery of staged event bundles to remote destinations.
//!
//! Every sink implements [`DestinationBehavior`]. The caller picks one by
//! configured output kind, initializes it once, and then hands it bundle
//! files; each call returns an [`UploadStatus`] instead of failing outright so
//! retry policy stays with the caller.
//!
//! ## Supported Destinations
//!
//! - **HTTP**: one streaming POST per bundle, body rendered through the
//!   configured envelope templates
//! - **Amazon S3**: one PutObject per bundle
//!
//! ## Architecture
//!
//! ```text
//!  bundle file ──▶ read_events ──(queue, depth 1)──▶ EventTemplates::render
//!                                                          │
//!                                                  (body pipe, depth 1)
//!                                                          │
//!                                                    reqwest POST ──▶ HTTP sink
//!
//!  bundle file ──────────────── PutObject ──────────────────────────▶ S3 bucket
//! ```
//!
//! ## Usage Example
//!
//! ```no_run
//! use bundle_forwarder::config::Configuration;
//! use bundle_forwarder::output::build_destination;
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Configuration::from_yaml_file(Path::new("forwarder.yaml"))?;
//! let destination = build_destination(&config).await?;
//!
//! let file = tokio::fs::File::open("/var/spool/forwarder/bundle.1").await?;
//! let status = destination.upload("/var/spool/forwarder/bundle.1", file).await;
//! if let Err(e) = &status.result {
//!     eprintln!("upload to {} failed: {}", destination, e);
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use tokio::fs::File;

use crate::config::{Configuration, OutputKind};
use crate::models::{DestinationStatistics, UploadStatus};

/// S3 client construction and the object-store seam
pub mod client;

/// Bundle file to event queue producer
pub mod events;

/// HTTP POST destination
pub mod http;

/// Bounded body pipe between the envelope writer and the HTTP client
pub mod pipe;

/// Amazon S3 destination
pub mod s3;

/// Envelope and event fragment templates
pub mod template;

pub use http::HttpBehavior;
pub use s3::S3Behavior;

/// Contract shared by every destination.
///
/// `initialize` runs once, before any upload. `upload` may then be called
/// concurrently from several tasks on the same instance. `Display` gives the
/// one-line description used in logs.
#[async_trait]
pub trait DestinationBehavior: fmt::Display + Send + Sync {
    /// Parse the connection string, build clients, and run destination
    /// specific setup. Only configuration problems are returned as errors.
    async fn initialize(&mut self, connection: &str, config: &Configuration) -> Result<()>;

    /// Deliver one bundle. The file handle is owned by this call.
    async fn upload(&self, file_name: &str, file: File) -> UploadStatus;

    /// Stable identity of the configured destination.
    fn key(&self) -> String;

    fn statistics(&self) -> DestinationStatistics;
}

/// Create and initialize the destination named by `config.output`.
pub async fn build_destination(config: &Configuration) -> Result<Box<dyn DestinationBehavior>> {
    config.validate()?;

    let mut destination: Box<dyn DestinationBehavior> = match config.output.kind {
        OutputKind::Http => Box::new(HttpBehavior::new()),
        OutputKind::S3 => Box::new(S3Behavior::new()),
    };

    destination
        .initialize(&config.output.destination, config)
        .await
        .context(format!("Failed to initialize {} destination", config.output.kind))?;

    info!("Initialized destination {}", destination);
    Ok(destination)
}
