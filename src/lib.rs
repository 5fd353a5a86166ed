//! # bundle-forwarder
//!
//! Output delivery for an event-forwarding pipeline: takes staged bundles of
//! serialized events and delivers them to an HTTP endpoint or an S3 bucket
//! without holding a whole bundle in memory.
//!
//! ## Overview
//!
//! Upstream components consume a message bus and write events, one per line,
//! into bundle files. This crate takes over once a bundle is complete:
//!
//! - **HTTP**: the bundle is streamed as one POST whose body is rendered on the
//!   fly through configurable envelope templates
//! - **S3**: the bundle is stored as one object, optionally prefixed, with
//!   server-side encryption and an ACL policy
//!
//! Each upload yields an [`models::UploadStatus`]; retry policy stays with the
//! caller.
//!
//! ## Usage
//!
//! ```no_run
//! use bundle_forwarder::config::Configuration;
//! use bundle_forwarder::output::build_destination;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut config = Configuration::default();
//! config.output.destination = "https://collector.example.com/events".to_string();
//! config.http.authorization_token = Some("Bearer token".to_string());
//!
//! let destination = build_destination(&config).await?;
//! let file = tokio::fs::File::open("/var/spool/forwarder/bundle.1").await?;
//! let status = destination.upload("bundle.1", file).await;
//!
//! println!("{} -> {:?} (status {})", destination, status.result, status.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: Configuration loading and defaults
//! - [`models`]: Upload results and statistics
//! - [`output`]: Destination behaviors (HTTP, S3) and streaming stages
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Upload results, events and statistics
pub mod models;

/// Destination behaviors and the streaming upload machinery
pub mod output;

/// Configuration loading and defaults
pub mod config;

/// Application constants and default values
pub mod constants;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
