//! Global constants for the bundle forwarder.
//!
//! This module centralizes hardcoded values shared by the destination
//! behaviors and the configuration defaults.

// Destination kind tags
/// Prefix used by the HTTP destination in its `Display` output
pub const HTTP_KIND_TAG: &str = "HTTP POST";

/// Prefix used by the S3 destination in its `Display` output
pub const S3_KIND_TAG: &str = "AWS S3";

// Object storage constants
/// Region used when the connection string names only a bucket
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Separator between region and bucket in an S3 connection string
pub const S3_CONNECTION_SEPARATOR: char = ':';

// Streaming constants
/// Depth of the queue between the file reader and the envelope writer.
/// A depth of one makes every event a synchronous handoff.
pub const EVENT_QUEUE_DEPTH: usize = 1;

/// Depth of the byte-chunk pipe feeding the HTTP request body
pub const BODY_PIPE_DEPTH: usize = 1;

/// Read buffer for the bundle reader (8KB)
pub const BUNDLE_READ_BUFFER_SIZE: usize = 8 * 1024;

// HTTP defaults
/// Content type sent when the configuration does not override it
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Outer envelope used when none is configured
pub const DEFAULT_POST_TEMPLATE: &str =
    r#"{"filename": "{{FileName}}", "service": "carbonblack", "alerts":[{{Events}}]}"#;

/// Rendering of the first event in a bundle
pub const DEFAULT_FIRST_EVENT_TEMPLATE: &str = "{{.}}";

/// Rendering of every event after the first
pub const DEFAULT_SUBSEQUENT_EVENT_TEMPLATE: &str = "\n, {{.}}";

/// Only this status counts as a successful HTTP delivery
pub const HTTP_SUCCESS_STATUS: u16 = 200;
