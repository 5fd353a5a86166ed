use std::io;

use anyhow::Result;
use serde::{Serialize, Deserialize};
use tokio::sync::mpsc;

/// One serialized event record taken from a bundle file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEvent {
    pub event_text: String,
}

impl UploadEvent {
    pub fn new(event_text: impl Into<String>) -> Self {
        UploadEvent { event_text: event_text.into() }
    }
}

/// Item carried by the event queue. A read failure travels down the queue
/// so the envelope writer can abort the request body.
pub type EventItem = io::Result<UploadEvent>;

/// Everything the envelope template sees for one upload.
///
/// `events` is the receiving end of the queue fed by the bundle reader; it is
/// drained exactly once, in file order.
#[derive(Debug)]
pub struct UploadData {
    pub file_name: String,
    pub file_size: u64,
    pub events: mpsc::Receiver<EventItem>,
}

/// Outcome of a single upload attempt.
///
/// `status` is the HTTP status code when the destination answered, and 0 when
/// there is no status to report (transport failures, object storage).
#[derive(Debug)]
pub struct UploadStatus {
    pub file_name: String,
    pub result: Result<()>,
    pub status: u16,
}

impl UploadStatus {
    pub fn success(file_name: &str, status: u16) -> Self {
        UploadStatus { file_name: file_name.to_string(), result: Ok(()), status }
    }

    pub fn failure(file_name: &str, error: anyhow::Error, status: u16) -> Self {
        UploadStatus { file_name: file_name.to_string(), result: Err(error), status }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HttpStatistics {
    pub destination: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct S3Statistics {
    pub bucket_name: String,
    pub region: String,
    pub encryption_enabled: bool,
}

/// Point-in-time snapshot of a destination's identity, safe to serialize.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum DestinationStatistics {
    Http(HttpStatistics),
    S3(S3Statistics),
}
