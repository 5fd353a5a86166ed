//! Test utilities for the bundle forwarder
//!
//! Helpers for building bundle files and configurations shared by the unit
//! test modules.

#![cfg(test)]

use std::io::{self, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

use anyhow::Result;
use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, ReadBuf};

use crate::config::{Configuration, OutputKind};

/// Creates a temporary file with the given content
pub fn create_temp_file(content: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content)?;
    file.flush()?;
    Ok(file)
}

/// Creates a bundle file holding one event per line
pub fn create_bundle_file(events: &[&str]) -> Result<NamedTempFile> {
    let mut content = String::new();
    for event in events {
        content.push_str(event);
        content.push('\n');
    }
    create_temp_file(content.as_bytes())
}

/// Default configuration pointed at an HTTP destination
pub fn http_config(destination: &str) -> Configuration {
    let mut config = Configuration::default();
    config.output.kind = OutputKind::Http;
    config.output.destination = destination.to_string();
    config
}

/// Default configuration pointed at an S3 destination
pub fn s3_config(destination: &str) -> Configuration {
    let mut config = Configuration::default();
    config.output.kind = OutputKind::S3;
    config.output.destination = destination.to_string();
    config
}

/// Reader that yields `data` and then fails every read with `kind`
pub struct FailingReader {
    data: Vec<u8>,
    kind: io::ErrorKind,
}

impl FailingReader {
    pub fn new(data: &[u8], kind: io::ErrorKind) -> Self {
        FailingReader { data: data.to_vec(), kind }
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.data.is_empty() {
            let kind = self.kind;
            return Poll::Ready(Err(io::Error::new(kind, "simulated read failure")));
        }
        let len = self.data.len().min(buf.remaining());
        let chunk: Vec<u8> = self.data.drain(..len).collect();
        buf.put_slice(&chunk);
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_create_bundle_file() {
        let bundle = create_bundle_file(&["{\"a\":1}", "{\"b\":2}"]).unwrap();
        let content = fs::read_to_string(bundle.path()).unwrap();
        assert_eq!(content, "{\"a\":1}\n{\"b\":2}\n");
    }

    #[test]
    fn test_config_helpers() {
        assert_eq!(http_config("http://x/").output.kind, OutputKind::Http);
        assert_eq!(s3_config("bucket").output.destination, "bucket");
    }
}
