//! Bounded in-process pipe between the envelope writer and the HTTP client.
//!
//! The writer pushes rendered byte chunks; the reader is a `Stream` that
//! reqwest consumes as a request body. With a depth of one the writer can be
//! at most one chunk ahead of what the client has pulled off the pipe.
//! Closing the writer with an error makes the stream yield that error, which
//! aborts the request instead of sending a truncated body.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;

use crate::constants::BODY_PIPE_DEPTH;

/// Create a connected writer/reader pair.
pub fn body_pipe() -> (PipeWriter, PipeReader) {
    let (sender, receiver) = mpsc::channel(BODY_PIPE_DEPTH);
    (PipeWriter { sender }, PipeReader { receiver })
}

/// Write end of the body pipe. Dropping it signals end of body.
pub struct PipeWriter {
    sender: mpsc::Sender<io::Result<Bytes>>,
}

impl PipeWriter {
    /// Push one chunk, waiting until the reader has room for it.
    ///
    /// Fails with `BrokenPipe` once the reader is gone.
    pub async fn write(&self, chunk: impl Into<Bytes>) -> io::Result<usize> {
        let chunk = chunk.into();
        let len = chunk.len();
        if len == 0 {
            return Ok(0);
        }

        self.sender
            .send(Ok(chunk))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "body reader closed"))?;
        Ok(len)
    }

    /// Close the pipe so the reader sees `error` instead of a clean end.
    pub async fn close_with_error(self, error: io::Error) {
        // Reader already gone: nobody is left to observe the error.
        let _ = self.sender.send(Err(error)).await;
    }
}

/// Read end of the body pipe.
pub struct PipeReader {
    receiver: mpsc::Receiver<io::Result<Bytes>>,
}

impl Stream for PipeReader {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
