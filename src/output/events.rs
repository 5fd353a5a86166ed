use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

use crate::constants::BUNDLE_READ_BUFFER_SIZE;
use crate::models::{EventItem, UploadEvent};

/// Strip the line terminator (`\n` or `\r\n`) left by `read_until`.
fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Read newline-delimited events from a bundle and hand them to the queue in
/// file order.
///
/// Event bytes are not required to be UTF-8; invalid sequences are replaced
/// rather than failing the bundle. Blank lines are skipped. The queue is
/// closed when the source is exhausted, when the receiver goes away, or right
/// after a read error has been forwarded. Returns the number of events
/// delivered.
pub async fn read_events<R>(source: R, events: mpsc::Sender<EventItem>) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::with_capacity(BUNDLE_READ_BUFFER_SIZE, source);
    let mut line = Vec::new();
    let mut delivered = 0;

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(trim_line_ending(&line));
                if text.trim().is_empty() {
                    continue;
                }
                if events.send(Ok(UploadEvent::new(text))).await.is_err() {
                    debug!("Event queue closed after {} events", delivered);
                    break;
                }
                delivered += 1;
            },
            Err(e) => {
                debug!("Bundle read failed after {} events: {}", delivered, e);
                let _ = events.send(Err(e)).await;
                break;
            },
        }
    }

    delivered
}
