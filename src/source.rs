//! Reads domain events as JSON lines.
//!
//! This is the hand-off point from whatever watches the cluster: one
//! `StatemonitorEvent` object per line, camelCase keys.

use crate::event::StatemonitorEvent;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::warn;

/// Forwards every well-formed event from `reader` to `events_tx`.
///
/// Blank lines are ignored and malformed lines are logged and skipped.
/// Stops at end of input or when the receiving side is gone, and returns the
/// number of events forwarded.
pub async fn read_events<R>(mut reader: R, events_tx: mpsc::Sender<StatemonitorEvent>) -> io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    let mut forwarded = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        line_no += 1;
        let line = buf.trim_ascii();
        if line.is_empty() {
            continue;
        }
        // Bytes go straight to serde so invalid UTF-8 is just another malformed line.
        match serde_json::from_slice::<StatemonitorEvent>(line) {
            Ok(event) => {
                if events_tx.send(event).await.is_err() {
                    warn!("Event channel closed, stopping event reader.");
                    break;
                }
                forwarded += 1;
            }
            Err(e) => warn!(line = line_no, error = %e, "Skipping malformed event"),
        }
    }

    Ok(forwarded)
}
