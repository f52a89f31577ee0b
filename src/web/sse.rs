//! Server-Sent Events stream.
//!
//! A stream moves through `HeaderSent -> Streaming -> Closed`. Each frame
//! carries an id that starts at 0 and grows by one per frame; ids are local
//! to one connection.

use super::WebError;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Lifecycle of an event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    HeaderSent,
    Streaming,
    Closed,
}

/// Open event stream on the write half of a connection
pub struct EventStream<W> {
    writer: W,
    next_id: u64,
    state: StreamState,
}

impl<W> EventStream<W>
where
    W: AsyncWrite + Unpin,
{
    /// Write and flush the response head, then start streaming
    pub(super) async fn open(writer: W, head: &[u8]) -> Result<Self, WebError> {
        let mut stream = Self {
            writer,
            next_id: 0,
            state: StreamState::HeaderSent,
        };
        stream
            .write(head)
            .await
            .map_err(WebError::PeerDisconnected)?;
        stream.state = StreamState::Streaming;
        Ok(stream)
    }

    #[allow(dead_code)]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Id the next frame will carry
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Write and flush one `id`/`event`/`data` frame
    ///
    /// A write failure closes the stream; the id is only consumed once the
    /// frame has been flushed.
    pub async fn send<T: Serialize>(&mut self, event: &str, data: &T) -> Result<u64, WebError> {
        if self.state == StreamState::Closed {
            return Err(WebError::StreamClosed);
        }

        let frame = format_frame(self.next_id, event, &serde_json::to_string(data)?);
        if let Err(e) = self.write(frame.as_bytes()).await {
            self.state = StreamState::Closed;
            return Err(WebError::PeerDisconnected(e));
        }

        let id = self.next_id;
        self.next_id += 1;
        Ok(id)
    }

    /// Mark the stream closed and shut the writer down
    pub async fn close(&mut self) {
        if self.state != StreamState::Closed {
            self.state = StreamState::Closed;
            // The peer may already be gone
            let _ = self.writer.shutdown().await;
        }
    }

    #[allow(dead_code)]
    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }
}

/// `id: <n>\nevent: <name>\ndata: <json>\n\n`
pub fn format_frame(id: u64, event: &str, data: &str) -> String {
    format!("id: {id}\nevent: {event}\ndata: {data}\n\n")
}
