//! HTTP/1.0 response serialization.
//!
//! Every response is a status line, a handful of headers, a blank line and
//! the body, written and flushed in full before the emitter returns.

use super::sse::EventStream;
use super::WebError;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Content types served by the node
pub mod content_type {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const CSS: &str = "text/css";
    pub const JS: &str = "application/javascript";
    pub const JSON: &str = "application/json";
    pub const EVENT_STREAM: &str = "text/event-stream";
}

/// Response status codes used by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
    InternalServerError,
    ServiceUnavailable,
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NotFound => 404,
            Status::InternalServerError => 500,
            Status::ServiceUnavailable => 503,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotFound => "Not Found",
            Status::InternalServerError => "Internal Server Error",
            Status::ServiceUnavailable => "Service Unavailable",
        }
    }
}

/// Writes responses to the write half of a connection
pub struct ResponseEmitter<W> {
    writer: W,
}

impl<W> ResponseEmitter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 200 with an HTML body
    pub async fn emit_html(&mut self, body: &str) -> Result<(), WebError> {
        self.emit(Status::Ok, content_type::HTML, body.as_bytes())
            .await
    }

    /// 200 with a static asset, already read in full
    pub async fn emit_asset(&mut self, content_type: &str, body: &[u8]) -> Result<(), WebError> {
        self.emit(Status::Ok, content_type, body).await
    }

    /// 200 with the JSON encoding of `value`
    pub async fn emit_json<T: Serialize>(&mut self, value: &T) -> Result<(), WebError> {
        let body = serde_json::to_vec(value)?;
        self.emit(Status::Ok, content_type::JSON, &body).await
    }

    /// Failure page for `status`
    pub async fn emit_error(&mut self, status: Status, message: &str) -> Result<(), WebError> {
        let body = super::templates::render_message_page(status.reason(), message);
        self.emit(status, content_type::HTML, body.as_bytes())
            .await
    }

    /// Send the stream headers and hand the connection to an [`EventStream`]
    pub async fn emit_event_stream(self) -> Result<EventStream<W>, WebError> {
        let head = format!(
            "{}Content-Type: {}\r\nCache-Control: no-cache\r\n\r\n",
            status_line(Status::Ok),
            content_type::EVENT_STREAM
        );
        EventStream::open(self.writer, head.as_bytes()).await
    }

    /// Give back the writer, e.g. to shut it down
    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn emit(&mut self, status: Status, content_type: &str, body: &[u8]) -> Result<(), WebError> {
        let head = format!(
            "{}Content-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status_line(status),
            content_type,
            body.len()
        );
        self.writer
            .write_all(head.as_bytes())
            .await
            .map_err(WebError::PeerDisconnected)?;
        self.write(body).await
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), WebError> {
        self.writer
            .write_all(bytes)
            .await
            .map_err(WebError::PeerDisconnected)?;
        self.writer
            .flush()
            .await
            .map_err(WebError::PeerDisconnected)
    }
}

fn status_line(status: Status) -> String {
    format!("HTTP/1.0 {} {}\r\n", status.code(), status.reason())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn emitted<F, Fut>(f: F) -> String
    where
        F: FnOnce(ResponseEmitter<Vec<u8>>) -> Fut,
        Fut: std::future::Future<Output = Vec<u8>>,
    {
        String::from_utf8(f(ResponseEmitter::new(Vec::new())).await).unwrap()
    }

    #[tokio::test]
    async fn html_response() {
        let out = emitted(|mut e| async move {
            e.emit_html("<p>hi</p>").await.unwrap();
            e.into_inner()
        })
        .await;
        assert_eq!(
            out,
            "HTTP/1.0 200 OK\r\nContent-Type: text/html; charset=utf-8\r\n\
             Content-Length: 9\r\nConnection: close\r\n\r\n<p>hi</p>"
        );
    }

    #[tokio::test]
    async fn asset_response_keeps_content_type() {
        let out = emitted(|mut e| async move {
            e.emit_asset(content_type::CSS, b"h1{}").await.unwrap();
            e.into_inner()
        })
        .await;
        assert!(out.starts_with("HTTP/1.0 200 OK\r\nContent-Type: text/css\r\n"));
        assert!(out.ends_with("\r\n\r\nh1{}"));
    }

    #[tokio::test]
    async fn json_keeps_insertion_order() {
        let out = emitted(|mut e| async move {
            e.emit_json(&json!({"zeta": 1, "alpha": "ON"})).await.unwrap();
            e.into_inner()
        })
        .await;
        assert!(out.contains("Content-Type: application/json\r\n"));
        assert!(out.ends_with("\r\n\r\n{\"zeta\":1,\"alpha\":\"ON\"}"));
    }

    #[tokio::test]
    async fn error_response_status_line() {
        let out = emitted(|mut e| async move {
            e.emit_error(Status::InternalServerError, "sensor offline")
                .await
                .unwrap();
            e.into_inner()
        })
        .await;
        assert!(out.starts_with("HTTP/1.0 500 Internal Server Error\r\n"));
        assert!(out.contains("sensor offline"));
    }

    #[tokio::test]
    async fn event_stream_headers() {
        let out = emitted(|e| async move {
            let stream = e.emit_event_stream().await.unwrap();
            stream.into_inner()
        })
        .await;
        assert_eq!(
            out,
            "HTTP/1.0 200 OK\r\nContent-Type: text/event-stream\r\n\
             Cache-Control: no-cache\r\n\r\n"
        );
    }
}
