//! Request line parsing.
//!
//! Only the request line is interpreted. Header lines are read and thrown
//! away up to the blank line that ends them; a body, if any, is left unread.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use thiserror::Error;

/// Longest accepted request or header line, terminator included
pub const MAX_LINE_LEN: usize = 1024;

/// Most header lines accepted before the blank line
pub const MAX_HEADER_LINES: usize = 64;

/// Request parsing errors
///
/// Every variant ends the connection without a response.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("Malformed request: {0}")]
    Malformed(&'static str),

    #[error("Connection closed before end of headers")]
    Closed,

    #[error("Request not received within {0}ms")]
    TimedOut(u64),

    #[error("Read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Method and path of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
}

impl Request {
    /// Read the request line and skip the headers
    pub async fn parse<R>(reader: &mut R) -> Result<Self, RequestError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line = String::new();

        read_line(reader, &mut line).await?;
        let request = Self::from_request_line(&line)?;

        for _ in 0..MAX_HEADER_LINES {
            read_line(reader, &mut line).await?;
            if line.trim_end_matches(['\r', '\n']).is_empty() {
                return Ok(request);
            }
        }

        Err(RequestError::Malformed("too many header lines"))
    }

    /// Split `METHOD PATH [PROTOCOL]`; the protocol token is not kept
    pub fn from_request_line(line: &str) -> Result<Self, RequestError> {
        let mut tokens = line.split_whitespace();

        let method = tokens
            .next()
            .ok_or(RequestError::Malformed("empty request line"))?;
        let target = tokens
            .next()
            .ok_or(RequestError::Malformed("missing request path"))?;

        // Routing only looks at the path component
        let path = target.split(['?', '#']).next().unwrap_or(target);
        let path = if path.is_empty() { "/" } else { path };

        Ok(Self {
            method: method.to_string(),
            path: path.to_string(),
        })
    }
}

/// Read one line into `buf`, bounded by [`MAX_LINE_LEN`]
async fn read_line<R>(reader: &mut R, buf: &mut String) -> Result<(), RequestError>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();

    let read = (&mut *reader)
        .take(MAX_LINE_LEN as u64)
        .read_line(buf)
        .await?;

    if read == 0 {
        return Err(RequestError::Closed);
    }

    if !buf.ends_with('\n') {
        return if read == MAX_LINE_LEN {
            Err(RequestError::Malformed("line too long"))
        } else {
            Err(RequestError::Closed)
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncWriteExt, BufReader};

    async fn parse(raw: &[u8]) -> Result<Request, RequestError> {
        let mut reader = BufReader::new(raw);
        Request::parse(&mut reader).await
    }

    #[tokio::test]
    async fn parses_method_and_path() {
        let request = parse(b"GET /led/toggle HTTP/1.1\r\nHost: node\r\nAccept: */*\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/led/toggle");
    }

    #[tokio::test]
    async fn protocol_token_is_optional() {
        let request = parse(b"POST /ldr\r\n\r\n").await.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/ldr");
    }

    #[tokio::test]
    async fn accepts_bare_newlines() {
        let request = parse(b"GET /style.css HTTP/1.0\nHost: node\n\n").await.unwrap();
        assert_eq!(request.path, "/style.css");
    }

    #[tokio::test]
    async fn strips_query_string() {
        let request = parse(b"GET /ldr?t=123 HTTP/1.1\r\n\r\n").await.unwrap();
        assert_eq!(request.path, "/ldr");

        let request = parse(b"GET ?x=1 HTTP/1.1\r\n\r\n").await.unwrap();
        assert_eq!(request.path, "/");
    }

    #[tokio::test]
    async fn stops_at_end_of_headers() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 4\r\n\r\nbody";
        let mut reader = BufReader::new(&raw[..]);
        Request::parse(&mut reader).await.unwrap();

        let mut rest = String::new();
        reader.read_to_string(&mut rest).await.unwrap();
        assert_eq!(rest, "body");
    }

    #[tokio::test]
    async fn missing_path_is_malformed() {
        assert!(matches!(
            parse(b"GET\r\n\r\n").await,
            Err(RequestError::Malformed(_))
        ));
        assert!(matches!(
            parse(b"   \r\n\r\n").await,
            Err(RequestError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn close_before_headers_end() {
        assert!(matches!(parse(b"").await, Err(RequestError::Closed)));
        assert!(matches!(
            parse(b"GET / HTTP/1.1\r\nHost: node\r\n").await,
            Err(RequestError::Closed)
        ));
        assert!(matches!(
            parse(b"GET / HTTP/1.1\r\nHos").await,
            Err(RequestError::Closed)
        ));
    }

    #[tokio::test]
    async fn oversized_line_is_malformed() {
        let mut raw = b"GET /".to_vec();
        raw.extend(std::iter::repeat_n(b'a', MAX_LINE_LEN));
        raw.extend_from_slice(b" HTTP/1.1\r\n\r\n");
        assert!(matches!(parse(&raw).await, Err(RequestError::Malformed(_))));
    }

    #[tokio::test]
    async fn header_flood_is_malformed() {
        let mut raw = b"GET / HTTP/1.1\r\n".to_vec();
        for i in 0..=MAX_HEADER_LINES {
            raw.extend_from_slice(format!("X-{i}: y\r\n").as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        assert!(matches!(parse(&raw).await, Err(RequestError::Malformed(_))));
    }

    #[tokio::test]
    async fn waits_for_headers_split_across_writes() {
        let (mut client, server) = tokio::io::duplex(64);
        let parser = tokio::spawn(async move {
            let mut reader = BufReader::new(server);
            Request::parse(&mut reader).await
        });

        client.write_all(b"GET /ld").await.unwrap();
        tokio::task::yield_now().await;
        client.write_all(b"r HTTP/1.1\r\nHost: n").await.unwrap();
        tokio::task::yield_now().await;
        client.write_all(b"ode\r\n\r\n").await.unwrap();

        let request = parser.await.unwrap().unwrap();
        assert_eq!(request.path, "/ldr");
    }
}
