//! Wire side of the CONNECT handshake.
//!
//! One request head goes out, one response head comes back, and nothing past
//! the blank line is ever consumed as HTTP.

use std::io;

use hyper::http::{HeaderName, HeaderValue};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{HeaderMap, StatusCode, TunnelRequest, TunnelResponse};

/// Upper bound for the response status line plus headers.
pub const MAX_RESPONSE_HEAD: usize = 8192;

/// Write the request, then read the proxy's response head.
///
/// `conn` is the buffered proxy connection; the request goes straight to the
/// transport underneath it and is flushed before any read happens.
pub async fn exchange<S>(
    conn: &mut tokio::io::BufReader<S>,
    request: &TunnelRequest,
) -> io::Result<TunnelResponse>
where
    S: tokio::io::AsyncRead + AsyncWrite + Unpin,
{
    let stream = conn.get_mut();
    stream.write_all(&request.encode()).await?;
    stream.flush().await?;
    read_response_head(conn).await
}

/// Read lines until the empty line ending the header block, then parse them.
pub async fn read_response_head<R>(reader: &mut R) -> io::Result<TunnelResponse>
where
    R: AsyncBufRead + Unpin,
{
    let mut head = Vec::with_capacity(256);
    loop {
        let remaining = (MAX_RESPONSE_HEAD - head.len()) as u64;
        let line_start = head.len();
        let n = (&mut *reader)
            .take(remaining)
            .read_until(b'\n', &mut head)
            .await?;

        if n == 0 {
            if head.len() >= MAX_RESPONSE_HEAD {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "proxy response head too large",
                ));
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "proxy closed the connection before completing its response",
            ));
        }

        let line = &head[line_start..];
        if !line.ends_with(b"\n") {
            // `take` ran dry mid-line; the next iteration reports it.
            continue;
        }
        if line_start > 0 && (line == b"\r\n" || line == b"\n") {
            return parse_response_head(&head);
        }
    }
}

/// Parse a complete response head (status line, headers, blank line).
pub fn parse_response_head(head: &[u8]) -> io::Result<TunnelResponse> {
    // Every header takes at least one line, so the line count bounds them.
    let lines = head.iter().filter(|&&b| b == b'\n').count();
    let mut headers = vec![httparse::EMPTY_HEADER; lines];
    let mut response = httparse::Response::new(&mut headers);

    let status = response
        .parse(head)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid proxy response: {}", e)))?;
    if status.is_partial() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "incomplete proxy response head",
        ));
    }

    let code = response.code.unwrap_or_default();
    let status = StatusCode::from_u16(code).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid proxy status code {}", code),
        )
    })?;
    let reason = match response.reason {
        Some(reason) if !reason.is_empty() => reason.to_string(),
        _ => status.canonical_reason().unwrap_or_default().to_string(),
    };

    let mut header_map = HeaderMap::new();
    for header in response.headers.iter() {
        let name = HeaderName::from_bytes(header.name.as_bytes());
        let value = HeaderValue::from_bytes(header.value);
        if let (Ok(name), Ok(value)) = (name, value) {
            header_map.append(name, value);
        }
    }

    Ok(TunnelResponse {
        version: response.version.unwrap_or(1),
        status,
        reason,
        headers: header_map,
    })
}
