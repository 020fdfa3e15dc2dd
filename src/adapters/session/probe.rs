use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::time::timeout;

/// Longest greeting line accepted from a destination.
pub const MAX_GREETING: u64 = 1024;

/// Read the first line a destination sends once the tunnel is open.
///
/// Servers that talk first (SSH, SMTP, FTP) identify themselves this way,
/// which makes it a cheap end-to-end check of a tunnel.
pub async fn read_greeting<T>(tunnel: T, limit: Duration) -> io::Result<String>
where
    T: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(tunnel).take(MAX_GREETING);
    let mut line = Vec::new();

    timeout(limit, reader.read_until(b'\n', &mut line))
        .await
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("destination sent nothing within {:?}", limit),
            )
        })??;

    if line.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "destination closed the tunnel without sending anything",
        ));
    }
    Ok(String::from_utf8_lossy(&line).trim_end().to_string())
}
