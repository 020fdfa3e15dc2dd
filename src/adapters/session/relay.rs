use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Byte counts of a finished relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes copied from the local input into the tunnel, when the input
    /// reached EOF before the tunnel closed.
    pub sent: Option<u64>,
    /// Bytes copied from the tunnel to the local output.
    pub received: u64,
}

/// Pipe `input` into the tunnel and the tunnel into `output`.
///
/// EOF on `input` half-closes the tunnel and keeps reading from it; EOF from
/// the tunnel ends the relay, whether or not `input` is finished.
pub async fn relay<T, R, W>(tunnel: T, mut input: R, mut output: W) -> io::Result<RelayStats>
where
    T: AsyncRead + AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (mut from_tunnel, mut into_tunnel) = tokio::io::split(tunnel);

    let upstream = async {
        let n = tokio::io::copy(&mut input, &mut into_tunnel).await?;
        into_tunnel.shutdown().await?;
        Ok::<_, io::Error>(n)
    };
    let downstream = async {
        let n = tokio::io::copy(&mut from_tunnel, &mut output).await?;
        output.flush().await?;
        Ok::<_, io::Error>(n)
    };
    tokio::pin!(upstream);
    tokio::pin!(downstream);

    let mut sent = None;
    loop {
        tokio::select! {
            res = &mut upstream, if sent.is_none() => {
                let n = res?;
                debug!(bytes = n, "local input finished, tunnel half-closed");
                sent = Some(n);
            }
            res = &mut downstream => {
                let received = res?;
                debug!(bytes = received, "tunnel closed by remote");
                return Ok(RelayStats { sent, received });
            }
        }
    }
}
