use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper::body::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::HostPort;

/// A proxy connection after a successful CONNECT handshake.
///
/// Reads first drain whatever the proxy sent after its response head in the
/// same segment, then go to the transport. Writes always go straight to the
/// transport.
#[derive(Debug)]
pub struct TunnelConnection<T> {
    inner: T,
    prefetched: Bytes,
    destination: HostPort,
}

impl<T> TunnelConnection<T> {
    pub fn new(inner: T, prefetched: Bytes, destination: HostPort) -> Self {
        Self {
            inner,
            prefetched,
            destination,
        }
    }

    pub fn destination(&self) -> &HostPort {
        &self.destination
    }

    /// Bytes received past the response head and not yet read.
    pub fn prefetched(&self) -> &[u8] {
        &self.prefetched
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Give back the transport along with any unread prefetched bytes.
    pub fn into_parts(self) -> (T, Bytes) {
        (self.inner, self.prefetched)
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for TunnelConnection<T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !self.prefetched.is_empty() {
            let n = self.prefetched.len().min(buf.remaining());
            let chunk = self.prefetched.split_to(n);
            buf.put_slice(&chunk);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for TunnelConnection<T> {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
