use std::io;
use std::time::Duration;

use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::http::{HeaderName, HeaderValue};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tracing::{debug, debug_span, Instrument};
use uuid::Uuid;

use super::{protocol, HeaderMap, HostPort, ProxyAddress, Result, TunnelConnection, TunnelError, TunnelRequest};
use crate::ports::Dialer;

/// Dials destinations through a fixed HTTP proxy using `CONNECT`.
///
/// The dialer holds nothing but its construction parameters, so one instance
/// can serve any number of concurrent dials (each gets its own proxy
/// connection from the base dialer).
#[derive(Debug, Clone)]
pub struct TunnelDialer<D> {
    proxy: ProxyAddress,
    base: D,
    headers: HeaderMap,
    handshake_timeout: Option<Duration>,
}

impl<D: Dialer> TunnelDialer<D> {
    pub fn new(proxy: ProxyAddress, base: D) -> Self {
        Self {
            proxy,
            base,
            headers: HeaderMap::new(),
            handshake_timeout: None,
        }
    }

    /// Bound the request write plus response read. Without this the
    /// handshake waits on the proxy for as long as the transport allows.
    pub fn with_handshake_timeout(mut self, limit: Duration) -> Self {
        self.handshake_timeout = Some(limit);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn proxy(&self) -> &ProxyAddress {
        &self.proxy
    }

    pub fn base(&self) -> &D {
        &self.base
    }

    /// Parse `destination` as `host:port` and open a tunnel to it.
    pub async fn dial(&self, destination: &str) -> Result<TunnelConnection<D::Conn>> {
        let destination: HostPort = destination.parse()?;
        self.connect(&destination).await
    }

    /// Open a tunnel to an already parsed destination.
    pub async fn connect(&self, destination: &HostPort) -> Result<TunnelConnection<D::Conn>> {
        let span = debug_span!(
            "tunnel",
            id = %Uuid::new_v4(),
            proxy = %self.proxy,
            destination = %destination
        );
        self.handshake(destination).instrument(span).await
    }

    async fn handshake(&self, destination: &HostPort) -> Result<TunnelConnection<D::Conn>> {
        let conn = self.base.dial(&self.proxy).await.map_err(|err| {
            debug!("proxy dial failed: {}", err);
            TunnelError::ProxyUnreachable(Box::new(err))
        })?;
        debug!("connected to proxy");

        let request = TunnelRequest::new(destination.clone()).with_headers(self.headers.clone());
        let mut conn = BufReader::new(conn);
        let outcome = match self.handshake_timeout {
            Some(limit) => timeout(limit, protocol::exchange(&mut conn, &request))
                .await
                .unwrap_or_else(|_| {
                    Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("no CONNECT response from proxy within {:?}", limit),
                    ))
                }),
            None => protocol::exchange(&mut conn, &request).await,
        };

        match outcome {
            Ok(response) if response.is_established() => {
                let prefetched = Bytes::copy_from_slice(conn.buffer());
                debug!(
                    status = response.status.as_u16(),
                    prefetched = prefetched.len(),
                    "tunnel established"
                );
                Ok(TunnelConnection::new(conn.into_inner(), prefetched, destination.clone()))
            }
            Ok(response) => {
                debug!(status = response.status.as_u16(), "proxy refused tunnel");
                close(conn.into_inner()).await;
                Err(TunnelError::TunnelRejected {
                    status: response.status.as_u16(),
                    reason: response.reason,
                })
            }
            Err(err) => {
                debug!("handshake failed: {}", err);
                close(conn.into_inner()).await;
                Err(TunnelError::TunnelIo(err))
            }
        }
    }
}

async fn close<S: AsyncWrite + Unpin>(mut conn: S) {
    if let Err(err) = conn.shutdown().await {
        debug!("error while closing proxy connection: {}", err);
    }
}

#[async_trait]
impl<D: Dialer> Dialer for TunnelDialer<D> {
    type Conn = TunnelConnection<D::Conn>;
    type Error = TunnelError;

    async fn dial(&self, addr: &HostPort) -> Result<Self::Conn> {
        self.connect(addr).await
    }
}
