use crate::domain::HostPort;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// Port for opening a duplex byte stream to a `host:port`.
///
/// The platform TCP dialer implements it, and so does the tunnel dialer,
/// which is what lets tunnels be stacked on top of each other.
#[async_trait]
pub trait Dialer: Send + Sync {
    type Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a connection to `addr`.
    ///
    /// No deadline is implied; implementations that need one say so.
    async fn dial(&self, addr: &HostPort) -> Result<Self::Conn, Self::Error>;
}
