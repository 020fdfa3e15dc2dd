use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::domain::HostPort;
use crate::ports::Dialer;

/// Plain TCP dialer backed by the OS socket stack.
#[derive(Debug, Clone)]
pub struct DirectDialer {
    connect_timeout: Option<Duration>,
    nodelay: bool,
}

impl DirectDialer {
    pub fn new() -> Self {
        Self {
            connect_timeout: None,
            nodelay: true,
        }
    }

    pub fn with_connect_timeout(mut self, limit: Duration) -> Self {
        self.connect_timeout = Some(limit);
        self
    }

    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

impl Default for DirectDialer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dialer for DirectDialer {
    type Conn = TcpStream;
    type Error = io::Error;

    async fn dial(&self, addr: &HostPort) -> io::Result<TcpStream> {
        let target = addr.to_string();
        let stream = match self.connect_timeout {
            Some(limit) => timeout(limit, TcpStream::connect(&target))
                .await
                .map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("timed out connecting to {} after {:?}", target, limit),
                    )
                })??,
            None => TcpStream::connect(&target).await?,
        };
        stream.set_nodelay(self.nodelay)?;
        debug!(peer = ?stream.peer_addr().ok(), "tcp connection to {} established", target);
        Ok(stream)
    }
}
