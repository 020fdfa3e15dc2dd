#![cfg(test)]
#![allow(dead_code)]

use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A destination that talks first, like an SSH server, then echoes.
pub struct GreetingServer {
    addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl GreetingServer {
    pub const GREETING: &'static str = "SSH-2.0-FakeSSH_1.0\r\n";

    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    if socket.write_all(Self::GREETING.as_bytes()).await.is_err() {
                        return;
                    }
                    let (mut reader, mut writer) = socket.split();
                    let _ = tokio::io::copy(&mut reader, &mut writer).await;
                });
            }
        });

        Ok(Self { addr, _handle: handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}
