#![cfg(test)]
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use httptunnel::domain::HostPort;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How the fake proxy answers a CONNECT request.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Act as a real CONNECT proxy: dial the target and relay bytes.
    Relay,
    /// Send these bytes verbatim, then wait for the client to hang up.
    Reply(&'static [u8]),
    /// Send these bytes verbatim and hang up immediately.
    ReplyThenClose(&'static [u8]),
    /// Read the request and never answer.
    Silent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyEvent {
    Request(String),
    ClientClosed,
}

pub struct FakeProxy {
    addr: SocketAddr,
    events: mpsc::UnboundedReceiver<ProxyEvent>,
    _handle: JoinHandle<()>,
}

impl FakeProxy {
    pub async fn start(behavior: Behavior) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, events) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(Self::handle_connection(socket, behavior, tx.clone()));
            }
        });

        Ok(Self {
            addr,
            events,
            _handle: handle,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn host_port(&self) -> HostPort {
        self.addr.to_string().parse().expect("listener address is a valid host:port")
    }

    pub async fn next_event(&mut self) -> Option<ProxyEvent> {
        tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .ok()
            .flatten()
    }

    async fn handle_connection(mut socket: TcpStream, behavior: Behavior, events: mpsc::UnboundedSender<ProxyEvent>) {
        let head = match read_request_head(&mut socket).await {
            Some(head) => head,
            None => return,
        };
        let _ = events.send(ProxyEvent::Request(head.clone()));

        match behavior {
            Behavior::Relay => Self::relay(socket, &head).await,
            Behavior::Reply(reply) => {
                if socket.write_all(reply).await.is_err() {
                    return;
                }
                let mut buf = [0u8; 1024];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => continue,
                    }
                }
                let _ = events.send(ProxyEvent::ClientClosed);
            }
            Behavior::ReplyThenClose(reply) => {
                let _ = socket.write_all(reply).await;
                let _ = socket.shutdown().await;
            }
            Behavior::Silent => {
                let mut buf = [0u8; 1024];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                }
                let _ = events.send(ProxyEvent::ClientClosed);
            }
        }
    }

    async fn relay(mut socket: TcpStream, head: &str) {
        let target = head
            .lines()
            .next()
            .and_then(|line| {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() == 3 && parts[0] == "CONNECT" {
                    Some(parts[1].to_string())
                } else {
                    None
                }
            });

        let target = match target {
            Some(target) => target,
            None => {
                let _ = socket.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").await;
                return;
            }
        };

        match TcpStream::connect(&target).await {
            Ok(mut upstream) => {
                if socket
                    .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
                    .await
                    .is_ok()
                {
                    let _ = tokio::io::copy_bidirectional(&mut socket, &mut upstream).await;
                }
            }
            Err(_) => {
                let _ = socket.write_all(b"HTTP/1.1 502 Bad Gateway\r\n\r\n").await;
            }
        }
    }
}

/// Byte at a time so nothing the client sends after the head is swallowed.
async fn read_request_head(socket: &mut TcpStream) -> Option<String> {
    let mut head = Vec::new();
    while !head.ends_with(b"\r\n\r\n") {
        match socket.read_u8().await {
            Ok(byte) => head.push(byte),
            Err(_) => return None,
        }
    }
    String::from_utf8(head).ok()
}
