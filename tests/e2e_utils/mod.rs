#![cfg(test)]
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fake_proxy;
pub mod greeting_server;

pub use fake_proxy::{Behavior, FakeProxy, ProxyEvent};
pub use greeting_server::GreetingServer;

use httptunnel::adapters::DirectDialer;
use httptunnel::domain::TunnelDialer;

pub fn tunnel_via(proxy: &FakeProxy) -> TunnelDialer<DirectDialer> {
    TunnelDialer::new(proxy.host_port(), DirectDialer::new())
}
