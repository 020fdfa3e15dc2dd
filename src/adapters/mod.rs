pub mod hyper_client;
pub mod session;
pub mod tcp;

pub use hyper_client::TunnelConnector;
pub use session::{read_greeting, relay, RelayStats};
pub use tcp::DirectDialer;
