pub mod connection;
pub mod dialer;
pub mod errors;
pub mod models;
pub mod protocol;

pub use connection::TunnelConnection;
pub use dialer::TunnelDialer;
pub use errors::*;
pub use models::*;
