mod connector;

pub use connector::TunnelConnector;
