//! Dial TCP destinations through an HTTP proxy with `CONNECT`.
//!
//! [`domain::TunnelDialer`] wraps any [`ports::Dialer`] (usually
//! [`adapters::DirectDialer`]) and returns a plain duplex stream once the
//! proxy has answered `200`. Whatever protocol runs on top, SSH included, never
//! sees any HTTP.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
