use std::{error::Error as StdError, fmt, io};

/// Reasons a `host:port` string is not a usable address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    Empty,
    Malformed(String),
    MissingHost,
    MissingPort,
    InvalidPort(String),
    UserInfo,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressError::Empty => write!(f, "address is empty"),
            AddressError::Malformed(msg) => write!(f, "malformed authority: {}", msg),
            AddressError::MissingHost => write!(f, "missing host"),
            AddressError::MissingPort => write!(f, "missing port"),
            AddressError::InvalidPort(port) => write!(f, "invalid port {:?}", port),
            AddressError::UserInfo => write!(f, "user info is not allowed in an address"),
        }
    }
}

impl StdError for AddressError {}

/// Failures of a single tunnel dial.
///
/// Every variant is scoped to one call: when one of these is returned the
/// proxy connection (if any was opened) has already been shut down.
#[derive(Debug)]
pub enum TunnelError {
    /// The destination could not be parsed; nothing was dialed.
    InvalidDestination(AddressError),
    /// The base dialer could not reach the proxy.
    ProxyUnreachable(Box<dyn StdError + Send + Sync>),
    /// Transport or framing failure while exchanging the CONNECT request.
    TunnelIo(io::Error),
    /// The proxy answered with something other than `200`.
    TunnelRejected { status: u16, reason: String },
}

impl TunnelError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TunnelError::TunnelRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TunnelError::TunnelIo(err) if err.kind() == io::ErrorKind::TimedOut)
    }
}

impl fmt::Display for TunnelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelError::InvalidDestination(err) => write!(f, "Invalid destination: {}", err),
            TunnelError::ProxyUnreachable(err) => write!(f, "Proxy unreachable: {}", err),
            TunnelError::TunnelIo(err) => write!(f, "Tunnel handshake failed: {}", err),
            TunnelError::TunnelRejected { status, reason } => {
                write!(f, "Tunnel rejected by proxy: {} {}", status, reason)
            }
        }
    }
}

impl StdError for TunnelError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TunnelError::InvalidDestination(err) => Some(err),
            TunnelError::ProxyUnreachable(err) => Some(&**err),
            TunnelError::TunnelIo(err) => Some(err),
            TunnelError::TunnelRejected { .. } => None,
        }
    }
}

impl From<AddressError> for TunnelError {
    fn from(err: AddressError) -> Self {
        TunnelError::InvalidDestination(err)
    }
}

pub type Result<T> = std::result::Result<T, TunnelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_display_carries_status_line() {
        let err = TunnelError::TunnelRejected {
            status: 407,
            reason: "Proxy Authentication Required".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Tunnel rejected by proxy: 407 Proxy Authentication Required"
        );
        assert_eq!(err.status(), Some(407));
        assert!(err.source().is_none());
    }

    #[test]
    fn test_io_source_is_preserved() {
        let err = TunnelError::TunnelIo(io::Error::new(io::ErrorKind::TimedOut, "slow proxy"));
        assert!(err.is_timeout());
        assert_eq!(err.source().map(|s| s.to_string()), Some("slow proxy".to_string()));
    }
}
