use std::fmt;
use std::str::FromStr;

pub use hyper::http::{HeaderMap, StatusCode};
use hyper::http::uri::{Authority, Uri};
use url::Url;

use super::AddressError;

/// A `host:port` pair, used both for the proxy address and for tunnel
/// destinations. IPv6 hosts keep their brackets so `to_string()` can be fed
/// straight back into a socket connect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostPort {
    host: String,
    port: u16,
}

pub type ProxyAddress = HostPort;
pub type Destination = HostPort;

impl HostPort {
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, AddressError> {
        format!("{}:{}", host.into(), port).parse()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn from_authority(authority: &Authority) -> Result<Self, AddressError> {
        if authority.as_str().contains('@') {
            return Err(AddressError::UserInfo);
        }
        let host = authority.host();
        if host.is_empty() {
            return Err(AddressError::MissingHost);
        }
        let port_text = authority.as_str()[host.len()..]
            .strip_prefix(':')
            .ok_or(AddressError::MissingPort)?;
        Ok(Self {
            host: host.to_string(),
            port: parse_port(port_text)?,
        })
    }

    /// Destination for a request URI, defaulting the port from the scheme.
    pub fn from_uri(uri: &Uri) -> Result<Self, AddressError> {
        let host = uri.host().filter(|h| !h.is_empty()).ok_or(AddressError::MissingHost)?;
        if uri.authority().map_or(false, |a| a.as_str().contains('@')) {
            return Err(AddressError::UserInfo);
        }
        let port = match uri.port() {
            Some(port) => parse_port(port.as_str())?,
            None => match uri.scheme_str() {
                Some("http") => 80,
                Some("https") => 443,
                _ => return Err(AddressError::MissingPort),
            },
        };
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Proxy address from an `http://host[:port]` URL.
    pub fn from_proxy_url(url: &Url) -> Result<Self, AddressError> {
        if url.scheme() != "http" {
            return Err(AddressError::Malformed(format!(
                "unsupported proxy scheme {}",
                url.scheme()
            )));
        }
        if !url.username().is_empty() || url.password().is_some() {
            return Err(AddressError::UserInfo);
        }
        let host = url.host_str().filter(|h| !h.is_empty()).ok_or(AddressError::MissingHost)?;
        let port = url.port_or_known_default().ok_or(AddressError::MissingPort)?;
        Self::new(host, port)
    }
}

fn parse_port(text: &str) -> Result<u16, AddressError> {
    match text.parse::<u16>() {
        Ok(0) | Err(_) => Err(AddressError::InvalidPort(text.to_string())),
        Ok(port) => Ok(port),
    }
}

impl FromStr for HostPort {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        let authority: Authority = s
            .parse()
            .map_err(|e: hyper::http::uri::InvalidUri| AddressError::Malformed(e.to_string()))?;
        Self::from_authority(&authority)
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The single request written on a fresh proxy connection.
#[derive(Debug, Clone)]
pub struct TunnelRequest {
    destination: HostPort,
    headers: HeaderMap,
}

impl TunnelRequest {
    pub fn new(destination: HostPort) -> Self {
        Self {
            destination,
            headers: HeaderMap::new(),
        }
    }

    /// Extra headers sent after `Host`. A `Host` entry here is ignored.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut request = format!(
            "CONNECT {authority} HTTP/1.1\r\nHost: {authority}\r\n",
            authority = self.destination
        )
        .into_bytes();
        for (name, value) in self.headers.iter() {
            if *name == hyper::http::header::HOST {
                continue;
            }
            request.extend_from_slice(name.as_str().as_bytes());
            request.extend_from_slice(b": ");
            request.extend_from_slice(value.as_bytes());
            request.extend_from_slice(b"\r\n");
        }
        request.extend_from_slice(b"\r\n");
        request
    }
}

/// Head of the proxy's answer to a CONNECT request.
#[derive(Debug, Clone)]
pub struct TunnelResponse {
    /// Minor HTTP/1 version (`0` or `1`).
    pub version: u8,
    pub status: StatusCode,
    pub reason: String,
    pub headers: HeaderMap,
}

impl TunnelResponse {
    pub fn is_established(&self) -> bool {
        self.status == StatusCode::OK
    }
}
