use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use hyper::http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{AddressError, HostPort};

pub const APP_NAME: &str = "httptunnel";

/// Persistent settings, stored with confy under the user's config directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub proxy_host: String,
    pub proxy_port: u16,
    /// `http://host:port`; takes precedence over `proxy_host`/`proxy_port`.
    pub proxy_url: Option<String>,
    pub destination_host: Option<String>,
    pub destination_port: u16,
    /// 0 leaves the TCP connect to the proxy unbounded.
    pub connect_timeout_ms: u64,
    /// 0 leaves the CONNECT exchange unbounded.
    pub handshake_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub headers: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            proxy_host: "localhost".to_string(),
            proxy_port: 3128,
            proxy_url: None,
            destination_host: None,
            destination_port: 22,
            connect_timeout_ms: 10_000,
            handshake_timeout_ms: 30_000,
            probe_timeout_ms: 10_000,
            headers: HashMap::new(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Load(confy::ConfyError),
    Proxy(AddressError),
    Destination(AddressError),
    MissingDestination,
    Header(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Load(err) => write!(f, "Failed to load configuration: {}", err),
            ConfigError::Proxy(err) => write!(f, "Invalid proxy address: {}", err),
            ConfigError::Destination(err) => write!(f, "Invalid destination: {}", err),
            ConfigError::MissingDestination => {
                write!(f, "No destination host configured (use --addr-host)")
            }
            ConfigError::Header(msg) => write!(f, "Invalid header: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Load(err) => Some(err),
            ConfigError::Proxy(err) | ConfigError::Destination(err) => Some(err),
            _ => None,
        }
    }
}

impl Settings {
    /// Load from `path`, or from confy's per-user location when absent.
    /// A missing file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let loaded = match path {
            Some(path) => confy::load_path(path),
            None => confy::load(APP_NAME, None),
        };
        loaded.map_err(ConfigError::Load)
    }

    /// Command-line values win over stored ones.
    pub fn merge(mut self, opts: &Opts) -> Self {
        if let Some(host) = &opts.proxy_host {
            self.proxy_host = host.clone();
            self.proxy_url = None;
        }
        if let Some(port) = opts.proxy_port {
            self.proxy_port = port;
            self.proxy_url = None;
        }
        if let Some(url) = &opts.proxy_url {
            self.proxy_url = Some(url.clone());
        }
        if let Some(host) = &opts.addr_host {
            self.destination_host = Some(host.clone());
        }
        if let Some(port) = opts.addr_port {
            self.destination_port = port;
        }
        if let Some(ms) = opts.connect_timeout_ms {
            self.connect_timeout_ms = ms;
        }
        if let Some(ms) = opts.handshake_timeout_ms {
            self.handshake_timeout_ms = ms;
        }
        for header in &opts.headers {
            if let Some((name, value)) = header.split_once(':') {
                self.headers.insert(name.trim().to_string(), value.trim().to_string());
            } else {
                // Kept as-is so validation reports it.
                self.headers.insert(header.clone(), String::new());
            }
        }
        self
    }

    pub fn proxy_address(&self) -> Result<HostPort, ConfigError> {
        match &self.proxy_url {
            Some(raw) => {
                let url = Url::parse(raw)
                    .map_err(|e| ConfigError::Proxy(AddressError::Malformed(e.to_string())))?;
                HostPort::from_proxy_url(&url).map_err(ConfigError::Proxy)
            }
            None => HostPort::new(self.proxy_host.as_str(), self.proxy_port).map_err(ConfigError::Proxy),
        }
    }

    pub fn destination(&self) -> Result<HostPort, ConfigError> {
        let host = self
            .destination_host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::MissingDestination)?;
        HostPort::new(bracket_ipv6(host), self.destination_port).map_err(ConfigError::Destination)
    }

    pub fn header_map(&self) -> Result<HeaderMap, ConfigError> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| ConfigError::Header(format!("{:?}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ConfigError::Header(format!("{}: {}", name, e)))?;
            map.insert(name, value);
        }
        Ok(map)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.connect_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.handshake_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    if ms == 0 {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}

/// Bare IPv6 literals are accepted on the command line for convenience.
fn bracket_ipv6(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

#[derive(Parser, Debug)]
#[command(version = env!("HTTPTUNNEL_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
#[command(about = "Open a TCP stream through an HTTP CONNECT proxy")]
pub struct Opts {
    /// Configuration file (defaults to the per-user httptunnel config)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Proxy host to tunnel through
    #[arg(long, alias = "proxyhost", global = true)]
    pub proxy_host: Option<String>,

    /// Proxy port
    #[arg(long, alias = "proxyport", global = true)]
    pub proxy_port: Option<u16>,

    /// Proxy as an http://host:port URL
    #[arg(long, global = true, conflicts_with_all = ["proxy_host", "proxy_port"])]
    pub proxy_url: Option<String>,

    /// Destination host
    #[arg(long, alias = "addrhost", global = true)]
    pub addr_host: Option<String>,

    /// Destination port
    #[arg(long, alias = "addrport", global = true)]
    pub addr_port: Option<u16>,

    /// TCP connect timeout towards the proxy, in milliseconds (0 disables)
    #[arg(long, global = true)]
    pub connect_timeout_ms: Option<u64>,

    /// CONNECT handshake timeout, in milliseconds (0 disables)
    #[arg(long, global = true)]
    pub handshake_timeout_ms: Option<u64>,

    /// Extra request header sent to the proxy, as NAME:VALUE
    #[arg(long = "header", short = 'H', global = true)]
    pub headers: Vec<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pipe stdin/stdout through the tunnel (usable as an ssh ProxyCommand)
    Relay,
    /// Print the first line the destination sends through the tunnel
    Probe {
        /// How long to wait for the destination's greeting, in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}
