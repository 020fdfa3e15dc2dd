use std::error::Error;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use httptunnel::adapters::{read_greeting, relay, DirectDialer};
use httptunnel::config::{Command, ConfigError, Opts, Settings};
use httptunnel::domain::{TunnelDialer, TunnelError};

#[tokio::main]
async fn main() {
    init_tracing();
    let opts = Opts::parse();

    let code = match run(opts).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("httptunnel: {}", err);
            exit_code(err.as_ref())
        }
    };
    // tokio's stdin reader sits on a blocking thread that would otherwise
    // hold the runtime open after the tunnel is gone.
    std::process::exit(code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(opts: Opts) -> Result<(), Box<dyn Error>> {
    let settings = Settings::load(opts.config.as_deref())?.merge(&opts);
    let proxy = settings.proxy_address()?;
    let destination = settings.destination()?;

    let mut base = DirectDialer::new();
    if let Some(limit) = settings.connect_timeout() {
        base = base.with_connect_timeout(limit);
    }
    let mut dialer = TunnelDialer::new(proxy, base).with_headers(settings.header_map()?);
    if let Some(limit) = settings.handshake_timeout() {
        dialer = dialer.with_handshake_timeout(limit);
    }

    info!("dialing {} via {}", destination, dialer.proxy());
    let tunnel = dialer.connect(&destination).await?;
    info!("tunnel to {} established", destination);

    match opts.command.unwrap_or(Command::Relay) {
        Command::Relay => {
            let stats = relay(tunnel, tokio::io::stdin(), tokio::io::stdout()).await?;
            info!(sent = ?stats.sent, received = stats.received, "relay finished");
        }
        Command::Probe { timeout_ms } => {
            let limit = timeout_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| settings.probe_timeout());
            let greeting = read_greeting(tunnel, limit).await?;
            println!("{} via {}: {}", destination, dialer.proxy(), greeting);
        }
    }
    Ok(())
}

/// 2: local configuration, 3: proxy unreachable, 4: handshake failure,
/// 5: proxy refused the tunnel, 1: anything after the tunnel was up.
fn exit_code(err: &(dyn Error + 'static)) -> i32 {
    if err.is::<ConfigError>() {
        return 2;
    }
    match err.downcast_ref::<TunnelError>() {
        Some(TunnelError::InvalidDestination(_)) => 2,
        Some(TunnelError::ProxyUnreachable(_)) => 3,
        Some(TunnelError::TunnelIo(_)) => 4,
        Some(TunnelError::TunnelRejected { .. }) => 5,
        None => 1,
    }
}
