use crate::domain::{HostPort, TunnelConnection, TunnelDialer, TunnelError};
use crate::ports::Dialer;
use futures::Future;
use hyper::Uri;
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_service::Service;

/// Lets a hyper client reach origin servers through a CONNECT tunnel.
///
/// Every connection the client asks for becomes one tunnel to the URI's
/// authority; pooling and reuse stay with the client.
pub struct TunnelConnector<D> {
    dialer: Arc<TunnelDialer<D>>,
}

impl<D: Dialer> TunnelConnector<D> {
    pub fn new(dialer: TunnelDialer<D>) -> Self {
        Self::from_shared(Arc::new(dialer))
    }

    pub fn from_shared(dialer: Arc<TunnelDialer<D>>) -> Self {
        Self { dialer }
    }
}

impl<D> Clone for TunnelConnector<D> {
    fn clone(&self) -> Self {
        Self {
            dialer: self.dialer.clone(),
        }
    }
}

impl<D> Service<Uri> for TunnelConnector<D>
where
    D: Dialer + 'static,
{
    type Response = TokioIo<TunnelConnection<D::Conn>>;
    type Error = TunnelError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let dialer = self.dialer.clone();

        Box::pin(async move {
            let destination = HostPort::from_uri(&uri)?;
            log::debug!("opening tunnel via {} for {}", dialer.proxy(), uri);

            let conn = dialer.connect(&destination).await?;
            Ok(TokioIo::new(conn))
        })
    }
}

// Requests on a tunnel go out in origin-form: the proxy is no longer
// speaking HTTP once the tunnel is up.
impl<T> Connection for TunnelConnection<T> {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}
