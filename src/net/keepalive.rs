//! TCP keepalive for accepted connections.
//!
//! Long-lived tunneled sessions (SSH over 443 in particular) rely on
//! keepalive probes to detect dead peers; without them half-open
//! connections accumulate.

use std::io;
use std::time::Duration;

use axum_server::accept::Accept;
use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;

/// Idle time before the first probe, and interval between probes.
pub const KEEPALIVE_PERIOD: Duration = Duration::from_secs(3 * 60);

/// Acceptor that enables keepalive probing on every accepted socket before
/// handing it to the inner acceptor.
#[derive(Debug, Clone)]
pub struct KeepaliveAcceptor<A> {
    inner: A,
    period: Duration,
}

impl<A> KeepaliveAcceptor<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            period: KEEPALIVE_PERIOD,
        }
    }

    /// Override the probe period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

/// Turn on keepalive probing for `stream` with the given period.
pub fn enable_keepalive(stream: &TcpStream, period: Duration) -> io::Result<()> {
    let keepalive = TcpKeepalive::new().with_time(period);
    // Elsewhere (OpenBSD, Solaris, ...) only the idle time can be set.
    #[cfg(any(
        target_os = "android",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "fuchsia",
        target_os = "illumos",
        target_os = "ios",
        target_os = "linux",
        target_os = "macos",
        target_os = "netbsd",
        target_os = "tvos",
        target_os = "watchos",
        target_os = "windows",
    ))]
    let keepalive = keepalive.with_interval(period);
    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}

impl<A, S> Accept<TcpStream, S> for KeepaliveAcceptor<A>
where
    A: Accept<TcpStream, S>,
{
    type Stream = A::Stream;
    type Service = A::Service;
    type Future = A::Future;

    fn accept(&self, stream: TcpStream, service: S) -> Self::Future {
        if let Err(e) = enable_keepalive(&stream, self.period) {
            tracing::warn!(error = %e, "Failed to enable TCP keepalive");
        }
        self.inner.accept(stream, service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_server::accept::DefaultAcceptor;
    use tokio::net::TcpListener;

    async fn accepted_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn accepted_connection_has_keepalive() {
        let (_client, server) = accepted_pair().await;
        let acceptor = KeepaliveAcceptor::new(DefaultAcceptor::new());

        let (stream, ()) = acceptor.accept(server, ()).await.unwrap();
        assert!(SockRef::from(&stream).keepalive().unwrap());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn period_sets_idle_time_and_interval() {
        let (_client, server) = accepted_pair().await;
        let period = Duration::from_secs(42);
        let acceptor = KeepaliveAcceptor::new(DefaultAcceptor::new()).with_period(period);

        let (stream, ()) = acceptor.accept(server, ()).await.unwrap();
        let socket = SockRef::from(&stream);
        assert_eq!(socket.keepalive_time().unwrap(), period);
        assert_eq!(socket.keepalive_interval().unwrap(), period);
    }

    #[tokio::test]
    async fn direct_accept_has_no_keepalive() {
        let (_client, server) = accepted_pair().await;
        assert!(!SockRef::from(&server).keepalive().unwrap());
    }
}
