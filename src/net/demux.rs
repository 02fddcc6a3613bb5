//! Protocol demultiplexing for the shared TLS port.
//!
//! # Responsibilities
//! - Read the first bytes of each accepted connection
//! - Classify the connection as SSH or anything else (TLS/HTTP)
//! - Hand SSH connections to the passthrough, everything else to the inner acceptor chain
//!
//! # Design Decisions
//! - Classification reads at most `SSH_SIGNATURE.len()` bytes and stops as soon as
//!   the bytes seen can no longer match, so a TLS ClientHello is decided in one read
//! - Short reads, EOF and read errors classify as `Other`; the TLS layer rejects them
//! - The bytes read are always replayed through [`PrefetchedStream`]

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum_server::accept::Accept;
use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};

use crate::net::passthrough;
use crate::net::prefetch::PrefetchedStream;
use crate::observability::metrics;

/// Leading bytes of the SSH version-exchange banner (RFC 4253 §4.2).
pub const SSH_SIGNATURE: &[u8] = b"SSH-";

/// Outcome of sniffing a connection preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Ssh,
    Other,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Ssh => "ssh",
            Protocol::Other => "other",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a preamble.
pub fn classify(prefix: &[u8]) -> Protocol {
    if prefix.starts_with(SSH_SIGNATURE) {
        Protocol::Ssh
    } else {
        Protocol::Other
    }
}

/// Read the protocol preamble from `stream`.
///
/// Returns the classification and exactly the bytes consumed.
pub async fn sniff<S>(stream: &mut S) -> (Protocol, Vec<u8>)
where
    S: AsyncRead + Unpin,
{
    let mut buf = [0u8; SSH_SIGNATURE.len()];
    let mut filled = 0;

    while filled < buf.len() {
        match stream.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => {
                filled += n;
                if !SSH_SIGNATURE.starts_with(&buf[..filled]) {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, bytes = filled, "Preamble read failed");
                break;
            }
        }
    }

    let prefix = buf[..filled].to_vec();
    (classify(&prefix), prefix)
}

/// Acceptor that routes SSH connections to a local SSH service and passes
/// everything else, untouched, to the inner acceptor.
///
/// SSH-classified connections never reach the inner acceptor: the accept
/// future drives the passthrough session and then resolves to an error, so
/// the server drops the connection without serving it.
#[derive(Debug, Clone)]
pub struct DemuxAcceptor<A> {
    inner: A,
    ssh_target: Option<Arc<str>>,
    sniff_timeout: Option<Duration>,
}

impl<A> DemuxAcceptor<A> {
    /// Wrap `inner`, forwarding SSH to `ssh_target` when one is configured.
    pub fn new(inner: A, ssh_target: Option<&str>) -> Self {
        Self {
            inner,
            ssh_target: ssh_target.map(Arc::from),
            sniff_timeout: None,
        }
    }

    /// Bound the preamble read. Connections that stay silent longer are dropped.
    pub fn with_sniff_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.sniff_timeout = timeout;
        self
    }
}

impl<A, I, S> Accept<I, S> for DemuxAcceptor<A>
where
    A: Accept<I, S> + Clone + Send + Sync + 'static,
    A::Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    A::Service: Send + 'static,
    A::Future: Send,
    I: Send + 'static,
    S: Send + 'static,
{
    type Stream = PrefetchedStream<A::Stream>;
    type Service = A::Service;
    type Future = BoxFuture<'static, io::Result<(Self::Stream, Self::Service)>>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let inner = self.inner.clone();
        let ssh_target = self.ssh_target.clone();
        let sniff_timeout = self.sniff_timeout;

        Box::pin(async move {
            let (mut stream, service) = inner.accept(stream, service).await?;

            let (protocol, prefix) = match sniff_timeout {
                Some(limit) => match tokio::time::timeout(limit, sniff(&mut stream)).await {
                    Ok(sniffed) => sniffed,
                    Err(_) => {
                        tracing::debug!(timeout = ?limit, "Preamble not received in time, dropping connection");
                        metrics::record_classification("timeout");
                        return Err(io::Error::new(io::ErrorKind::TimedOut, "preamble timeout"));
                    }
                },
                None => sniff(&mut stream).await,
            };

            metrics::record_classification(protocol.as_str());
            tracing::debug!(protocol = %protocol, bytes = prefix.len(), "Connection classified");

            let stream = PrefetchedStream::new(stream, prefix);
            match protocol {
                Protocol::Other => Ok((stream, service)),
                Protocol::Ssh => {
                    match ssh_target {
                        Some(target) => passthrough::run(stream, &target).await,
                        None => {
                            tracing::debug!("SSH connection on TLS port but no SSH target configured");
                            metrics::record_ssh_session("disabled");
                        }
                    }
                    Err(io::Error::new(
                        io::ErrorKind::ConnectionAborted,
                        "connection handed to SSH passthrough",
                    ))
                }
            }
        })
    }
}
