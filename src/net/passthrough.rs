//! SSH passthrough.
//!
//! Bridges an SSH-classified client connection to the local SSH service.
//! Each session is independent; failures end only that session.

use std::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::observability::metrics;

/// Side whose stream ended the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosedBy {
    Client,
    Target,
}

impl fmt::Display for ClosedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClosedBy::Client => "client",
            ClosedBy::Target => "target",
        })
    }
}

/// Connect to `target` and copy bytes in both directions until either side
/// closes or fails.
///
/// The first direction to finish ends the session: both connections are
/// closed on return, whether or not the other peer has sent EOF. Returns the
/// side that closed and the bytes it sent.
pub async fn forward<S>(client: S, target: &str) -> io::Result<(ClosedBy, u64)>
where
    S: AsyncRead + AsyncWrite,
{
    let upstream = TcpStream::connect(target).await?;
    let _ = upstream.set_nodelay(true);

    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut upstream_read, mut upstream_write) = upstream.into_split();

    let outbound = async {
        let sent = tokio::io::copy(&mut client_read, &mut upstream_write).await?;
        let _ = upstream_write.shutdown().await;
        Ok::<_, io::Error>(sent)
    };
    let inbound = async {
        let received = tokio::io::copy(&mut upstream_read, &mut client_write).await?;
        let _ = client_write.shutdown().await;
        Ok::<_, io::Error>(received)
    };

    tokio::select! {
        sent = outbound => sent.map(|n| (ClosedBy::Client, n)),
        received = inbound => received.map(|n| (ClosedBy::Target, n)),
    }
}

/// Run one passthrough session, logging its outcome.
pub async fn run<S>(client: S, target: &str)
where
    S: AsyncRead + AsyncWrite,
{
    tracing::debug!(target_addr = %target, "Starting SSH passthrough");

    match forward(client, target).await {
        Ok((closed_by, bytes)) => {
            metrics::record_ssh_session("completed");
            tracing::debug!(
                target_addr = %target,
                closed_by = %closed_by,
                bytes = bytes,
                "SSH passthrough closed"
            );
        }
        Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
            metrics::record_ssh_session("unreachable");
            tracing::warn!(target_addr = %target, error = %e, "SSH target unreachable");
        }
        Err(e) => {
            metrics::record_ssh_session("error");
            tracing::debug!(target_addr = %target, error = %e, "SSH passthrough failed");
        }
    }
}
