//! Stream wrapper that replays bytes read ahead of the real consumer.
//!
//! # Responsibilities
//! - Hold the bytes consumed while sniffing the protocol preamble
//! - Serve them to the first reads of the downstream consumer
//! - Pass writes, flushes and shutdown straight through
//!
//! # Design Decisions
//! - The replay buffer is drained before the inner stream is polled again,
//!   so every client byte is delivered exactly once and in order
//! - Once drained, the buffer is released and reads go straight to the inner stream

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// A stream whose first bytes were already read and are replayed on demand.
#[derive(Debug)]
pub struct PrefetchedStream<S> {
    inner: S,
    prefix: Vec<u8>,
    pos: usize,
}

impl<S> PrefetchedStream<S> {
    /// Wrap `inner`, replaying `prefix` before any further reads.
    pub fn new(inner: S, prefix: Vec<u8>) -> Self {
        Self {
            inner,
            prefix,
            pos: 0,
        }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for PrefetchedStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.pos < this.prefix.len() {
            let pending = &this.prefix[this.pos..];
            let n = pending.len().min(buf.remaining());
            buf.put_slice(&pending[..n]);
            this.pos += n;
            if this.pos == this.prefix.len() {
                this.prefix = Vec::new();
                this.pos = 0;
            }
            return Poll::Ready(Ok(()));
        }

        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for PrefetchedStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn replays_prefix_then_reads_inner() {
        let (client, mut server) = tokio::io::duplex(64);
        server.write_all(b" world").await.unwrap();
        drop(server);

        let mut stream = PrefetchedStream::new(client, b"hello".to_vec());
        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn small_reads_drain_prefix_in_order() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);

        let mut stream = PrefetchedStream::new(client, b"abc".to_vec());
        let mut byte = [0u8; 1];
        for expected in b"abc" {
            assert_eq!(stream.read(&mut byte).await.unwrap(), 1);
            assert_eq!(byte[0], *expected);
        }
        assert_eq!(stream.read(&mut byte).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_prefix_is_transparent() {
        let (client, mut server) = tokio::io::duplex(64);
        server.write_all(b"data").await.unwrap();
        drop(server);

        let mut stream = PrefetchedStream::new(client, Vec::new());
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"data");
    }

    #[tokio::test]
    async fn writes_pass_through() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut stream = PrefetchedStream::new(client, b"ignored".to_vec());
        stream.write_all(b"reply").await.unwrap();
        stream.shutdown().await.unwrap();

        let mut out = Vec::new();
        server.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"reply");
    }
}
