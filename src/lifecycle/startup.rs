//! Startup orchestration.
//!
//! # Responsibilities
//! - Load key material and build every virtual host handler
//! - Bind the redirector, plain-HTTP and TLS listeners
//! - Run each endpoint as its own task and report the first one to stop
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal, and every listener is bound before
//!   any endpoint serves, so a TLS bind failure aborts before HTTP traffic is accepted
//! - Endpoints without a listen address (or TLS without a keypair) are skipped
//! - The first endpoint exit, clean or not, ends the whole server

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_server::accept::DefaultAcceptor;
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use axum_server::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::backend::BackendError;
use crate::config::Config;
use crate::http::{redirect_app, secure_app, vhost_app};
use crate::net::demux::DemuxAcceptor;
use crate::net::keepalive::KeepaliveAcceptor;
use crate::net::tls::{KeyMaterial, TlsError};
use crate::routing::VirtualHostRouter;
use crate::security::headers::{HeaderError, SecurityHeaders};

/// The three endpoints the server can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Redirector,
    Http,
    Tls,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndpointKind::Redirector => "Redirector server",
            EndpointKind::Http => "HTTP server",
            EndpointKind::Tls => "TLS server",
        })
    }
}

/// Error type for startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("TLS key material: {0}")]
    Tls(#[from] TlsError),

    #[error("security headers: {0}")]
    Header(#[from] HeaderError),

    #[error("backend: {0}")]
    Backend(#[from] BackendError),

    #[error("{endpoint}: failed to bind {addr}: {source}")]
    Bind {
        endpoint: EndpointKind,
        addr: String,
        source: io::Error,
    },

    #[error("no endpoint configured")]
    NoEndpoints,
}

/// How an endpoint stopped.
#[derive(Debug)]
pub struct EndpointExit {
    pub endpoint: EndpointKind,
    pub result: io::Result<()>,
}

enum Service {
    Plain(Router),
    Tls {
        app: Router,
        tls: RustlsConfig,
        ssh_target: Option<String>,
        sniff_timeout: Option<Duration>,
    },
}

struct Endpoint {
    kind: EndpointKind,
    listener: std::net::TcpListener,
    handle: Handle,
    service: Service,
}

impl Endpoint {
    fn new(kind: EndpointKind, addr: &str, service: Service) -> Result<Self, StartupError> {
        let bind_error = |source| StartupError::Bind {
            endpoint: kind,
            addr: addr.to_string(),
            source,
        };
        let listener = std::net::TcpListener::bind(addr).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;

        Ok(Self {
            kind,
            listener,
            handle: Handle::new(),
            service,
        })
    }

    async fn serve(self) -> io::Result<()> {
        let addr = self.listener.local_addr()?;
        tracing::info!(endpoint = %self.kind, address = %addr, "Starting endpoint");

        let server = axum_server::from_tcp(self.listener).handle(self.handle);
        let plain = KeepaliveAcceptor::new(DefaultAcceptor::new());

        match self.service {
            Service::Plain(app) => server.acceptor(plain).serve(app.into_make_service()).await,
            Service::Tls {
                app,
                tls,
                ssh_target,
                sniff_timeout,
            } => {
                let demux = DemuxAcceptor::new(plain, ssh_target.as_deref())
                    .with_sniff_timeout(sniff_timeout);
                let acceptor = RustlsAcceptor::new(tls).acceptor(demux);
                server.acceptor(acceptor).serve(app.into_make_service()).await
            }
        }
    }
}

/// Owns the bound endpoints until they run.
pub struct Orchestrator {
    endpoints: Vec<Endpoint>,
}

impl Orchestrator {
    /// Load key material, build the virtual hosts and bind every configured endpoint.
    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let key = config
            .tls
            .keypair()
            .map(|(cert, key)| KeyMaterial::load(cert, key))
            .transpose()?;
        let vhosts = Arc::new(VirtualHostRouter::from_config(
            &config.hosts,
            &config.default_host,
        )?);
        Self::bind(config, vhosts, key.as_ref())
    }

    /// Bind the configured endpoints in order: redirector, HTTP, TLS.
    pub fn bind(
        config: &Config,
        vhosts: Arc<VirtualHostRouter>,
        key: Option<&KeyMaterial>,
    ) -> Result<Self, StartupError> {
        let mut endpoints = Vec::new();

        match &config.redirector.listen {
            Some(addr) => endpoints.push(Endpoint::new(
                EndpointKind::Redirector,
                addr,
                Service::Plain(redirect_app(&config.default_host)),
            )?),
            None => tracing::info!(endpoint = %EndpointKind::Redirector, "No listen address, skipping"),
        }

        match &config.http.listen {
            Some(addr) => endpoints.push(Endpoint::new(
                EndpointKind::Http,
                addr,
                Service::Plain(vhost_app(Arc::clone(&vhosts))),
            )?),
            None => tracing::info!(endpoint = %EndpointKind::Http, "No listen address, skipping"),
        }

        match (&config.tls.listen, key) {
            (None, _) => tracing::info!(endpoint = %EndpointKind::Tls, "No listen address, skipping"),
            (Some(_), None) => tracing::info!(endpoint = %EndpointKind::Tls, "No keypair, skipping"),
            (Some(addr), Some(key)) => {
                let headers = SecurityHeaders::compute(&config.tls, key.leaf_spki())?;
                let sniff_timeout = match config.tls.sniff_timeout_secs {
                    0 => None,
                    secs => Some(Duration::from_secs(secs)),
                };
                endpoints.push(Endpoint::new(
                    EndpointKind::Tls,
                    addr,
                    Service::Tls {
                        app: secure_app(vhosts, &headers),
                        tls: RustlsConfig::from_config(key.server_config()),
                        ssh_target: config.tls.ssh.clone(),
                        sniff_timeout,
                    },
                )?);
            }
        }

        if endpoints.is_empty() {
            return Err(StartupError::NoEndpoints);
        }
        Ok(Self { endpoints })
    }

    /// Endpoints that will run, in start order.
    pub fn endpoints(&self) -> Vec<EndpointKind> {
        self.endpoints.iter().map(|e| e.kind).collect()
    }

    /// Bound address of an endpoint.
    pub fn local_addr(&self, kind: EndpointKind) -> Option<SocketAddr> {
        self.find(kind).and_then(|e| e.listener.local_addr().ok())
    }

    /// Shutdown handle of an endpoint.
    pub fn handle(&self, kind: EndpointKind) -> Option<Handle> {
        self.find(kind).map(|e| e.handle.clone())
    }

    fn find(&self, kind: EndpointKind) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.kind == kind)
    }

    /// Run every endpoint concurrently until the first one stops.
    ///
    /// The remaining endpoints are aborted before this returns. Returns `None`
    /// only if every endpoint task panicked.
    pub async fn run(self) -> Option<EndpointExit> {
        let (exit_tx, mut exit_rx) = mpsc::channel(self.endpoints.len());
        let mut tasks = JoinSet::new();

        for endpoint in self.endpoints {
            let exit_tx = exit_tx.clone();
            tasks.spawn(async move {
                let kind = endpoint.kind;
                let result = endpoint.serve().await;
                let _ = exit_tx.send(EndpointExit { endpoint: kind, result }).await;
            });
        }
        drop(exit_tx);

        let exit = exit_rx.recv().await;
        tasks.shutdown().await;
        exit
    }
}
