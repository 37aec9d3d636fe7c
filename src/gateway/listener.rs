//! TLS listener with per-connection client certificate capture.
//!
//! Implements [`axum::serve::Listener`] over a TCP listener plus a rustls
//! acceptor, so the gate can be served with plain `axum::serve`.  The peer
//! leaf certificate is captured into [`TlsConnectInfo`] and made available
//! to request handlers via `into_make_service_with_connect_info`.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::connect_info::Connected;
use axum::serve::{IncomingStream, Listener};
use rustls::pki_types::CertificateDer;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;
use tracing::warn;

/// TCP listener wrapped with a rustls acceptor.
///
/// The handshake runs on the accept path, so a slow client delays the next
/// accept.  Acceptable at this gate's scale; connection storms are the load
/// balancer's problem.
pub struct TlsListener {
    inner: TcpListener,
    acceptor: TlsAcceptor,
}

impl TlsListener {
    /// Wrap a bound TCP listener with a TLS acceptor.
    pub fn new(inner: TcpListener, acceptor: TlsAcceptor) -> Self {
        Self { inner, acceptor }
    }
}

impl Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            let (tcp, addr) = match self.inner.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    // Persistent errors (EMFILE and friends) would otherwise
                    // hot-spin this loop.
                    warn!(error = %e, "TCP accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    continue;
                }
            };

            // Lower-layer authentication failures end here: rustls rejects
            // clients without a certificate or with one that does not chain
            // to the configured CA.  Log and drop; no retry, and nothing
            // reaches HTTP processing.
            match self.acceptor.accept(tcp).await {
                Ok(tls) => return (tls, addr),
                Err(e) => {
                    warn!(peer = %addr, error = %e, "TLS handshake failed");
                }
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

/// Per-connection info: remote address plus the peer's leaf certificate as
/// presented during the handshake.
///
/// The certificate is held for the duration of the connection only and is
/// never mutated; the pinning validator borrows it per request.
#[derive(Debug, Clone)]
pub struct TlsConnectInfo {
    /// Remote peer address.
    pub remote_addr: SocketAddr,
    /// DER-encoded leaf certificate presented by the client, if any.
    pub client_cert: Option<CertificateDer<'static>>,
}

impl Connected<IncomingStream<'_, TlsListener>> for TlsConnectInfo {
    fn connect_info(stream: IncomingStream<'_, TlsListener>) -> Self {
        let (_, session) = stream.io().get_ref();
        let client_cert = session
            .peer_certificates()
            .and_then(|certs| certs.first())
            .cloned();

        Self {
            remote_addr: *stream.remote_addr(),
            client_cert,
        }
    }
}
