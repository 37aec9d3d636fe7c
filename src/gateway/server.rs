//! Gate server

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tokio_rustls::TlsAcceptor;
use tracing::{info, warn};

use super::listener::{TlsConnectInfo, TlsListener};
use super::router::create_router;
use crate::config::Config;
use crate::mtls::cert_manager::build_tls_config;
use crate::mtls::pinning::{CaPinningValidator, ClientCertValidator};
use crate::{Error, Result};

/// mTLS gate server
pub struct Gate {
    /// Configuration
    config: Config,
}

impl Gate {
    /// Create a new gate.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration fails validation (missing TLS
    /// material paths, missing or undecodable pinned identifier).
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run the gate until shutdown.
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        // The pinned identifier is decoded once here and injected into the
        // validator; it stays immutable for the process lifetime.
        let pinned = self.config.pinning.pinned_key_id()?;
        let validator: Arc<dyn ClientCertValidator> = Arc::new(CaPinningValidator::new(pinned));

        let tls_config = build_tls_config(&self.config.tls)?;
        let acceptor = TlsAcceptor::from(Arc::new(tls_config));

        let app = create_router(validator);

        let tcp = TcpListener::bind(addr).await?;
        let listener = TlsListener::new(tcp, acceptor);

        info!("============================================================");
        info!("MTLS-GATE v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(
            host = %self.config.server.host,
            port = self.config.server.port,
            "Listening (mTLS, client certificate required)"
        );
        info!(ca_cert = %self.config.tls.ca_cert, "Client certificates must chain to the configured CA");
        warn!(
            "Revocation checking is disabled - CA pinning is the sole trust \
             signal beyond chain validation (revoked but unexpired certificates \
             from the pinned CA are still accepted)"
        );
        info!(
            "  GET https://{}:{}/weatherforecast",
            self.config.server.host, self.config.server.port
        );
        info!("============================================================");

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<TlsConnectInfo>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::Internal(e.to_string()))?;

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
