//! mTLS client-authentication gate with CA pinning.
//!
//! Every inbound connection must present an X.509 client certificate.  The
//! TLS layer (rustls) verifies that the certificate chains to the configured
//! CA store; on top of that, the gate accepts the certificate only if its
//! Authority Key Identifier matches a pinned CA key identifier byte for byte.
//!
//! # Request pipeline
//!
//! ```text
//! TCP connection
//!   → TLS handshake   (rustls verifies client cert against CA store)
//!   → TlsConnectInfo  (peer certificate DER captured per connection)
//!   → certificate_auth middleware (CA pinning check)
//!   → CertIdentity principal injected into request extensions
//!   → HTTP handlers
//! ```
//!
//! # Modules
//!
//! - [`mtls::pinning`] — the CA pinning validator
//! - [`mtls::identity`] — X.509 subject field extraction
//! - [`mtls::cert_manager`] — rustls config building and certificate generation CLI helpers
//! - [`gateway`] — TLS listener, authentication bridge, HTTP router, server

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod mtls;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
