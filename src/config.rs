//! Configuration management

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::mtls::pinning::PinnedKeyId;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// TLS material configuration
    pub tls: TlsConfig,
    /// CA pinning configuration
    pub pinning: PinningConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8443,
        }
    }
}

/// TLS material configuration.
///
/// Client certificates are always required: connections without a
/// certificate that chains to `ca_cert` are rejected at the TLS handshake
/// and never reach HTTP processing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to the PEM-encoded server certificate file.
    pub server_cert: String,

    /// Path to the PEM-encoded server private key file.
    pub server_key: String,

    /// Path to the PEM-encoded CA certificate used to verify client certs.
    pub ca_cert: String,
}

/// CA pinning configuration.
///
/// The pinned identifier is loaded once at startup and held immutable for
/// the process lifetime, so the pin can be rotated by restarting with new
/// configuration rather than rebuilding the binary.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PinningConfig {
    /// The trusted CA's Subject Key Identifier as a hex string
    /// (e.g. `"e9be86f64eb53bc12c1b5fe0f63df450274811da"`).
    ///
    /// Decoded most-significant byte first, matching the raw DER encoding.
    /// Obtain it from the CA certificate with `mtls-gate tls show-key-id`.
    pub authority_key_id: String,
}

impl PinningConfig {
    /// Decode the configured hex string into an immutable pinned identifier.
    pub fn pinned_key_id(&self) -> Result<PinnedKeyId> {
        PinnedKeyId::from_hex(&self.authority_key_id)
    }
}

impl Config {
    /// Load configuration from an optional YAML file merged with
    /// `MTLS_GATE_`-prefixed environment variables (`__` separates nesting,
    /// e.g. `MTLS_GATE_PINNING__AUTHORITY_KEY_ID`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (MTLS_GATE_ prefix)
        figment = figment.merge(Env::prefixed("MTLS_GATE_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(config)
    }

    /// Validate that the configuration is serveable.
    ///
    /// Checks the pinned identifier decodes and that TLS material paths are
    /// set.  File existence is checked later when the files are read.
    pub fn validate(&self) -> Result<()> {
        self.pinning.pinned_key_id()?;

        for (field, value) in [
            ("tls.server_cert", &self.tls.server_cert),
            ("tls.server_key", &self.tls.server_key),
            ("tls.ca_cert", &self.tls.ca_cert),
        ] {
            if value.is_empty() {
                return Err(Error::Config(format!("Missing required field: {field}")));
            }
        }

        Ok(())
    }
}
