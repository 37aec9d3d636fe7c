//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// mTLS client-authentication gate with CA pinning
#[derive(Parser, Debug)]
#[command(name = "mtls-gate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "MTLS_GATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "MTLS_GATE_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "MTLS_GATE_HOST")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "MTLS_GATE_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "MTLS_GATE_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the gate server (default)
    Serve,

    /// Certificate tooling commands
    #[command(subcommand)]
    Tls(TlsCommand),
}

/// Certificate tooling subcommands
#[derive(Subcommand, Debug)]
pub enum TlsCommand {
    /// Generate a self-signed CA certificate and key
    InitCa {
        /// Common Name for the CA
        #[arg(long, default_value = "mtls-gate Root CA")]
        cn: String,

        /// Validity period in days
        #[arg(long, default_value_t = 3650)]
        validity_days: u32,

        /// Output directory (writes ca.crt / ca.key)
        #[arg(short, long, default_value = "tls")]
        out_dir: PathBuf,
    },

    /// Issue a leaf certificate (server or client) signed by a CA
    Issue {
        /// Common Name for the leaf certificate
        #[arg(long, required = true)]
        cn: String,

        /// Organizational Unit (optional)
        #[arg(long)]
        ou: Option<String>,

        /// DNS Subject Alternative Names (repeatable)
        #[arg(long = "san-dns")]
        san_dns: Vec<String>,

        /// Validity period in days
        #[arg(long, default_value_t = 365)]
        validity_days: u32,

        /// Path to the CA certificate (PEM)
        #[arg(long, default_value = "tls/ca.crt")]
        ca_cert: PathBuf,

        /// Path to the CA private key (PEM)
        #[arg(long, default_value = "tls/ca.key")]
        ca_key: PathBuf,

        /// Output directory (writes <cn>.crt / <cn>.key)
        #[arg(short, long, default_value = "tls")]
        out_dir: PathBuf,
    },

    /// Print a certificate's Subject Key Identifier as hex
    ///
    /// Run this against the CA certificate to obtain the value for the
    /// `pinning.authority_key_id` configuration field.
    ShowKeyId {
        /// Path to the certificate (PEM)
        #[arg(required = true)]
        cert: PathBuf,
    },
}
