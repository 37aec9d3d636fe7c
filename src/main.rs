//! mtls-gate - mTLS client-authentication gate with CA pinning.

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use mtls_gate::{
    cli::{Cli, Command, TlsCommand},
    config::Config,
    gateway::Gate,
    mtls::{CaParams, CertGenerator, LeafCertParams, load_certs, subject_key_id_hex},
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    // Handle subcommands
    match cli.command {
        Some(Command::Tls(tls_cmd)) => run_tls_command(&tls_cmd),
        Some(Command::Serve) | None => run_server(cli).await,
    }
}

/// Run the gate server
async fn run_server(cli: Cli) -> ExitCode {
    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            // Apply CLI overrides
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(ref host) = cli.host {
                config.server.host = host.clone();
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        "Starting mtls-gate"
    );

    // Create and run the gate
    let gate = match Gate::new(config) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to create gate: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Run with graceful shutdown
    if let Err(e) = gate.run().await {
        error!("Gate error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Gate shutdown complete");
    ExitCode::SUCCESS
}

/// Run certificate tooling commands
fn run_tls_command(cmd: &TlsCommand) -> ExitCode {
    match cmd {
        TlsCommand::InitCa {
            cn,
            validity_days,
            out_dir,
        } => {
            let ca = match CertGenerator::init_ca(&CaParams {
                cn,
                validity_days: *validity_days,
            }) {
                Ok(ca) => ca,
                Err(e) => {
                    eprintln!("❌ Failed to generate CA: {e}");
                    return ExitCode::FAILURE;
                }
            };

            if let Err(e) = CertGenerator::write_to_dir(&ca, out_dir, "ca") {
                eprintln!("❌ Failed to write CA files: {e}");
                return ExitCode::FAILURE;
            }

            println!("✅ CA written to {}/ca.crt and ca.key", out_dir.display());
            match show_key_id(&out_dir.join("ca.crt")) {
                Ok(ski) => {
                    println!("\nPin this CA in your configuration:");
                    println!("pinning:");
                    println!("  authority_key_id: \"{ski}\"");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("❌ Failed to read CA key identifier: {e}");
                    ExitCode::FAILURE
                }
            }
        }

        TlsCommand::Issue {
            cn,
            ou,
            san_dns,
            validity_days,
            ca_cert,
            ca_key,
            out_dir,
        } => {
            let ca_cert_pem = match fs::read_to_string(ca_cert) {
                Ok(pem) => pem,
                Err(e) => {
                    eprintln!("❌ Cannot read CA cert '{}': {e}", ca_cert.display());
                    return ExitCode::FAILURE;
                }
            };
            let ca_key_pem = match fs::read_to_string(ca_key) {
                Ok(pem) => pem,
                Err(e) => {
                    eprintln!("❌ Cannot read CA key '{}': {e}", ca_key.display());
                    return ExitCode::FAILURE;
                }
            };

            let params = LeafCertParams {
                cn,
                ou: ou.as_deref(),
                san_dns: san_dns.clone(),
                validity_days: *validity_days,
            };

            match CertGenerator::issue_leaf(&params, &ca_cert_pem, &ca_key_pem) {
                Ok(leaf) => {
                    if let Err(e) = CertGenerator::write_to_dir(&leaf, out_dir, cn) {
                        eprintln!("❌ Failed to write cert files: {e}");
                        return ExitCode::FAILURE;
                    }
                    println!(
                        "✅ Certificate written to {}/{cn}.crt and {cn}.key",
                        out_dir.display()
                    );
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("❌ Failed to issue certificate: {e}");
                    ExitCode::FAILURE
                }
            }
        }

        TlsCommand::ShowKeyId { cert } => match show_key_id(cert) {
            Ok(ski) => {
                println!("{ski}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ {e}");
                ExitCode::FAILURE
            }
        },
    }
}

/// Read the first certificate from a PEM file and return its SKI as hex
fn show_key_id(path: &Path) -> mtls_gate::Result<String> {
    let certs = load_certs(&path.to_string_lossy())?;
    subject_key_id_hex(certs[0].as_ref())
}
