//! Certificate management — loading, rustls config building, and CLI helpers.
//!
//! Provides:
//! - [`build_tls_config`] — build a `rustls::ServerConfig` from [`TlsConfig`]
//! - [`load_certs`] / [`load_private_key`] — PEM file loading
//! - [`CertGenerator`] — `rcgen`-backed cert generation for `mtls-gate tls` CLI commands
//! - [`subject_key_id_hex`] — read a CA certificate's SKI for the pinning config
//!
//! # File format
//!
//! All certificate and key files are expected in **PEM format**.  DER is not
//! supported to keep operator tooling simple (openssl, cfssl, cert-manager all
//! default to PEM).
//!
//! # Revocation
//!
//! Revocation checking is **disabled**: no CRL is loaded and no OCSP query is
//! made, since no online CA infrastructure is assumed.  CA pinning is the
//! sole trust signal beyond basic chain validation.  Residual risk: a
//! revoked but unexpired certificate issued by the pinned CA is still
//! accepted until it expires or the pin is rotated.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, Ia5String, IsCa, KeyPair,
    SanType, date_time_ymd,
};
use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use tracing::debug;
use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::FromDer;

use crate::config::TlsConfig;
use crate::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Public: build TLS server config
// ─────────────────────────────────────────────────────────────────────────────

/// Build a `rustls::ServerConfig` for mutual TLS from the gate config.
///
/// Client certificates are mandatory: connections without a certificate, or
/// with a certificate that does not chain to `config.ca_cert`, are rejected
/// at the TLS handshake and never reach HTTP processing.  Self-signed leaf
/// certificates fail chain validation here; only chained certificates are
/// eligible to reach the pinning check.
///
/// # Errors
///
/// Returns an error if any certificate or key file cannot be read or parsed,
/// or if the rustls config cannot be built (e.g. mismatched cert/key pair).
pub fn build_tls_config(config: &TlsConfig) -> Result<ServerConfig> {
    let server_certs = load_certs(&config.server_cert)?;
    let server_key = load_private_key(&config.server_key)?;
    let ca_certs = load_certs(&config.ca_cert)?;

    let mut root_store = rustls::RootCertStore::empty();
    for cert in &ca_certs {
        root_store
            .add(cert.clone())
            .map_err(|e| Error::Config(format!("Failed to add CA cert to trust store: {e}")))?;
    }

    let client_verifier = WebPkiClientVerifier::builder(Arc::new(root_store))
        .build()
        .map_err(|e| Error::Config(format!("Failed to build client verifier: {e}")))?;

    let mut tls_cfg = rustls::ServerConfig::builder()
        .with_client_cert_verifier(client_verifier)
        .with_single_cert(server_certs, server_key)
        .map_err(|e| Error::Config(format!("TLS config error (cert/key mismatch?): {e}")))?;

    // Prefer HTTP/2, fall back to HTTP/1.1
    tls_cfg.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    debug!(
        server_cert = %config.server_cert,
        ca_cert = %config.ca_cert,
        "mTLS config built (client certificate required, revocation checking disabled)"
    );

    Ok(tls_cfg)
}

// ─────────────────────────────────────────────────────────────────────────────
// Public: PEM loading
// ─────────────────────────────────────────────────────────────────────────────

/// Load all certificates from a PEM file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or contains no valid PEM
/// certificate blocks.
pub fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let pem_data = read_file(path)?;
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut pem_data.as_slice())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Config(format!("Failed to parse certs from '{path}': {e}")))?;

    if certs.is_empty() {
        return Err(Error::Config(format!("No certificates found in '{path}'")));
    }

    Ok(certs)
}

/// Load the first private key from a PEM file.
///
/// Supports RSA (`RSA PRIVATE KEY`), PKCS#8 (`PRIVATE KEY`), and EC keys.
///
/// # Errors
///
/// Returns an error if the file cannot be read, contains no private key, or
/// the key format is unsupported.
pub fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let pem_data = read_file(path)?;
    let key = rustls_pemfile::private_key(&mut pem_data.as_slice())
        .map_err(|e| Error::Config(format!("Failed to parse private key from '{path}': {e}")))?
        .ok_or_else(|| Error::Config(format!("No private key found in '{path}'")))?;

    Ok(key)
}

// ─────────────────────────────────────────────────────────────────────────────
// Public: Subject Key Identifier lookup
// ─────────────────────────────────────────────────────────────────────────────

/// Read a certificate's Subject Key Identifier and return it as lowercase
/// hex, most-significant byte first.
///
/// Run against the pinned CA's certificate, the returned string is exactly
/// the value for the `pinning.authority_key_id` configuration field.
///
/// # Errors
///
/// Returns an error if the certificate cannot be parsed or carries no SKI
/// extension.
pub fn subject_key_id_hex(der: &[u8]) -> Result<String> {
    let (_, cert) = X509Certificate::from_der(der)
        .map_err(|e| Error::Config(format!("Failed to parse certificate: {e}")))?;

    cert.extensions()
        .iter()
        .find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::SubjectKeyIdentifier(ski) => Some(hex::encode(ski.0)),
            _ => None,
        })
        .ok_or_else(|| {
            Error::Config("Certificate has no Subject Key Identifier extension".to_string())
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Public: certificate generation (CLI helpers)
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for generating a CA certificate.
#[derive(Debug)]
pub struct CaParams<'a> {
    /// Common Name for the root CA (e.g. `"mtls-gate Root CA"`).
    pub cn: &'a str,
    /// Validity period in days.
    pub validity_days: u32,
}

/// Parameters for generating a leaf certificate (server or client).
#[derive(Debug)]
pub struct LeafCertParams<'a> {
    /// Common Name.
    pub cn: &'a str,
    /// Organisational Unit (optional).
    pub ou: Option<&'a str>,
    /// Subject Alternative Names — DNS entries.
    pub san_dns: Vec<String>,
    /// Validity period in days.
    pub validity_days: u32,
}

/// Generated certificate and key pair in PEM format.
#[derive(Debug)]
pub struct GeneratedCert {
    /// PEM-encoded certificate.
    pub cert_pem: String,
    /// PEM-encoded private key.
    pub key_pem: String,
}

/// Certificate generator backed by `rcgen`.
///
/// Provides high-level wrappers for generating CA and leaf certificates
/// without requiring `openssl` or other external tools.
pub struct CertGenerator;

impl CertGenerator {
    /// Generate a self-signed CA certificate.
    ///
    /// The CA certificate can be used to sign server and client certificates
    /// via [`CertGenerator::issue_leaf`], and its Subject Key Identifier
    /// ([`subject_key_id_hex`]) is the value to pin.
    ///
    /// # Errors
    ///
    /// Returns an error if key generation or certificate serialisation fails.
    pub fn init_ca(params: &CaParams<'_>) -> Result<GeneratedCert> {
        let key_pair = KeyPair::generate()
            .map_err(|e| Error::Config(format!("Failed to generate CA key: {e}")))?;

        let mut ca_params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, params.cn);
        ca_params.distinguished_name = dn;
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params.not_after = validity_to_date(params.validity_days)?;

        let ca_cert = ca_params
            .self_signed(&key_pair)
            .map_err(|e| Error::Config(format!("CA cert generation failed: {e}")))?;

        Ok(GeneratedCert {
            cert_pem: ca_cert.pem(),
            key_pem: key_pair.serialize_pem(),
        })
    }

    /// Issue a leaf certificate (server or client) signed by `ca_cert_pem` /
    /// `ca_key_pem`.
    ///
    /// Issued leaves carry an Authority Key Identifier extension naming the
    /// issuing CA's key identifier, which is what the pinning validator
    /// matches against.
    ///
    /// # Errors
    ///
    /// Returns an error if the CA cert/key cannot be parsed, key generation
    /// fails, or certificate serialisation fails.
    pub fn issue_leaf(
        params: &LeafCertParams<'_>,
        ca_cert_pem: &str,
        ca_key_pem: &str,
    ) -> Result<GeneratedCert> {
        // Parse CA key pair
        let ca_key = KeyPair::from_pem(ca_key_pem)
            .map_err(|e| Error::Config(format!("Failed to parse CA key: {e}")))?;

        // Parse CA certificate for signing
        let ca_cert_params = CertificateParams::from_ca_cert_pem(ca_cert_pem)
            .map_err(|e| Error::Config(format!("Failed to parse CA cert: {e}")))?;
        let ca_cert = ca_cert_params
            .self_signed(&ca_key)
            .map_err(|e| Error::Config(format!("Failed to rebuild CA cert for signing: {e}")))?;

        // Build leaf params
        let leaf_key = KeyPair::generate()
            .map_err(|e| Error::Config(format!("Failed to generate leaf key: {e}")))?;

        let mut leaf_params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, params.cn);
        if let Some(ou) = params.ou {
            dn.push(DnType::OrganizationalUnitName, ou);
        }
        leaf_params.distinguished_name = dn;
        leaf_params.not_after = validity_to_date(params.validity_days)?;
        leaf_params.use_authority_key_identifier_extension = true;

        // Add SANs — rcgen uses Ia5String for DNS SAN types
        let mut sans: Vec<SanType> = Vec::new();
        for dns in &params.san_dns {
            let ia5 = Ia5String::try_from(dns.as_str())
                .map_err(|e| Error::Config(format!("Invalid DNS SAN '{dns}': {e}")))?;
            sans.push(SanType::DnsName(ia5));
        }
        leaf_params.subject_alt_names = sans;

        let leaf_cert = leaf_params
            .signed_by(&leaf_key, &ca_cert, &ca_key)
            .map_err(|e| Error::Config(format!("Leaf cert signing failed: {e}")))?;

        Ok(GeneratedCert {
            cert_pem: leaf_cert.pem(),
            key_pem: leaf_key.serialize_pem(),
        })
    }

    /// Write a [`GeneratedCert`] to disk.
    ///
    /// Writes `<stem>.crt` and `<stem>.key` under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the files
    /// cannot be written.
    pub fn write_to_dir(cert: &GeneratedCert, dir: &Path, stem: &str) -> Result<()> {
        fs::create_dir_all(dir)
            .map_err(|e| Error::Config(format!("Cannot create dir '{}': {e}", dir.display())))?;

        fs::write(dir.join(format!("{stem}.crt")), &cert.cert_pem)
            .map_err(|e| Error::Config(format!("Cannot write cert: {e}")))?;

        fs::write(dir.join(format!("{stem}.key")), &cert.key_pem)
            .map_err(|e| Error::Config(format!("Cannot write key: {e}")))?;

        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Private helpers
// ─────────────────────────────────────────────────────────────────────────────

fn read_file(path: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::Config(format!("Cannot read '{path}': {e}")))
}

/// Convert a validity period (days) into a future `OffsetDateTime` for `rcgen`.
fn validity_to_date(days: u32) -> Result<time::OffsetDateTime> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now_secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Config(format!("System time error: {e}")))?
        .as_secs();

    let future_secs = now_secs.saturating_add(u64::from(days) * 86_400);

    let dt = time::OffsetDateTime::from_unix_timestamp(
        i64::try_from(future_secs).unwrap_or(i64::MAX),
    )
    .map_err(|e| Error::Config(format!("Date calculation error: {e}")))?;

    // Use rcgen's ymd helper to keep alignment with its internal representation
    Ok(date_time_ymd(dt.year(), dt.month() as u8, dt.day()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ca() -> GeneratedCert {
        CertGenerator::init_ca(&CaParams {
            cn: "Test CA",
            validity_days: 365,
        })
        .unwrap()
    }

    // ─── CA generation ────────────────────────────────────────────────────────

    #[test]
    fn init_ca_produces_valid_pem_cert_and_key() {
        let ca = test_ca();
        assert!(ca.cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(ca.key_pem.contains("PRIVATE KEY"));
    }

    #[test]
    fn init_ca_generates_unique_keys_on_each_call() {
        let ca1 = test_ca();
        let ca2 = test_ca();
        assert_ne!(ca1.key_pem, ca2.key_pem);
    }

    // ─── Leaf cert issuance ───────────────────────────────────────────────────

    #[test]
    fn issue_leaf_client_cert_produces_pem() {
        let ca = test_ca();

        let params = LeafCertParams {
            cn: "pinned-client",
            ou: Some("engineering"),
            san_dns: vec![],
            validity_days: 90,
        };
        let leaf = CertGenerator::issue_leaf(&params, &ca.cert_pem, &ca.key_pem).unwrap();
        assert!(leaf.cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(leaf.key_pem.contains("PRIVATE KEY"));
    }

    #[test]
    fn issued_leaf_aki_matches_ca_ski() {
        let ca = test_ca();
        let leaf = CertGenerator::issue_leaf(
            &LeafCertParams {
                cn: "pinned-client",
                ou: None,
                san_dns: vec![],
                validity_days: 30,
            },
            &ca.cert_pem,
            &ca.key_pem,
        )
        .unwrap();

        let ca_der = pem_to_der(&ca.cert_pem);
        let leaf_der = pem_to_der(&leaf.cert_pem);

        let ca_ski = subject_key_id_hex(&ca_der).unwrap();

        // The leaf's raw AKI payload ends with the CA's key identifier.
        let (_, parsed) = X509Certificate::from_der(&leaf_der).unwrap();
        let raw = crate::mtls::pinning::extension_value(
            &parsed,
            &x509_parser::oid_registry::OID_X509_EXT_AUTHORITY_KEY_IDENTIFIER,
        )
        .expect("issued leaf must carry an AKI extension");

        let ski_bytes = hex::decode(&ca_ski).unwrap();
        assert_eq!(&raw[raw.len() - ski_bytes.len()..], ski_bytes.as_slice());
    }

    #[test]
    fn issue_leaf_fails_with_invalid_ca_key() {
        let ca = test_ca();

        let params = LeafCertParams {
            cn: "client",
            ou: None,
            san_dns: vec!["client.local".to_string()],
            validity_days: 30,
        };
        let result = CertGenerator::issue_leaf(&params, &ca.cert_pem, "not a pem key");
        assert!(result.is_err());
    }

    // ─── subject_key_id_hex ───────────────────────────────────────────────────

    #[test]
    fn subject_key_id_hex_is_lowercase_hex() {
        let ca = test_ca();
        let ski = subject_key_id_hex(&pem_to_der(&ca.cert_pem)).unwrap();
        assert!(!ski.is_empty());
        assert!(ski.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ski, ski.to_lowercase());
    }

    #[test]
    fn subject_key_id_hex_fails_on_garbage() {
        assert!(subject_key_id_hex(b"not a cert").is_err());
    }

    // ─── write_to_dir ─────────────────────────────────────────────────────────

    #[test]
    fn write_to_dir_creates_crt_and_key_files() {
        let dir = tempfile::tempdir().unwrap();
        let ca = test_ca();

        CertGenerator::write_to_dir(&ca, dir.path(), "ca").unwrap();

        assert!(dir.path().join("ca.crt").exists());
        assert!(dir.path().join("ca.key").exists());
    }

    // ─── load_certs / load_private_key ────────────────────────────────────────

    #[test]
    fn load_certs_from_generated_pem_file() {
        let dir = tempfile::tempdir().unwrap();
        let ca = test_ca();
        let path = dir.path().join("ca.crt");
        fs::write(&path, &ca.cert_pem).unwrap();

        let certs = load_certs(path.to_str().unwrap()).unwrap();
        assert_eq!(certs.len(), 1);
    }

    #[test]
    fn load_private_key_from_generated_pem_file() {
        let dir = tempfile::tempdir().unwrap();
        let ca = test_ca();
        let path = dir.path().join("ca.key");
        fs::write(&path, &ca.key_pem).unwrap();

        let key = load_private_key(path.to_str().unwrap()).unwrap();
        assert!(!key.secret_der().is_empty());
    }

    #[test]
    fn load_certs_returns_error_for_missing_file() {
        let result = load_certs("/nonexistent/path/ca.crt");
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("Cannot read"));
    }

    #[test]
    fn load_certs_returns_error_for_empty_pem_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.crt");
        fs::write(&path, b"").unwrap();

        let result = load_certs(path.to_str().unwrap());
        assert!(result.is_err());
    }

    #[test]
    fn load_private_key_returns_error_when_no_key_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let ca = test_ca();
        let path = dir.path().join("cert_only.pem");
        fs::write(&path, &ca.cert_pem).unwrap();

        let result = load_private_key(path.to_str().unwrap());
        assert!(result.is_err());
    }

    // ─── helpers ─────────────────────────────────────────────────────────────

    fn pem_to_der(pem: &str) -> Vec<u8> {
        let certs: Vec<CertificateDer<'static>> =
            rustls_pemfile::certs(&mut pem.as_bytes())
                .collect::<std::result::Result<Vec<_>, _>>()
                .unwrap();
        certs[0].as_ref().to_vec()
    }
}
