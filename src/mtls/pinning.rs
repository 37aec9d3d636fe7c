//! CA pinning validator.
//!
//! Chain validation (performed upstream by rustls) proves a client
//! certificate was issued by *some* trusted CA.  The pinning validator
//! additionally requires that it was issued by one specific CA, identified
//! by the CA's Subject Key Identifier as recorded in the client
//! certificate's Authority Key Identifier extension (OID 2.5.29.35).
//!
//! # Failure semantics
//!
//! Every failure mode — absent certificate, unparseable DER, missing AKI
//! extension, payload shorter than the pin, byte mismatch — collapses to a
//! plain `false` plus one structured log line.  Nothing on this path returns
//! an error or panics; a malformed certificate is a rejection, not a crash.

use std::fmt;

use x509_parser::certificate::X509Certificate;
use x509_parser::oid_registry::{Oid, OID_X509_EXT_AUTHORITY_KEY_IDENTIFIER};
use x509_parser::prelude::FromDer;

use tracing::{debug, error, info};

use crate::{Error, Result};

/// Fixed reason string recorded when a client certificate fails the pinning
/// check.  This exact message is returned to the client and logged.
pub const FAILED_VALIDATION_MSG: &str = "The client certificate failed to validate";

// ─────────────────────────────────────────────────────────────────────────────
// Pinned key identifier
// ─────────────────────────────────────────────────────────────────────────────

/// The trusted CA's Subject Key Identifier, decoded once at startup and held
/// immutable for the process lifetime.
///
/// Typically 20 bytes (a SHA-1 key identifier), but any non-empty length is
/// accepted — the validator compares the trailing `len()` bytes of the AKI
/// extension payload.
#[derive(Clone, PartialEq, Eq)]
pub struct PinnedKeyId(Vec<u8>);

impl PinnedKeyId {
    /// Decode a hex string into a pinned identifier.
    ///
    /// Byte order is preserved exactly as the hex string is written
    /// (most-significant byte first), matching the raw DER encoding of the
    /// key identifier.  Big-integer style decoding would reverse the bytes
    /// and produce a validator that rejects every legitimate certificate.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the string is empty or not valid hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::Config(
                "Pinned authority key identifier is empty".to_string(),
            ));
        }

        let bytes = hex::decode(s).map_err(|e| {
            Error::Config(format!("Invalid pinned authority key identifier hex: {e}"))
        })?;

        Ok(Self(bytes))
    }

    /// The raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Identifier length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the identifier holds no bytes.
    ///
    /// `from_hex` never produces an empty identifier; this exists for
    /// completeness alongside [`PinnedKeyId::len`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for PinnedKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PinnedKeyId({})", hex::encode(&self.0))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validator trait
// ─────────────────────────────────────────────────────────────────────────────

/// Single-capability client certificate validation.
///
/// The authentication bridge depends on this trait rather than the concrete
/// [`CaPinningValidator`], so alternative strategies (multi-CA allow-list,
/// revocation-aware validation) can be substituted without touching it.
pub trait ClientCertValidator: Send + Sync {
    /// Decide whether the presented certificate is acceptable.
    ///
    /// `cert_der` is the DER-encoded leaf certificate as handed over by the
    /// TLS layer after successful chain validation, or `None` when no
    /// certificate is available.  Never fails: every problem with the input
    /// is absorbed and reported as `false`.
    fn is_valid(&self, cert_der: Option<&[u8]>) -> bool;
}

// ─────────────────────────────────────────────────────────────────────────────
// CA pinning validator
// ─────────────────────────────────────────────────────────────────────────────

/// Validates that a client certificate was issued by the pinned CA.
///
/// Stateless apart from the immutable pin: safe to call concurrently from
/// any number of connection tasks without synchronization, and repeated
/// calls on the same certificate always yield the same result.
pub struct CaPinningValidator {
    pinned: PinnedKeyId,
}

impl CaPinningValidator {
    /// Create a validator for one pinned CA key identifier.
    pub fn new(pinned: PinnedKeyId) -> Self {
        Self { pinned }
    }
}

impl ClientCertValidator for CaPinningValidator {
    fn is_valid(&self, cert_der: Option<&[u8]>) -> bool {
        let Some(der) = cert_der else {
            debug!("No client certificate presented");
            return false;
        };

        let cert = match X509Certificate::from_der(der) {
            Ok((_, cert)) => cert,
            Err(e) => {
                error!(error = %e, "Failed to parse client certificate");
                return false;
            }
        };

        let subject = cert.subject().to_string();
        debug!(subject = %subject, "Validating client certificate against pinned CA");

        let Some(raw) = extension_value(&cert, &OID_X509_EXT_AUTHORITY_KEY_IDENTIFIER) else {
            error!(
                subject = %subject,
                "Certificate does not contain the Authority Key Identifier extension"
            );
            return false;
        };

        // The key identifier octets are always the suffix of the encoded
        // field, after the enclosing SEQUENCE and context-tag prefix bytes.
        let n = self.pinned.len();
        if raw.len() < n {
            error!(
                subject = %subject,
                payload_len = raw.len(),
                pinned_len = n,
                "Authority Key Identifier payload shorter than pinned identifier"
            );
            return false;
        }

        if &raw[raw.len() - n..] == self.pinned.as_bytes() {
            info!(subject = %subject, "Certificate validated against the pinned CA");
            true
        } else {
            error!(subject = %subject, "Certificate not signed by the pinned CA");
            false
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Extension reader
// ─────────────────────────────────────────────────────────────────────────────

/// Locate a certificate extension by OID and return its raw encoded payload.
///
/// Matching is by object identifier, never by display name, to avoid
/// locale/naming fragility.  The returned slice is the content of the
/// extension's `extnValue` OCTET STRING.
pub fn extension_value<'a>(cert: &'a X509Certificate<'_>, oid: &Oid<'_>) -> Option<&'a [u8]> {
    cert.extensions()
        .iter()
        .find(|ext| ext.oid == *oid)
        .map(|ext| ext.value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
