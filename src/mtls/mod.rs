//! Mutual TLS (mTLS) client authentication with CA pinning.
//!
//! rustls already rejects client certificates that do not chain to the
//! configured CA store.  That alone is not enough when the server's trust
//! store could ever contain more than one CA: a certificate issued by *any*
//! trusted CA would be accepted.  This module adds an identity-pinning
//! constraint on top of chain validation — the client certificate's
//! Authority Key Identifier must match one specific, pinned CA key
//! identifier byte for byte.
//!
//! # Modules
//!
//! - [`pinning`] — the pinning validator (`CaPinningValidator`, `PinnedKeyId`)
//! - [`identity`] — X.509 subject field extraction (`CertIdentity`)
//! - [`cert_manager`] — rustls config building and certificate generation CLI helpers

pub mod cert_manager;
pub mod identity;
pub mod pinning;

pub use cert_manager::{
    CaParams, CertGenerator, GeneratedCert, LeafCertParams, build_tls_config, load_certs,
    load_private_key, subject_key_id_hex,
};
pub use identity::CertIdentity;
pub use pinning::{CaPinningValidator, ClientCertValidator, PinnedKeyId};
