//! TLS listener, authentication decision bridge, HTTP router, and server.
//!
//! The authentication decision is split across two hooks, mirroring the TLS
//! stack's own split:
//!
//! - **handshake failure** (lower layer): a client that presents no
//!   certificate, or one that does not chain to the configured CA, is
//!   rejected by rustls inside [`listener::TlsListener`]; the failure is
//!   logged and the connection dropped before HTTP processing.
//! - **certificate validated** (this layer): once the chain is confirmed,
//!   [`auth::certificate_auth_middleware`] runs the CA pinning check on
//!   every request and either establishes a [`crate::mtls::CertIdentity`]
//!   principal or fails the request with a fixed reason.

pub mod auth;
pub mod listener;
pub mod router;
pub mod server;

pub use auth::certificate_auth_middleware;
pub use listener::{TlsConnectInfo, TlsListener};
pub use router::create_router;
pub use server::Gate;
