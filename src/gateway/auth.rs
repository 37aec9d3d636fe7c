//! Certificate authentication middleware — the "certificate validated" hook.
//!
//! Runs after the TLS layer has already confirmed the certificate chains to
//! the configured CA.  The middleware hands the peer certificate to the
//! [`ClientCertValidator`] and converts its boolean answer into either an
//! established principal ([`CertIdentity`] in the request extensions) or a
//! 401 rejection carrying the fixed failure reason.
//!
//! The caller never needs to distinguish *why* pinning failed (missing
//! extension, short payload, mismatch, parse fault) — the validator logs
//! the reason and every failure class collapses to the same rejection.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, info, warn};

use super::listener::TlsConnectInfo;
use crate::mtls::identity::CertIdentity;
use crate::mtls::pinning::{ClientCertValidator, FAILED_VALIDATION_MSG};

/// Certificate authentication middleware
pub async fn certificate_auth_middleware(
    State(validator): State<Arc<dyn ClientCertValidator>>,
    ConnectInfo(conn): ConnectInfo<TlsConnectInfo>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    debug!(peer = %conn.remote_addr, path = %request.uri().path(), "CA pinning check");

    let cert_der: Option<&[u8]> = conn.client_cert.as_ref().map(|c| c.as_ref());

    if !validator.is_valid(cert_der) {
        warn!(peer = %conn.remote_addr, "{FAILED_VALIDATION_MSG}");
        return failed_validation_response();
    }

    // Principal established.  The identity parse cannot realistically fail
    // here (the validator just parsed the same bytes), but a default
    // principal beats a 500 if it ever does.
    let identity = conn
        .client_cert
        .as_ref()
        .and_then(|c| CertIdentity::from_der(c.as_ref()).ok())
        .unwrap_or_default();

    info!(
        peer = %conn.remote_addr,
        principal = %identity.display_name,
        "Client certificate validated against the pinned CA"
    );

    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// Create the fixed 401 response for a failed pinning check
fn failed_validation_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": FAILED_VALIDATION_MSG })),
    )
        .into_response()
}
