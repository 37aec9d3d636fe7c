//! End-to-end authentication bridge tests.
//!
//! Drives the real router + certificate authentication middleware with
//! per-connection info injected the same way the TLS listener injects it,
//! so the full decision pipeline (pinning check → principal or fixed-reason
//! rejection) runs exactly as in production, minus the socket.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use rustls::pki_types::CertificateDer;
use tower::ServiceExt;

use mtls_gate::gateway::{TlsConnectInfo, create_router};
use mtls_gate::mtls::{
    CaParams, CaPinningValidator, CertGenerator, GeneratedCert, LeafCertParams, PinnedKeyId,
    subject_key_id_hex,
};

const FAILED_VALIDATION_MSG: &str = "The client certificate failed to validate";

// ── helpers ──────────────────────────────────────────────────────────────────

fn make_ca(cn: &str) -> GeneratedCert {
    CertGenerator::init_ca(&CaParams {
        cn,
        validity_days: 365,
    })
    .unwrap()
}

fn issue_client_der(ca: &GeneratedCert, cn: &str) -> CertificateDer<'static> {
    let leaf = CertGenerator::issue_leaf(
        &LeafCertParams {
            cn,
            ou: None,
            san_dns: vec![],
            validity_days: 30,
        },
        &ca.cert_pem,
        &ca.key_pem,
    )
    .unwrap();
    rustls_pemfile::certs(&mut leaf.cert_pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
        .remove(0)
}

fn router_pinned_to(ca: &GeneratedCert) -> Router {
    let ca_der = rustls_pemfile::certs(&mut ca.cert_pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
        .remove(0);
    let ski = subject_key_id_hex(ca_der.as_ref()).unwrap();
    let validator = Arc::new(CaPinningValidator::new(
        PinnedKeyId::from_hex(&ski).unwrap(),
    ));
    create_router(validator)
}

/// Build a request carrying the connection info the TLS listener would have
/// captured for this client certificate.
fn request_with_cert(uri: &str, cert: Option<CertificateDer<'static>>) -> Request<Body> {
    let remote_addr: SocketAddr = "127.0.0.1:45000".parse().unwrap();
    Request::builder()
        .uri(uri)
        .extension(ConnectInfo(TlsConnectInfo {
            remote_addr,
            client_cert: cert,
        }))
        .body(Body::empty())
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ── accept path ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn pinned_ca_client_reaches_protected_endpoint() {
    let ca = make_ca("Pinned CA");
    let client = issue_client_der(&ca, "client-1");
    let app = router_pinned_to(&ca);

    let response = app
        .oneshot(request_with_cert("/weatherforecast", Some(client)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("temperatureC"));
    assert!(body.contains("summary"));
}

#[tokio::test]
async fn forecast_returns_five_days() {
    let ca = make_ca("Pinned CA");
    let client = issue_client_der(&ca, "client-1");
    let app = router_pinned_to(&ca);

    let response = app
        .oneshot(request_with_cert("/weatherforecast", Some(client)))
        .await
        .unwrap();

    let body = body_string(response).await;
    let forecasts: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
    assert_eq!(forecasts.len(), 5);
}

#[tokio::test]
async fn health_endpoint_requires_pinned_cert_too() {
    let ca = make_ca("Pinned CA");
    let client = issue_client_der(&ca, "client-1");
    let app = router_pinned_to(&ca);

    let response = app
        .oneshot(request_with_cert("/health", Some(client)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// ── reject paths ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn client_from_other_trusted_ca_is_rejected_with_fixed_reason() {
    let pinned_ca = make_ca("Pinned CA");
    let other_ca = make_ca("Other CA");
    let intruder = issue_client_der(&other_ca, "client-2");
    let app = router_pinned_to(&pinned_ca);

    let response = app
        .oneshot(request_with_cert("/weatherforecast", Some(intruder)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_string(response).await;
    assert!(body.contains(FAILED_VALIDATION_MSG));
}

#[tokio::test]
async fn connection_without_certificate_is_rejected() {
    let ca = make_ca("Pinned CA");
    let app = router_pinned_to(&ca);

    let response = app
        .oneshot(request_with_cert("/weatherforecast", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rejection_is_stable_across_repeated_requests() {
    let pinned_ca = make_ca("Pinned CA");
    let other_ca = make_ca("Other CA");
    let intruder = issue_client_der(&other_ca, "client-3");
    let app = router_pinned_to(&pinned_ca);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(request_with_cert("/health", Some(intruder.clone())))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
