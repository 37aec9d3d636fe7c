//! HTTP router and handlers

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    middleware,
    response::IntoResponse,
    routing::get,
};
use chrono::{Duration, NaiveDate, Utc};
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::debug;

use super::auth::certificate_auth_middleware;
use crate::mtls::identity::CertIdentity;
use crate::mtls::pinning::ClientCertValidator;

/// Create the router.
///
/// Every route sits behind the certificate authentication middleware; there
/// are no public paths, since certificate presentation is mandatory at the
/// transport layer anyway.
pub fn create_router(validator: Arc<dyn ClientCertValidator>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/weatherforecast", get(weather_forecast_handler))
        // Certificate authentication (CA pinning) on every request
        .layer(middleware::from_fn_with_state(
            validator,
            certificate_auth_middleware,
        ))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Health check
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

const SUMMARIES: [&str; 10] = [
    "Freezing",
    "Bracing",
    "Chilly",
    "Cool",
    "Mild",
    "Warm",
    "Balmy",
    "Hot",
    "Sweltering",
    "Scorching",
];

/// One day of demo forecast data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct WeatherForecast {
    date: NaiveDate,
    temperature_c: i32,
    temperature_f: i32,
    summary: &'static str,
}

/// Demo business endpoint — five days of randomized forecasts.
///
/// Only reachable with a certificate that passed both chain validation and
/// the CA pinning check; the principal arrives via request extensions.
async fn weather_forecast_handler(
    Extension(identity): Extension<CertIdentity>,
) -> impl IntoResponse {
    debug!(principal = %identity.display_name, "Serving weather forecast");

    let mut rng = rand::rng();
    let today = Utc::now().date_naive();

    let forecasts: Vec<WeatherForecast> = (1..=5)
        .map(|day| {
            let temperature_c = rng.random_range(-20..=55);
            WeatherForecast {
                date: today + Duration::days(day),
                temperature_c,
                temperature_f: to_fahrenheit(temperature_c),
                summary: SUMMARIES[rng.random_range(0..SUMMARIES.len())],
            }
        })
        .collect();

    Json(forecasts)
}

/// Celsius to Fahrenheit, truncated the way the demo always has.
#[allow(clippy::cast_possible_truncation)]
fn to_fahrenheit(celsius: i32) -> i32 {
    32 + (f64::from(celsius) / 0.5556) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forecast_serializes_with_camel_case_fields() {
        let forecast = WeatherForecast {
            date: NaiveDate::from_ymd_opt(2026, 8, 23).unwrap(),
            temperature_c: 20,
            temperature_f: 67,
            summary: "Mild",
        };

        let value = serde_json::to_value(&forecast).unwrap();
        assert_eq!(value["temperatureC"], 20);
        assert_eq!(value["temperatureF"], 67);
        assert_eq!(value["summary"], "Mild");
        assert_eq!(value["date"], "2026-08-23");
    }

    #[test]
    fn fahrenheit_conversion_matches_expected_scale() {
        assert_eq!(to_fahrenheit(0), 32);
        assert_eq!(to_fahrenheit(55), 130);
        assert_eq!(to_fahrenheit(-20), -3);
    }
}
