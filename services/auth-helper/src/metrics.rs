//! Prometheus metrics exposition
//!
//! - `oauth_helper_requests_total` (counter): labels `route`, `status`
//! - `oauth_helper_request_duration_seconds` (histogram): label `route`
//! - `oauth_helper_token_exchanges_total` (counter): label `outcome`
//! - `oauth_helper_reauthorizations_total` (counter): label `reason`
//!
//! Served on the optional `metrics_addr` listener, never on the helper's
//! own port.

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

const REQUEST_DURATION: &str = "oauth_helper_request_duration_seconds";

/// Covers a local redirect (sub-millisecond) up to a slow token endpoint.
const DURATION_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
];

fn builder() -> Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), DURATION_BUCKETS)
        .context("failed to set histogram buckets")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle> {
    builder()?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Router for the dedicated metrics listener.
pub fn router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(handle)
}

async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        handle.render(),
    )
}

/// Record a completed request against one of the three routes.
pub fn record_request(route: &'static str, status: u16, duration_secs: f64) {
    metrics::counter!("oauth_helper_requests_total", "route" => route, "status" => status.to_string())
        .increment(1);
    metrics::histogram!(REQUEST_DURATION, "route" => route).record(duration_secs);
}

/// Record how a callback ended: `success`, `denied`, `configuration`,
/// `exchange_failed` or `store_failed`.
pub fn record_token_exchange(outcome: &'static str) {
    metrics::counter!("oauth_helper_token_exchanges_total", "outcome" => outcome).increment(1);
}

/// Record a redirect back to `/authorize-me` from the default flow.
pub fn record_reauthorization(reason: &'static str) {
    metrics::counter!("oauth_helper_reauthorizations_total", "reason" => reason).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusRecorder;
    use tower::ServiceExt;

    /// Isolated recorder/handle pair; only one global recorder may exist
    /// per process.
    fn isolated_recorder() -> (PrometheusRecorder, PrometheusHandle) {
        let recorder = builder().unwrap().build_recorder();
        let handle = recorder.handle();
        (recorder, handle)
    }

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_request("default", 301, 0.001);
        record_token_exchange("success");
        record_reauthorization("no_token");
    }

    #[test]
    fn record_request_increments_counter_and_histogram() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_request("authorize_me", 301, 0.002);
        record_request("auth_code_redirect", 502, 1.2);

        let output = handle.render();
        assert!(output.contains("oauth_helper_requests_total"));
        assert!(output.contains("route=\"authorize_me\""));
        assert!(output.contains("status=\"301\""));
        assert!(output.contains("route=\"auth_code_redirect\""));
        assert!(output.contains("status=\"502\""));
        assert!(
            output.contains("oauth_helper_request_duration_seconds_bucket"),
            "histogram must render _bucket lines"
        );
    }

    #[test]
    fn exchange_and_reauthorization_counters_carry_labels() {
        let (recorder, handle) = isolated_recorder();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_token_exchange("success");
        record_token_exchange("denied");
        record_reauthorization("upstream_unauthorized");

        let output = handle.render();
        assert!(output.contains("oauth_helper_token_exchanges_total"));
        assert!(output.contains("outcome=\"success\""));
        assert!(output.contains("outcome=\"denied\""));
        assert!(output.contains("oauth_helper_reauthorizations_total"));
        assert!(output.contains("reason=\"upstream_unauthorized\""));
    }

    #[tokio::test]
    async fn metrics_router_serves_text_format() {
        let (recorder, handle) = isolated_recorder();
        {
            let _guard = metrics::set_default_local_recorder(&recorder);
            record_token_exchange("success");
        }

        let response = router(handle)
            .oneshot(
                axum::http::Request::builder()
                    .uri("/metrics")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/plain"));

        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains("oauth_helper_token_exchanges_total"));
    }
}
