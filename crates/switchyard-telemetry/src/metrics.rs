//! Prometheus metrics for Switchyard.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `switchyard_requests_total` | Counter | `method`, `route`, `status` | Completed requests |
//! | `switchyard_request_duration_seconds` | Histogram | `method`, `route` | Request latency |
//! | `switchyard_in_flight_requests` | Gauge | - | Requests being dispatched |
//! | `switchyard_timeouts_total` | Counter | `route` | Requests answered by the timeout guard |
//! | `switchyard_panics_total` | Counter | `route` | Panics caught by the recovery step |
//!
//! Recording functions are no-ops until a recorder is installed, so
//! libraries can call them unconditionally.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Label used when a request matched no route.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Scrape address (e.g., "0.0.0.0:9090"); validated at install time.
    pub addr: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Installs the Prometheus recorder.
///
/// Scrape output comes from [`render_metrics`], typically served from a
/// route on the engine itself.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidAddress` for an unparsable address and
/// `TelemetryError::MetricsInit` if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let handle = PrometheusBuilder::new()
        .with_http_listener(addr)
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus text format, if initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(
        "switchyard_requests_total",
        "Total number of requests dispatched"
    );
    describe_histogram!(
        "switchyard_request_duration_seconds",
        "Request dispatch duration in seconds"
    );
    describe_gauge!(
        "switchyard_in_flight_requests",
        "Number of requests currently being dispatched"
    );
    describe_counter!(
        "switchyard_timeouts_total",
        "Requests answered by the timeout guard"
    );
    describe_counter!(
        "switchyard_panics_total",
        "Panics caught by the recovery step"
    );
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Records a completed request.
pub fn record_request(method: &str, route: &str, status_code: u16, duration: Duration) {
    counter!(
        "switchyard_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        "switchyard_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Records a request answered by the timeout guard.
pub fn record_timeout(route: &str) {
    counter!("switchyard_timeouts_total", "route" => route.to_string()).increment(1);
}

/// Records a panic caught by the recovery step.
pub fn record_panic(route: &str) {
    counter!("switchyard_panics_total", "route" => route.to_string()).increment(1);
}

/// Increments the in-flight requests gauge.
pub fn increment_in_flight() {
    gauge!("switchyard_in_flight_requests").increment(1.0);
}

/// Decrements the in-flight requests gauge.
pub fn decrement_in_flight() {
    gauge!("switchyard_in_flight_requests").decrement(1.0);
}

/// Guard that decrements the in-flight gauge on drop, including on unwind.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        increment_in_flight();
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        decrement_in_flight();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
    }

    #[test]
    fn test_disabled_is_noop() {
        assert!(init_metrics(&MetricsConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            enabled: true,
            addr: "not-an-address".to_string(),
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_record_functions_without_recorder() {
        record_request("GET", "/users/:id", 200, Duration::from_millis(10));
        record_timeout("/slow");
        record_panic(UNMATCHED_ROUTE);
        let guard = InFlightGuard::new();
        drop(guard);
    }
}
