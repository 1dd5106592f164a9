/*!
Observability infrastructure for Snapvault.

This module provides:
- Structured logging and tracing setup
- Prometheus metrics for fetches and published archives (`metrics` feature)
*/

#[cfg(feature = "metrics")]
use prometheus::{Counter, Encoder, Histogram, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
#[cfg(feature = "metrics")]
use std::time::Instant;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{Result, SnapvaultError};

/// Global metrics instance
#[cfg(feature = "metrics")]
static METRICS: OnceLock<SnapvaultMetrics> = OnceLock::new();

/// Metrics collection for backup runs
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct SnapvaultMetrics {
    pub fetch_requests_total: Counter,
    pub fetch_errors_total: Counter,
    pub fetch_latency_seconds: Histogram,
    pub records_total: Counter,
    pub archive_size_bytes: Histogram,

    // Prometheus registry for scraping
    registry: Registry,
}

#[cfg(feature = "metrics")]
fn metric_error(name: &str, e: prometheus::Error) -> SnapvaultError {
    SnapvaultError::configuration(format!("failed to set up metric {name}: {e}"))
}

#[cfg(feature = "metrics")]
impl SnapvaultMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let fetch_requests_total = Counter::new(
            "snapvault_fetch_requests_total",
            "Total collection fetches issued",
        )
        .map_err(|e| metric_error("fetch_requests_total", e))?;

        let fetch_errors_total = Counter::new(
            "snapvault_fetch_errors_total",
            "Total collection fetches that failed",
        )
        .map_err(|e| metric_error("fetch_errors_total", e))?;

        let fetch_latency_seconds = Histogram::with_opts(prometheus::HistogramOpts::new(
            "snapvault_fetch_latency_seconds",
            "Duration of collection fetches in seconds",
        ))
        .map_err(|e| metric_error("fetch_latency_seconds", e))?;

        let records_total = Counter::new(
            "snapvault_records_total",
            "Total records captured in snapshots",
        )
        .map_err(|e| metric_error("records_total", e))?;

        let archive_size_bytes = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "snapvault_archive_size_bytes",
                "Size of published archives in bytes",
            )
            .buckets(
                prometheus::exponential_buckets(1024.0, 4.0, 10)
                    .map_err(|e| metric_error("archive_size_bytes", e))?,
            ),
        )
        .map_err(|e| metric_error("archive_size_bytes", e))?;

        registry
            .register(Box::new(fetch_requests_total.clone()))
            .map_err(|e| metric_error("fetch_requests_total", e))?;
        registry
            .register(Box::new(fetch_errors_total.clone()))
            .map_err(|e| metric_error("fetch_errors_total", e))?;
        registry
            .register(Box::new(fetch_latency_seconds.clone()))
            .map_err(|e| metric_error("fetch_latency_seconds", e))?;
        registry
            .register(Box::new(records_total.clone()))
            .map_err(|e| metric_error("records_total", e))?;
        registry
            .register(Box::new(archive_size_bytes.clone()))
            .map_err(|e| metric_error("archive_size_bytes", e))?;

        Ok(Self {
            fetch_requests_total,
            fetch_errors_total,
            fetch_latency_seconds,
            records_total,
            archive_size_bytes,
            registry,
        })
    }

    /// Get or initialize global metrics instance
    pub fn global() -> &'static SnapvaultMetrics {
        METRICS.get_or_init(|| Self::new().expect("Failed to initialize Snapvault metrics"))
    }

    pub fn record_records(&self, count: usize) {
        self.records_total.inc_by(count as f64);
    }

    pub fn record_archive_size(&self, size_bytes: usize) {
        self.archive_size_bytes.observe(size_bytes as f64);
    }

    /// Gather metrics in Prometheus text format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| SnapvaultError::configuration(format!("failed to encode metrics: {e}")))?;

        String::from_utf8(buffer).map_err(|e| {
            SnapvaultError::configuration(format!("failed to convert metrics to string: {e}"))
        })
    }
}

/// Timer for one collection fetch
#[cfg(feature = "metrics")]
pub struct FetchTimer {
    start: Instant,
}

#[cfg(feature = "metrics")]
impl FetchTimer {
    /// Count the request and start timing it
    pub fn start() -> Self {
        SnapvaultMetrics::global().fetch_requests_total.inc();
        Self {
            start: Instant::now(),
        }
    }

    /// Record success latency
    pub fn finish(self) {
        SnapvaultMetrics::global()
            .fetch_latency_seconds
            .observe(self.start.elapsed().as_secs_f64());
    }

    /// Record latency and an error
    pub fn finish_with_error(self) {
        let metrics = SnapvaultMetrics::global();
        metrics
            .fetch_latency_seconds
            .observe(self.start.elapsed().as_secs_f64());
        metrics.fetch_errors_total.inc();
    }
}

/// Initialize the global tracing subscriber
///
/// # Arguments
/// * `json` - Emit JSON lines instead of human-readable output
/// * `default_level` - Filter used when `RUST_LOG` is not set
pub fn init_observability(json: bool, default_level: &str) -> Result<()> {
    #[cfg(feature = "metrics")]
    SnapvaultMetrics::global();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| SnapvaultError::configuration(format!("invalid log filter: {e}")))?;

    let result = if json {
        let subscriber = TracingRegistry::default().with(filter).with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(false)
                .with_current_span(true),
        );
        set_global_default(subscriber)
    } else {
        let subscriber = TracingRegistry::default()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false));
        set_global_default(subscriber)
    };

    result.map_err(|e| {
        SnapvaultError::configuration(format!("failed to set global tracing subscriber: {e}"))
    })
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_timer() {
        let timer = FetchTimer::start();
        timer.finish();

        let timer = FetchTimer::start();
        timer.finish_with_error();

        assert!(SnapvaultMetrics::global().fetch_errors_total.get() >= 1.0);
    }

    #[test]
    fn test_metrics_gathering() {
        let metrics = SnapvaultMetrics::global();
        metrics.record_records(4);
        metrics.record_archive_size(2048);

        let metrics_text = metrics.gather_metrics().unwrap();
        assert!(metrics_text.contains("snapvault_records_total"));
        assert!(metrics_text.contains("snapvault_archive_size_bytes"));
    }
}
