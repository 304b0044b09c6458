//! Prometheus Metrics
//!
//! Hit/miss counters, size gauges and operation latency histograms, kept in a
//! registry owned by one cache manager and rendered for `/metrics` scraping.

use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramTimer, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

use crate::cache::TierKind;
use crate::error::{CacheError, Result};

/// Operation latency buckets (seconds): 50us up to 1s
const OPERATION_LATENCY_BUCKETS: &[f64] = &[
    0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0,
];

/// Container for all cache metrics.
#[derive(Clone)]
pub struct CacheMetrics {
    registry: Registry,

    /// Cache hits - labels: cache_type, key_prefix
    pub hits_total: IntCounterVec,

    /// Cache misses - labels: cache_type, key_prefix
    pub misses_total: IntCounterVec,

    /// Accumulated size per tier - labels: cache_type
    pub size_bytes: GaugeVec,

    /// Operation duration - labels: operation, cache_type
    pub operation_duration_seconds: HistogramVec,
}

impl CacheMetrics {
    /// Creates the metrics and registers them in a fresh registry.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let hits_total = IntCounterVec::new(
            Opts::new("cache_hits_total", "Total number of cache hits"),
            &["cache_type", "key_prefix"],
        )
        .map_err(|e| metric_error("cache_hits_total", e))?;

        let misses_total = IntCounterVec::new(
            Opts::new("cache_misses_total", "Total number of cache misses"),
            &["cache_type", "key_prefix"],
        )
        .map_err(|e| metric_error("cache_misses_total", e))?;

        let size_bytes = GaugeVec::new(
            Opts::new("cache_size_bytes", "Current cache size in bytes"),
            &["cache_type"],
        )
        .map_err(|e| metric_error("cache_size_bytes", e))?;

        let operation_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "cache_operation_duration_seconds",
                "Duration of cache operations",
            )
            .buckets(OPERATION_LATENCY_BUCKETS.to_vec()),
            &["operation", "cache_type"],
        )
        .map_err(|e| metric_error("cache_operation_duration_seconds", e))?;

        registry
            .register(Box::new(hits_total.clone()))
            .map_err(|e| metric_error("cache_hits_total", e))?;
        registry
            .register(Box::new(misses_total.clone()))
            .map_err(|e| metric_error("cache_misses_total", e))?;
        registry
            .register(Box::new(size_bytes.clone()))
            .map_err(|e| metric_error("cache_size_bytes", e))?;
        registry
            .register(Box::new(operation_duration_seconds.clone()))
            .map_err(|e| metric_error("cache_operation_duration_seconds", e))?;

        Ok(Self {
            registry,
            hits_total,
            misses_total,
            size_bytes,
            operation_duration_seconds,
        })
    }

    pub fn record_hit(&self, tier: TierKind, key_prefix: &str) {
        self.hits_total
            .with_label_values(&[tier.as_str(), key_prefix])
            .inc();
    }

    pub fn record_miss(&self, tier: TierKind, key_prefix: &str) {
        self.misses_total
            .with_label_values(&[tier.as_str(), key_prefix])
            .inc();
    }

    pub fn set_size(&self, tier: TierKind, size_bytes: u64) {
        self.size_bytes
            .with_label_values(&[tier.as_str()])
            .set(size_bytes as f64);
    }

    /// Starts a timer that records into the latency histogram when dropped.
    pub fn time(&self, operation: &str, tier: TierKind) -> HistogramTimer {
        self.operation_duration_seconds
            .with_label_values(&[operation, tier.as_str()])
            .start_timer()
    }

    /// Renders the registry in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| CacheError::Internal(format!("Failed to encode metrics: {}", e)))?;
        String::from_utf8(buffer)
            .map_err(|e| CacheError::Internal(format!("Metrics are not UTF-8: {}", e)))
    }
}

fn metric_error(name: &str, e: prometheus::Error) -> CacheError {
    CacheError::Internal(format!("Failed to register {}: {}", name, e))
}
