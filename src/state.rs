//! # Application State Management
//!
//! Shared state handed to every request handler through `web::Data<AppState>`.
//!
//! Almost everything in here is read-only after startup: the configuration, the
//! provider credentials and the provider clients (which share one `reqwest` connection
//! pool). The only thing written while serving requests is the metrics block, updated
//! by [`crate::middleware::MetricsMiddleware`] and read by the health endpoints.
//!
//! ## Arc<RwLock<T>> Pattern
//! - **Arc**: many handlers (across actix worker threads) hold a reference
//! - **RwLock**: multiple readers OR one writer at a time

use crate::config::{AppConfig, Credentials};
use crate::providers::Providers;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    /// Provider credentials captured from the environment at startup
    pub credentials: Arc<Credentials>,

    pub providers: Providers,

    /// Request metrics, written by middleware on every request
    pub metrics: Arc<RwLock<AppMetrics>>,

    pub start_time: Instant,
}

/// Request metrics collected across all HTTP requests.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of 4xx/5xx responses since server start
    pub error_count: u64,

    /// Key: endpoint name (e.g., "POST /api/music/generate")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Request metrics for a single endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,

    /// Total time spent processing all requests to this endpoint (milliseconds)
    pub total_duration_ms: u64,

    pub error_count: u64,
}

impl AppState {
    /// Build the state, creating the provider clients from config and credentials.
    pub fn new(config: AppConfig, credentials: Credentials) -> anyhow::Result<Self> {
        let providers = Providers::new(&config, &credentials)?;

        Ok(Self {
            config: Arc::new(config),
            credentials: Arc::new(credentials),
            providers,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        })
    }

    // A panic while holding the metrics lock leaves only counters behind, which are
    // still fine to read and bump.
    fn metrics_read(&self) -> RwLockReadGuard<'_, AppMetrics> {
        self.metrics.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn metrics_write(&self) -> RwLockWriteGuard<'_, AppMetrics> {
        self.metrics.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn increment_request_count(&self) {
        self.metrics_write().request_count += 1;
    }

    pub fn increment_error_count(&self) {
        self.metrics_write().error_count += 1;
    }

    /// Record timing and outcome for one request to `endpoint` (e.g. "GET /health").
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics_write();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Copy of the current metrics, so the lock isn't held while serializing a response.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics_read().clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Fraction of requests that failed, from 0.0 to 1.0.
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
