//! Telemetry and observability for the palisade runtime

use crate::config::TelemetryConfig;
use std::collections::HashMap;
use std::sync::RwLock;

/// Initialize a tracing subscriber honoring `RUST_LOG`
///
/// Convenience for binaries and tests; the library itself only emits.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Runtime telemetry system
///
/// Uses `RwLock` for thread-safe interior mutability so the runtime can be
/// shared across async tasks.
pub struct RuntimeTelemetry {
    config: TelemetryConfig,
    metrics: RwLock<MetricsCollector>,
}

impl RuntimeTelemetry {
    pub fn new(config: &TelemetryConfig) -> Self {
        Self {
            config: config.clone(),
            metrics: RwLock::new(MetricsCollector::new()),
        }
    }

    pub fn session_created(&self, actor: &str) {
        if !self.config.metrics_enabled {
            return;
        }
        tracing::info!("Session created for {}", actor);
        self.increment("sessions_created");
    }

    pub fn session_destroyed(&self, actor: &str) {
        if !self.config.metrics_enabled {
            return;
        }
        tracing::info!("Session destroyed for {}", actor);
        self.increment("sessions_destroyed");
    }

    pub fn action_denied(&self, flag: &str) {
        if !self.config.metrics_enabled {
            return;
        }
        tracing::debug!("Action denied by flag '{}'", flag);
        self.increment("actions_denied");
    }

    pub fn handler_fault(&self, kind: &str) {
        if !self.config.metrics_enabled {
            return;
        }
        tracing::error!("Handler '{}' faulted during evaluation", kind);
        self.increment("handler_faults");
    }

    pub fn task_rejected(&self) {
        if !self.config.metrics_enabled {
            return;
        }
        self.increment("tasks_rejected");
    }

    /// Current value of a counter, for introspection and tests
    pub fn counter(&self, metric: &str) -> u64 {
        self.metrics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(metric)
    }

    /// Flush telemetry data
    pub fn flush(&self) {
        if !self.config.enabled {
            return;
        }
        tracing::debug!("Flushing telemetry");
        self.metrics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .flush();
    }

    fn increment(&self, metric: &'static str) {
        self.metrics
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .increment(metric);
    }
}

/// Metrics collector
struct MetricsCollector {
    counters: HashMap<&'static str, u64>,
}

impl MetricsCollector {
    fn new() -> Self {
        Self {
            counters: HashMap::new(),
        }
    }

    fn increment(&mut self, metric: &'static str) {
        *self.counters.entry(metric).or_insert(0) += 1;
    }

    fn get(&self, metric: &str) -> u64 {
        self.counters.get(metric).copied().unwrap_or(0)
    }

    fn flush(&self) {
        for (metric, value) in &self.counters {
            tracing::debug!("counter {} = {}", metric, value);
        }
    }
}
