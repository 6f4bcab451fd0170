//! Configuration for the palisade runtime
//!
//! File loading is owned by an external collaborator; these structs are the
//! typed form the runtime consumes.

use serde::{Deserialize, Serialize};

/// Complete runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub sessions: SessionConfig,
    pub supervisor: SupervisorConfig,
    pub telemetry: TelemetryConfig,
}

/// Session engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Enforce region rules at all; when false every check passes
    pub use_regions: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { use_regions: true }
    }
}

/// Bounded task supervisor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Maximum concurrently running tasks
    pub max_concurrent: usize,
    /// Submissions held while all workers are busy; beyond this, rejection
    pub queue_bound: usize,
    /// Bounded wait for in-flight work during shutdown
    pub grace_period_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            queue_bound: 64,
            grace_period_ms: 5000,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_through_serde() {
        let config = RuntimeConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: RuntimeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.supervisor.max_concurrent, config.supervisor.max_concurrent);
        assert_eq!(back.sessions.use_regions, config.sessions.use_regions);
    }
}
