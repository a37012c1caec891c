//! Configuration structures.
//!
//! Configuration is loaded from environment variables and config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Global engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Execution limits for tool calls and turns.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Execution engine limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum tool calls accepted in a single batch request. Batches above
    /// this size are rejected wholesale before any execution.
    pub max_batch_size: usize,

    /// Maximum request/respond rounds per conversational turn. When reached,
    /// the last partial answer is returned instead of failing the turn.
    pub max_turn_rounds: u32,

    /// Bounded channel capacity for turn event streaming.
    pub stream_channel_capacity: usize,

    /// Wall-clock timeout per tool call. A timed-out call is recorded as a
    /// failed execution, identical to a caught handler error.
    #[serde(with = "humantime_serde")]
    pub call_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 8,
            max_turn_rounds: 10,
            stream_channel_capacity: 64,
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_batch_size, 8);
        assert_eq!(cfg.max_turn_rounds, 10);
        assert_eq!(cfg.call_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_deserializes_with_partial_fields() {
        let cfg: Config = serde_json::from_str(r#"{"observability": {"log_level": "debug", "json_logs": true}}"#).unwrap();
        assert_eq!(cfg.observability.log_level, "debug");
        assert_eq!(cfg.engine.max_batch_size, 8);
    }
}
