//! Judge configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for running and validating solver tests.
///
/// Every field is optional; the `effective_*` accessors supply the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JudgeConfig {
    /// Wall-clock deadline for one solver run, in milliseconds. Default: 20s.
    pub timeout_ms: Option<u64>,
    /// Models requested when a test declares no `MODELS`. Default: 1.
    pub default_models: Option<u32>,
    /// Width of the validation worker pool. Default: available parallelism.
    pub max_workers: Option<usize>,
    /// Forwarded to the solver; single-agent encodings use `exec/2`.
    pub single_agent: Option<bool>,
    /// Reject solutions with no facts at all. Default: true.
    pub require_solutions: Option<bool>,
}

impl JudgeConfig {
    pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;

    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn effective_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(Self::DEFAULT_TIMEOUT_MS))
    }

    pub fn effective_default_models(&self) -> u32 {
        self.default_models.unwrap_or(1)
    }

    /// Never less than one worker.
    pub fn effective_max_workers(&self) -> usize {
        self.max_workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            })
            .max(1)
    }

    pub fn effective_single_agent(&self) -> bool {
        self.single_agent.unwrap_or(false)
    }

    pub fn effective_require_solutions(&self) -> bool {
        self.require_solutions.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_harness() {
        let config = JudgeConfig::default();
        assert_eq!(config.effective_timeout(), Duration::from_secs(20));
        assert_eq!(config.effective_default_models(), 1);
        assert!(config.effective_max_workers() >= 1);
        assert!(!config.effective_single_agent());
        assert!(config.effective_require_solutions());
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let config =
            JudgeConfig::from_json_str(r#"{"timeout_ms": 500, "max_workers": 0}"#).expect("config");
        assert_eq!(config.effective_timeout(), Duration::from_millis(500));
        assert_eq!(config.effective_max_workers(), 1);
        assert_eq!(config.effective_default_models(), 1);
    }
}
