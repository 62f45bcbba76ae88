//! Planner configuration.
//!
//! Every field has a default so a partial JSON document is a valid config.

use serde::{Deserialize, Serialize};
use trailhead_explore::coverage::{CountingMode, GreedyConfig};
use trailhead_explore::rng::RngKind;
use trailhead_explore::search::ForwardConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid planner config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("greedy.max_plan_length must be at least 1")]
    ZeroPlanLength,
}

/// Settings for one planning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Global seed. Each planning stage derives its own generator from it.
    pub seed: u64,
    /// Generator used for the greedy search's random choices.
    pub rng: RngKind,
    /// How the occurrence table counts repeated actions.
    pub counting: CountingMode,
    pub forward: ForwardConfig,
    pub greedy: GreedyConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            rng: RngKind::default(),
            counting: CountingMode::default(),
            forward: ForwardConfig::default(),
            greedy: GreedyConfig::default(),
        }
    }
}

impl PlannerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PlannerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.greedy.max_plan_length == 0 {
            return Err(ConfigError::ZeroPlanLength);
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(PlannerConfig::from_json("{}").unwrap(), PlannerConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = PlannerConfig::from_json(
            r#"{ "seed": 7, "rng": "lcg", "counting": "per_plan", "greedy": { "max_plan_length": 10 } }"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.rng, RngKind::Lcg);
        assert_eq!(config.counting, CountingMode::PerPlan);
        assert_eq!(config.greedy.max_plan_length, 10);
        assert_eq!(config.greedy.max_stalled_attempts, 64);
        assert!(config.greedy.enabled);
        assert_eq!(config.forward.max_expansions, None);
    }

    #[test]
    fn test_zero_plan_length_rejected() {
        let err = PlannerConfig::from_json(r#"{ "greedy": { "max_plan_length": 0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroPlanLength));
    }

    #[test]
    fn test_unknown_rng_rejected() {
        let err = PlannerConfig::from_json(r#"{ "rng": "xorshift" }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }
}
