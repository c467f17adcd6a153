//! config.rs
//! Tunables for interval evaluation and bound propagation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not parse propagation config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Smallest distance to a pole (zero for `log` and negative fractional
    /// powers) that interval evaluation and reverse propagation will assume.
    pub min_zero_distance: f64,
    /// Relative improvement a bound needs before it counts as a tightening.
    pub min_tightening: f64,
    /// Round limit for `Propagator::propagate`.
    pub max_rounds: u32,
    /// Emit one warning per handler when a pole relaxation happens.
    pub warn_on_pole: bool,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            min_zero_distance: 1e-9,
            min_tightening: 1e-9,
            max_rounds: 10,
            warn_on_pole: true,
        }
    }
}

impl PropagationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: PropagationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_zero_distance.is_finite() && self.min_zero_distance >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "min_zero_distance",
                reason: format!("expected a finite non-negative number, got {}", self.min_zero_distance),
            });
        }
        if !(self.min_tightening.is_finite() && self.min_tightening >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "min_tightening",
                reason: format!("expected a finite non-negative number, got {}", self.min_tightening),
            });
        }
        if self.max_rounds == 0 {
            return Err(ConfigError::Invalid {
                field: "max_rounds",
                reason: "at least one round is required".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PropagationConfig::from_json(r#"{ "max_rounds": 3 }"#).unwrap();
        assert_eq!(config.max_rounds, 3);
        assert_eq!(config.min_zero_distance, 1e-9);
        assert!(config.warn_on_pole);
    }

    #[test]
    fn test_rejects_negative_distance() {
        let err = PropagationConfig::from_json(r#"{ "min_zero_distance": -1.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "min_zero_distance", .. }));
    }

    #[test]
    fn test_rejects_zero_rounds() {
        let err = PropagationConfig::from_json(r#"{ "max_rounds": 0 }"#).unwrap_err();
        assert!(err.to_string().contains("max_rounds"));
    }

    #[test]
    fn test_malformed_json() {
        let err = PropagationConfig::from_json("{ max_rounds: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
