use std::cmp;
use std::path::Path;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Evaluator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Run disjoint connected components on a worker pool. Each component is still
    /// evaluated sequentially in dependency order.
    pub parallel_components: bool,
    /// Worker threads for parallel evaluation; defaults to the available parallelism.
    pub worker_count: Option<usize>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            parallel_components: false,
            worker_count: None,
        }
    }
}

impl EvaluatorConfig {
    pub fn sequential() -> Self {
        Self::default()
    }

    pub fn parallel(worker_count: usize) -> Self {
        Self {
            parallel_components: true,
            worker_count: Some(worker_count),
        }
    }

    pub fn worker_count(&self) -> usize {
        if let Some(count) = self.worker_count {
            return cmp::max(1, count);
        }
        thread::available_parallelism()
            .map(|v| v.get())
            .unwrap_or(1)
    }

    pub fn from_json(json_str: &str) -> Result<Self> {
        Ok(serde_json::from_str(json_str)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json_str = std::fs::read_to_string(path)?;
        Self::from_json(&json_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = EvaluatorConfig::from_json("{}").unwrap();
        assert_eq!(config, EvaluatorConfig::default());
    }

    #[test]
    fn test_worker_count_is_clamped() {
        let config = EvaluatorConfig::from_json(r#"{"parallel_components": true, "worker_count": 0}"#)
            .unwrap();
        assert!(config.parallel_components);
        assert_eq!(config.worker_count(), 1);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(EvaluatorConfig::from_json("{ parallel").is_err());
    }
}
