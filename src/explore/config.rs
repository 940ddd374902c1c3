//! Exploration tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Limits and thresholds for one `explore()` call.
///
/// Every field has a default, so partial JSON is accepted:
///
/// ```
/// # use mind_explore::ExplorationConfig;
/// let cfg = ExplorationConfig::from_json_str(r#"{ "max_depth": 4 }"#).unwrap();
/// assert_eq!(cfg.max_depth, 4);
/// assert_eq!(cfg.max_children, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Hops a single walker may take.
    pub max_depth: usize,
    /// Children spawned per branch point.
    pub max_children: usize,
    /// Wall-clock budget for the whole call, in seconds.
    pub timeout_s: f64,
    /// Qualifying links needed before a moment forks.
    pub min_branch_links: usize,
    /// RESONATING ends the walk once satisfaction reaches this.
    pub satisfaction_threshold: f32,
    /// Reserved. Crystallization currently gates on fixed 0.7 thresholds.
    pub novelty_threshold: f32,
    /// Links scoring at or below this are never taken.
    pub min_link_score: f32,
    /// Hard ceiling on state-machine steps per walker.
    pub max_steps: usize,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_children: 3,
            timeout_s: 30.0,
            min_branch_links: 2,
            satisfaction_threshold: 0.8,
            novelty_threshold: 0.85,
            min_link_score: 0.1,
            max_steps: 1000,
        }
    }
}

impl ExplorationConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `timeout_s` as a `Duration`. Fails when it is not positive or does
    /// not fit in a `Duration`.
    pub fn timeout(&self) -> Result<Duration> {
        if !self.timeout_s.is_finite() || self.timeout_s <= 0.0 {
            return Err(Error::InvalidConfig(format!("timeout_s must be positive, got {}", self.timeout_s)));
        }
        Duration::try_from_secs_f64(self.timeout_s)
            .map_err(|e| Error::InvalidConfig(format!("timeout_s {} out of range: {e}", self.timeout_s)))
    }

    pub fn validate(&self) -> Result<()> {
        self.timeout()?;
        if self.min_branch_links < 2 {
            return Err(Error::InvalidConfig(format!(
                "min_branch_links must be at least 2, got {}",
                self.min_branch_links
            )));
        }
        if self.max_steps == 0 {
            return Err(Error::InvalidConfig("max_steps must be at least 1".into()));
        }
        for (name, v) in [
            ("satisfaction_threshold", self.satisfaction_threshold),
            ("novelty_threshold", self.novelty_threshold),
            ("min_link_score", self.min_link_score),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(Error::InvalidConfig(format!("{name} must be in [0, 1], got {v}")));
            }
        }
        Ok(())
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_children(mut self, max_children: usize) -> Self {
        self.max_children = max_children;
        self
    }

    pub fn with_timeout_s(mut self, timeout_s: f64) -> Self {
        self.timeout_s = timeout_s;
        self
    }
}
