//! Optimizer configuration.

use crate::error::GearError;
use serde::{Deserialize, Serialize};

/// Largest beam width accepted by [`OptimizerConfig::validate`].
pub const MAX_BEAM_WIDTH: usize = 10_000;

/// Search knobs.
///
/// # Examples
///
/// ```rust
/// use zzgear::OptimizerConfig;
///
/// let config = OptimizerConfig::from_json(r#"{"beam_width": 500}"#).unwrap();
/// assert_eq!(config.beam_width, 500);
/// assert_eq!(config.top_k, 10);
/// assert!(OptimizerConfig::from_json(r#"{"beam_width": 0}"#).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Partial sets kept between slots.
    pub beam_width: usize,
    /// Complete sets returned.
    pub top_k: usize,
    /// Evaluate each slot's candidates on the rayon pool.
    pub parallel: bool,
    /// Treat sets that differ only by ear or ring order as one.
    pub dedupe_mirrored: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            beam_width: 100,
            top_k: 10,
            parallel: true,
            dedupe_mirrored: true,
        }
    }
}

impl OptimizerConfig {
    pub fn from_json(json: &str) -> Result<Self, GearError> {
        let config: OptimizerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_beam_width(mut self, beam_width: usize) -> Self {
        self.beam_width = beam_width;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<(), GearError> {
        if self.beam_width == 0 || self.beam_width > MAX_BEAM_WIDTH {
            return Err(GearError::InvalidConfig(format!(
                "beam_width must be between 1 and {}",
                MAX_BEAM_WIDTH
            )));
        }
        if self.top_k == 0 {
            return Err(GearError::InvalidConfig("top_k must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(OptimizerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bounds() {
        assert!(OptimizerConfig::default().with_beam_width(MAX_BEAM_WIDTH + 1).validate().is_err());
        assert!(OptimizerConfig::default().with_top_k(0).validate().is_err());
    }
}
