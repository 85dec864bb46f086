//! src/config.rs
//!
//! Configuration for stage-conditioned augmentation pipelines.
//!
//! The `PipelineConfig` struct stores the parameters that decide which
//! pipeline [`Pipeline::from_config`](crate::pipeline::Pipeline::from_config)
//! assembles. It can be built in code or deserialized with serde; omitted
//! probabilities fall back to their defaults (`gb_prob = 1.0`,
//! `solarize_prob = 0.0`).
//!
//! Example:
//! ```ignore
//! let config = PipelineConfig::builder(Stage::Train, 224)
//!     .gb_prob(1.0)
//!     .solarize_prob(0.2)
//!     .build();
//!
//! let from_json: PipelineConfig =
//!     serde_json::from_str(r#"{ "stage": "ft", "resize_size": 224 }"#)?;
//! ```

use crate::error::AugmentError;
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Training stage a pipeline is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Pretraining views: heavy geometric + photometric augmentation.
    Train,
    /// Same augmentation as `Train`, used for validation of the pretext task.
    Val,
    /// Fine-tuning: crop + flip only.
    Ft,
    /// Evaluation: deterministic resize + center crop.
    Test,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Train, Stage::Val, Stage::Ft, Stage::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Train => "train",
            Stage::Val => "val",
            Stage::Ft => "ft",
            Stage::Test => "test",
        }
    }

    /// Whether pipelines for this stage draw any randomness.
    pub fn is_randomized(&self) -> bool {
        !matches!(self, Stage::Test)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = AugmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| AugmentError::UnsupportedStage(s.to_string()))
    }
}

fn default_gb_prob() -> f64 {
    1.0
}

/// Configuration for one augmentation pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Which stage's step list to assemble
    pub stage: Stage,
    /// Side length of the square output, in pixels
    pub resize_size: u32,
    /// Probability of applying Gaussian blur (train/val only)
    #[serde(default = "default_gb_prob")]
    pub gb_prob: f64,
    /// Probability of applying solarization (train/val only)
    #[serde(default)]
    pub solarize_prob: f64,
}

impl PipelineConfig {
    pub fn builder(stage: Stage, resize_size: u32) -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: PipelineConfig {
                stage,
                resize_size,
                gb_prob: default_gb_prob(),
                solarize_prob: 0.0,
            },
        }
    }

    /// Checks the parameters; invalid values are configuration errors.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.resize_size > 0,
            AugmentError::config("resize_size must be positive")
        );
        for (name, p) in [("gb_prob", self.gb_prob), ("solarize_prob", self.solarize_prob)] {
            ensure!(
                (0.0..=1.0).contains(&p),
                AugmentError::config(format!("{} must be in [0.0, 1.0] (got {})", name, p))
            );
        }
        Ok(())
    }
}

/// Builder for PipelineConfig with method chaining
#[derive(Debug, Clone)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the probability of applying Gaussian blur
    pub fn gb_prob(mut self, p: f64) -> Self {
        self.config.gb_prob = p;
        self
    }

    /// Set the probability of applying solarization
    pub fn solarize_prob(mut self, p: f64) -> Self {
        self.config.solarize_prob = p;
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_round_trips_through_names() -> Result<()> {
        for stage in Stage::ALL {
            assert_eq!(stage.to_string().parse::<Stage>()?, stage);
        }
        Ok(())
    }

    #[test]
    fn test_unknown_stage_is_rejected() {
        let err = "pretrain".parse::<Stage>().unwrap_err();
        assert_eq!(err, AugmentError::UnsupportedStage("pretrain".into()));
    }

    #[test]
    fn test_only_test_stage_is_deterministic() {
        let randomized: Vec<Stage> = Stage::ALL
            .into_iter()
            .filter(Stage::is_randomized)
            .collect();
        assert_eq!(randomized, vec![Stage::Train, Stage::Val, Stage::Ft]);
    }

    #[test]
    fn test_builder_defaults() {
        let config = PipelineConfig::builder(Stage::Train, 96).build();
        assert_eq!(config.gb_prob, 1.0);
        assert_eq!(config.solarize_prob, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_fills_defaults() -> Result<()> {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "stage": "val", "resize_size": 64 }"#)?;
        assert_eq!(config, PipelineConfig::builder(Stage::Val, 64).build());

        let config: PipelineConfig = serde_json::from_str(
            r#"{ "stage": "train", "resize_size": 32, "gb_prob": 0.1, "solarize_prob": 0.2 }"#,
        )?;
        assert_eq!(config.gb_prob, 0.1);
        assert_eq!(config.solarize_prob, 0.2);
        Ok(())
    }

    #[test]
    fn test_deserialize_rejects_unknown_stage() {
        let parsed =
            serde_json::from_str::<PipelineConfig>(r#"{ "stage": "pretrain", "resize_size": 64 }"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_size = PipelineConfig::builder(Stage::Test, 0).build();
        let bad_prob = PipelineConfig::builder(Stage::Train, 8).gb_prob(1.5).build();

        for config in [bad_size, bad_prob] {
            let err = config.validate().unwrap_err();
            assert!(matches!(
                err.downcast_ref::<AugmentError>(),
                Some(AugmentError::Configuration(_))
            ));
        }
    }
}
