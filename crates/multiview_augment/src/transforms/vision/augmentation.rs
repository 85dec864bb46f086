use crate::error::AugmentError;
use crate::rng::worker_coin;
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use image::DynamicImage;

fn validate_probability(p: f64) -> Result<f64> {
    ensure!(
        (0.0..=1.0).contains(&p),
        AugmentError::config(format!(
            "Probability must be in [0.0, 1.0] range (got {})",
            p
        ))
    );
    Ok(p)
}

// ============================================================================
// RandomHorizontalFlip
// ============================================================================

/// Randomly mirrors images left-to-right.
///
/// # Example
/// ```ignore
/// let flip = RandomHorizontalFlip::new(0.5)?; // 50% flip chance
/// let augmented = flip.apply(image)?;
/// ```
#[derive(Debug, Clone)]
pub struct RandomHorizontalFlip {
    p: f64,
}

impl RandomHorizontalFlip {
    pub fn new(p: f64) -> Result<Self> {
        Ok(Self {
            p: validate_probability(p)?,
        })
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomHorizontalFlip {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(if worker_coin(self.p) { img.fliph() } else { img })
    }
}

// ============================================================================
// RandomVerticalFlip
// ============================================================================

/// Randomly mirrors images top-to-bottom.
#[derive(Debug, Clone)]
pub struct RandomVerticalFlip {
    p: f64,
}

impl RandomVerticalFlip {
    pub fn new(p: f64) -> Result<Self> {
        Ok(Self {
            p: validate_probability(p)?,
        })
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomVerticalFlip {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(if worker_coin(self.p) { img.flipv() } else { img })
    }
}
