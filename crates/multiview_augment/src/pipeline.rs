//! src/pipeline.rs
//!
//! Stage-conditioned assembly of augmentation pipelines.
//!
//! Each [`Stage`] maps to a declarative, ordered list of [`StepSpec`]s
//! ([`Stage::steps`]). A [`Pipeline`] instantiates those steps once and then
//! maps `DynamicImage -> Tensor[3, S, S]` on every call:
//!
//! ```text
//! train/val: EnsureRGB → Rotation{0,90,180,270} → VFlip(0.5) → HFlip(0.5)
//!            → RandomResizedCrop(S, scale 0.2..1) → [ColorJitter(.8,.8,.8,.2)]p=0.8
//!            → [Grayscale]p=0.2 → [GaussianBlur(23)]p=gb_prob
//!            → [Solarize(128)]p=solarize_prob → ToTensor → Normalize
//! ft:        EnsureRGB → RandomResizedCrop(S) → HFlip(0.5) → ToTensor → Normalize
//! test:      EnsureRGB → Resize(short side 256) → CenterCrop(S) → ToTensor → Normalize
//! ```
//!
//! `[step]p=x` is a [`RandomApply`] gate: an independent Bernoulli trial per call.

use crate::config::{PipelineConfig, Stage};
use crate::transforms::vision::{
    CenterCrop, ColorJitter, EnsureRGB, GaussianBlur, Grayscale, Normalize, RandomHorizontalFlip,
    RandomResizedCrop, RandomRotation, RandomVerticalFlip, Resize, Solarize, ToTensor,
};
use crate::transforms::{RandomApply, Transform};
use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage};
use std::fmt;
use tch::Tensor;
use tracing::debug;

type ImageStep = Box<dyn Transform<DynamicImage, DynamicImage>>;

/// Shorter-side length the test stage resizes to before center cropping.
pub const TEST_RESIZE: u32 = 256;
/// Kernel size of the pretraining blur.
pub const BLUR_KERNEL_SIZE: u32 = 23;

/// One image-to-image step of a pipeline, described by value.
#[derive(Debug, Clone, PartialEq)]
pub enum StepSpec {
    EnsureRgb,
    Rotation {
        angles: Vec<f32>,
    },
    VerticalFlip {
        p: f64,
    },
    HorizontalFlip {
        p: f64,
    },
    RandomResizedCrop {
        size: u32,
        scale: (f64, f64),
    },
    ColorJitter {
        brightness: f32,
        contrast: f32,
        saturation: f32,
        hue: f32,
        p: f64,
    },
    Grayscale {
        p: f64,
    },
    GaussianBlur {
        kernel_size: u32,
        p: f64,
    },
    Solarize {
        threshold: u8,
        p: f64,
    },
    ResizeShorterSide {
        size: u32,
    },
    CenterCrop {
        size: u32,
    },
}

impl StepSpec {
    /// Instantiates the step. Invalid parameters fail here, never at call time.
    pub fn build(&self) -> Result<ImageStep> {
        Ok(match self {
            StepSpec::EnsureRgb => Box::new(EnsureRGB),
            StepSpec::Rotation { angles } => Box::new(RandomRotation::new(angles)?),
            StepSpec::VerticalFlip { p } => Box::new(RandomVerticalFlip::new(*p)?),
            StepSpec::HorizontalFlip { p } => Box::new(RandomHorizontalFlip::new(*p)?),
            StepSpec::RandomResizedCrop { size, scale } => {
                Box::new(RandomResizedCrop::new(*size, *size)?.with_scale(*scale)?)
            }
            StepSpec::ColorJitter {
                brightness,
                contrast,
                saturation,
                hue,
                p,
            } => Box::new(RandomApply::new(
                ColorJitter::new(*brightness, *contrast, *saturation, *hue)?,
                *p,
            )?),
            StepSpec::Grayscale { p } => Box::new(RandomApply::new(Grayscale, *p)?),
            StepSpec::GaussianBlur { kernel_size, p } => Box::new(RandomApply::new(
                GaussianBlur::with_kernel_size(*kernel_size)?,
                *p,
            )?),
            StepSpec::Solarize { threshold, p } => {
                Box::new(RandomApply::new(Solarize::new(*threshold), *p)?)
            }
            StepSpec::ResizeShorterSide { size } => {
                Box::new(Resize::shorter_side(*size, FilterType::Triangle)?)
            }
            StepSpec::CenterCrop { size } => Box::new(CenterCrop::new(*size, *size, Some(0))?),
        })
    }
}

impl fmt::Display for StepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepSpec::EnsureRgb => write!(f, "ensure_rgb"),
            StepSpec::Rotation { angles } => write!(f, "rotation{:?}", angles),
            StepSpec::VerticalFlip { p } => write!(f, "vertical_flip(p={})", p),
            StepSpec::HorizontalFlip { p } => write!(f, "horizontal_flip(p={})", p),
            StepSpec::RandomResizedCrop { size, scale } => {
                write!(f, "random_resized_crop({}, scale={:?})", size, scale)
            }
            StepSpec::ColorJitter {
                brightness,
                contrast,
                saturation,
                hue,
                p,
            } => write!(
                f,
                "color_jitter({}, {}, {}, {}, p={})",
                brightness, contrast, saturation, hue, p
            ),
            StepSpec::Grayscale { p } => write!(f, "grayscale(p={})", p),
            StepSpec::GaussianBlur { kernel_size, p } => {
                write!(f, "gaussian_blur({}, p={})", kernel_size, p)
            }
            StepSpec::Solarize { threshold, p } => write!(f, "solarize({}, p={})", threshold, p),
            StepSpec::ResizeShorterSide { size } => write!(f, "resize_shorter_side({})", size),
            StepSpec::CenterCrop { size } => write!(f, "center_crop({})", size),
        }
    }
}

impl Stage {
    /// Ordered image steps for this stage (tensor conversion and
    /// normalization always follow).
    pub fn steps(&self, config: &PipelineConfig) -> Vec<StepSpec> {
        let size = config.resize_size;
        match self {
            Stage::Train | Stage::Val => vec![
                StepSpec::EnsureRgb,
                StepSpec::Rotation {
                    angles: vec![0.0, 90.0, 180.0, 270.0],
                },
                StepSpec::VerticalFlip { p: 0.5 },
                StepSpec::HorizontalFlip { p: 0.5 },
                StepSpec::RandomResizedCrop {
                    size,
                    scale: (0.2, 1.0),
                },
                StepSpec::ColorJitter {
                    brightness: 0.8,
                    contrast: 0.8,
                    saturation: 0.8,
                    hue: 0.2,
                    p: 0.8,
                },
                StepSpec::Grayscale { p: 0.2 },
                StepSpec::GaussianBlur {
                    kernel_size: BLUR_KERNEL_SIZE,
                    p: config.gb_prob,
                },
                StepSpec::Solarize {
                    threshold: 128,
                    p: config.solarize_prob,
                },
            ],
            Stage::Ft => vec![
                StepSpec::EnsureRgb,
                StepSpec::RandomResizedCrop {
                    size,
                    scale: (0.08, 1.0),
                },
                StepSpec::HorizontalFlip { p: 0.5 },
            ],
            Stage::Test => vec![
                StepSpec::EnsureRgb,
                StepSpec::ResizeShorterSide { size: TEST_RESIZE },
                StepSpec::CenterCrop { size },
            ],
        }
    }
}

/// An ordered augmentation pipeline producing one normalized view.
///
/// Image steps run in construction order, then `ToTensor`, then ImageNet
/// `Normalize`. The pipeline holds no per-image state; `apply` can be called
/// from many threads at once.
pub struct Pipeline {
    specs: Vec<StepSpec>,
    steps: Vec<ImageStep>,
    to_tensor: ToTensor,
    normalize: Normalize,
}

impl Pipeline {
    /// Builds the pipeline for `config.stage`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let pipeline = Self::from_steps(config.stage.steps(config))
            .with_context(|| format!("Failed to build '{}' pipeline", config.stage))?;
        debug!(
            stage = %config.stage,
            resize_size = config.resize_size,
            gb_prob = config.gb_prob,
            solarize_prob = config.solarize_prob,
            steps = ?pipeline.step_names(),
            "built augmentation pipeline"
        );
        Ok(pipeline)
    }

    /// Builds a pipeline from an explicit step list.
    pub fn from_steps(specs: Vec<StepSpec>) -> Result<Self> {
        let steps = specs
            .iter()
            .map(|spec| spec.build().with_context(|| format!("Invalid step {}", spec)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            specs,
            steps,
            to_tensor: ToTensor,
            normalize: Normalize::imagenet(),
        })
    }

    pub fn specs(&self) -> &[StepSpec] {
        &self.specs
    }

    /// Human-readable names of every step, tail included.
    pub fn step_names(&self) -> Vec<String> {
        self.specs
            .iter()
            .map(ToString::to_string)
            .chain(["to_tensor".to_string(), "normalize".to_string()])
            .collect()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.step_names())
            .finish()
    }
}

impl Transform<DynamicImage, Tensor> for Pipeline {
    fn apply(&self, img: DynamicImage) -> Result<Tensor> {
        let img = self
            .specs
            .iter()
            .zip(&self.steps)
            .try_fold(img, |img, (spec, step)| {
                step.apply(img)
                    .with_context(|| format!("Pipeline step {} failed", spec))
            })?;
        let tensor = self.to_tensor.apply(img)?;
        self.normalize.apply(tensor)
    }
}

/// Pipeline factory keyed by stage name.
///
/// Unknown stage names fail with [`AugmentError::UnsupportedStage`](crate::error::AugmentError).
///
/// # Example
/// ```ignore
/// let train = build_pipeline("train", 224, 1.0, 0.0)?;
/// let view: Tensor = train.apply(image)?; // [3, 224, 224]
/// ```
pub fn build_pipeline(
    stage: &str,
    resize_size: u32,
    gb_prob: f64,
    solarize_prob: f64,
) -> Result<Pipeline> {
    let stage: Stage = stage.parse()?;
    Pipeline::from_config(
        &PipelineConfig::builder(stage, resize_size)
            .gb_prob(gb_prob)
            .solarize_prob(solarize_prob)
            .build(),
    )
}
