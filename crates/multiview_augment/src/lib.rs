//! Randomized multi-view image augmentation for self-supervised pretraining.
//!
//! - [`transforms`]: the `Transform` trait, combinators and vision operators
//! - [`pipeline`]: stage-conditioned pipeline assembly (`train`/`val`/`ft`/`test`)
//! - [`multiview`]: stacks several augmented views of one image
//! - [`rng`]: per-thread, seedable randomness used by every random operator

pub mod config;
pub mod error;
pub mod multiview;
pub mod pipeline;
pub mod rng;
pub mod transforms;

pub use config::{PipelineConfig, Stage};
pub use error::AugmentError;
pub use multiview::MultiViewInjector;
pub use pipeline::{build_pipeline, Pipeline, StepSpec};
pub use rng::init_worker_rng;
pub use transforms::{RandomApply, Transform};
