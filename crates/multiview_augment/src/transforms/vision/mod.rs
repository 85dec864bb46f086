//! src/transforms/vision/mod.rs
//!
//! Vision transforms for building augmentation pipelines.
//!
//! # Module Organization
//!
//! ```text
//! transforms/vision/
//! ├── geometric.rs     → Spatial transformations (resize, crop, rotate)
//! ├── augmentation.rs  → Random flips
//! ├── photometric.rs   → Color and appearance (jitter, grayscale, solarize, normalize)
//! ├── filter.rs        → Gaussian blur with a random sigma
//! └── conversion.rs    → Format conversions (image ↔ tensor)
//! ```
//!
//! # Quick Start
//!
//! All transforms are re-exported at the module level for convenient access:
//!
//! ```ignore
//! use crate::transforms::{RandomApply, Transform};
//! use crate::transforms::vision::*;
//!
//! let pipeline = RandomRotation::quarter_turns()
//!     .then(RandomResizedCrop::new(224, 224)?.with_scale((0.2, 1.0))?)
//!     .then(RandomApply::new(GaussianBlur::with_kernel_size(23)?, 0.5)?)
//!     .then(ToTensor)
//!     .then(Normalize::imagenet());
//! ```

pub mod augmentation;
pub mod conversion;
pub mod filter;
pub mod geometric;
pub mod photometric;

pub use augmentation::{RandomHorizontalFlip, RandomVerticalFlip};
pub use conversion::{ToImage, ToTensor};
pub use filter::GaussianBlur;
pub use geometric::{CenterCrop, EnsureRGB, RandomResizedCrop, RandomRotation, Resize};
pub use photometric::{ColorJitter, Grayscale, Normalize, Solarize};
