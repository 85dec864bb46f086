//! src/multiview.rs
//!
//! Produces several independently augmented views of one source image.
//!
//! ```text
//!                 ┌──────────────┐
//!   source ─────→ │   ToImage    │ (only for tensor sources)
//!                 └──────┬───────┘
//!            clone ┌─────┼─────┐ clone
//!                  ↓     ↓     ↓
//!             pipeline₀ ... pipelineₙ₋₁   (independent random draws)
//!                  ↓     ↓     ↓
//!               [1,C,H,W] each
//!                  └─────┼─────┘
//!                        ↓ cat(dim 0)
//!                    [N, C, H, W]
//! ```

use crate::error::AugmentError;
use crate::pipeline::Pipeline;
use crate::transforms::vision::ToImage;
use crate::transforms::Transform;
use anyhow::{bail, ensure, Context, Result};
use image::DynamicImage;
use tch::Tensor;
use tracing::{debug, trace};

/// Applies every configured pipeline to the same source image and stacks
/// the results as `[num_views, ...]`, in pipeline order.
///
/// The source is cloned per pipeline, so every view starts from the same
/// pixels and the caller's image is never modified.
///
/// # Example
/// ```ignore
/// let injector = MultiViewInjector::new(vec![
///     build_pipeline("train", 224, 1.0, 0.0)?,
///     build_pipeline("train", 224, 0.1, 0.2)?,
/// ])?;
/// let views = injector.apply(image)?; // [2, 3, 224, 224]
/// ```
#[derive(Debug)]
pub struct MultiViewInjector<P = Pipeline> {
    pipelines: Vec<P>,
    to_image: ToImage,
}

impl<P> MultiViewInjector<P> {
    /// Wraps an ordered, non-empty list of pipelines.
    pub fn new(pipelines: Vec<P>) -> Result<Self> {
        ensure!(
            !pipelines.is_empty(),
            AugmentError::config("MultiViewInjector needs at least one pipeline")
        );
        debug!(num_views = pipelines.len(), "built multi-view injector");
        Ok(Self {
            pipelines,
            to_image: ToImage,
        })
    }

    pub fn num_views(&self) -> usize {
        self.pipelines.len()
    }

    pub fn pipelines(&self) -> &[P] {
        &self.pipelines
    }
}

impl<P> MultiViewInjector<P>
where
    P: Transform<DynamicImage, Tensor>,
{
    fn views(&self, source: &DynamicImage) -> Result<Tensor> {
        let views = self
            .pipelines
            .iter()
            .enumerate()
            .map(|(i, pipeline)| {
                pipeline
                    .apply(source.clone())
                    .map(|view| view.unsqueeze(0))
                    .with_context(|| format!("View {} failed", i))
            })
            .collect::<Result<Vec<_>>>()?;

        let reference = views[0].size();
        for (i, view) in views.iter().enumerate().skip(1) {
            if view.size() != reference {
                bail!(AugmentError::input(format!(
                    "View {} has shape {:?} but view 0 has {:?}",
                    i,
                    view.size(),
                    reference
                )));
            }
        }

        trace!(num_views = views.len(), shape = ?reference, "stacking views");
        Tensor::f_cat(&views, 0).context("Failed to concatenate views")
    }
}

impl<P> Transform<DynamicImage, Tensor> for MultiViewInjector<P>
where
    P: Transform<DynamicImage, Tensor>,
{
    fn apply(&self, source: DynamicImage) -> Result<Tensor> {
        self.views(&source)
    }
}

/// Tensor sources (`[C, H, W]`, uint8 or float in [0, 1]) are first turned
/// back into an image.
impl<P> Transform<Tensor, Tensor> for MultiViewInjector<P>
where
    P: Transform<DynamicImage, Tensor>,
{
    fn apply(&self, source: Tensor) -> Result<Tensor> {
        let image = self
            .to_image
            .apply(source)
            .context("Failed to convert source tensor to an image")?;
        self.views(&image)
    }
}
