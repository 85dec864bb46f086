use crate::error::AugmentError;
use crate::rng::with_worker_rng;
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use rand::seq::SliceRandom;
use rand::Rng as _;
use tch::Tensor;
use tracing::trace;

/// ITU-R 601-2 luma, the weights PIL uses for `L` conversion.
#[inline]
fn luma(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// ============================================================================
// Normalize
// ============================================================================

/// Normalizes tensors using channel-wise statistics.
///
/// # Arguments:
/// - `mean`: per-channel means
/// - `std`: per-channel standard deviation.
/// The dimensions of mean and and std should match the input tensor's
/// number of channels.
///
/// # Mathematical Operation:
/// ```text
/// output[...,c,h,w] = (input[...,c,h,w] - mean[c]) / std[c]
/// ```
///
/// # Example
/// ```ignore
/// let norm = Normalize::imagenet();
/// let normalized = norm.apply(tensor)?;
/// ```
#[derive(Debug, Clone)]
pub struct Normalize {
    mean: Vec<f32>,
    std: Vec<f32>,
}

impl Normalize {
    /// Creates new normalization parameters.
    pub fn new(mean: &[f32], std: &[f32]) -> Result<Self> {
        ensure!(
            !mean.is_empty(),
            AugmentError::config("Normalization mean cannot be empty")
        );
        ensure!(
            mean.len() == std.len(),
            AugmentError::config(format!(
                "The mean and standard deviation for normalization must match in dimension \
                 (mean has {}, std has {})",
                mean.len(),
                std.len()
            ))
        );
        ensure!(
            std.iter().all(|s| *s > 0.0),
            AugmentError::config(format!(
                "Normalization std must be strictly positive (got {:?})",
                std
            ))
        );
        Ok(Self {
            mean: mean.to_vec(),
            std: std.to_vec(),
        })
    }

    /// ImageNet standard normalization (RGB)
    pub fn imagenet() -> Self {
        Self {
            mean: vec![0.485, 0.456, 0.406],
            std: vec![0.229, 0.224, 0.225],
        }
    }
}

impl Transform<Tensor, Tensor> for Normalize {
    fn apply(&self, tensor: Tensor) -> Result<Tensor> {
        let (num_channels, _height, _width) = tensor
            .size3()
            .map_err(|_| AugmentError::input("Input must be 3D tensor [C, H, W]"))?;

        ensure!(
            num_channels as usize == self.mean.len(),
            AugmentError::input(format!(
                "Channel count mismatch: input has {} channels but normalization expects {}",
                num_channels,
                self.mean.len()
            ))
        );

        let mean_t = Tensor::from_slice(&self.mean)
            .reshape([num_channels, 1, 1])
            .to_kind(tensor.kind());

        let std_t = Tensor::from_slice(&self.std)
            .reshape([num_channels, 1, 1])
            .to_kind(tensor.kind());

        tensor
            .f_sub(&mean_t)
            .and_then(|t| t.f_div(&std_t))
            .context("Failed to normalize tensor")
    }
}

// ============================================================================
// ColorJitter
// ============================================================================

/// Randomly changes brightness, contrast, saturation and hue.
///
/// Each enabled adjustment draws its own factor per call and the four
/// adjustments run in a fresh random order:
/// - brightness/contrast/saturation factor `~ U[max(0, 1 - x), 1 + x]`
/// - hue shift `~ U[-hue, hue]` as a fraction of a full turn (`hue <= 0.5`)
///
/// Grayscale images only receive brightness and contrast.
///
/// # Example
/// ```ignore
/// let jitter = ColorJitter::new(0.8, 0.8, 0.8, 0.2)?;
/// ```
#[derive(Debug, Clone)]
pub struct ColorJitter {
    brightness: Option<(f32, f32)>,
    contrast: Option<(f32, f32)>,
    saturation: Option<(f32, f32)>,
    hue: Option<(f32, f32)>,
}

#[derive(Debug, Clone, Copy)]
enum Adjustment {
    Brightness(f32),
    Contrast(f32),
    Saturation(f32),
    Hue(f32),
}

impl ColorJitter {
    pub fn new(brightness: f32, contrast: f32, saturation: f32, hue: f32) -> Result<Self> {
        Ok(Self {
            brightness: Self::factor_range("brightness", brightness)?,
            contrast: Self::factor_range("contrast", contrast)?,
            saturation: Self::factor_range("saturation", saturation)?,
            hue: {
                ensure!(
                    (0.0..=0.5).contains(&hue),
                    AugmentError::config(format!("Hue jitter must be in [0, 0.5] (got {})", hue))
                );
                (hue > 0.0).then_some((-hue, hue))
            },
        })
    }

    fn factor_range(name: &str, value: f32) -> Result<Option<(f32, f32)>> {
        ensure!(
            value.is_finite() && value >= 0.0,
            AugmentError::config(format!(
                "{} jitter must be non-negative (got {})",
                name, value
            ))
        );
        Ok((value > 0.0).then_some(((1.0 - value).max(0.0), 1.0 + value)))
    }

    /// Draws the factors and their order for one call.
    fn sample(&self) -> Vec<Adjustment> {
        with_worker_rng(|rng| {
            let mut order = [0usize, 1, 2, 3];
            order.shuffle(rng);

            order
                .into_iter()
                .filter_map(|idx| match idx {
                    0 => self
                        .brightness
                        .map(|(lo, hi)| Adjustment::Brightness(rng.random_range(lo..=hi))),
                    1 => self
                        .contrast
                        .map(|(lo, hi)| Adjustment::Contrast(rng.random_range(lo..=hi))),
                    2 => self
                        .saturation
                        .map(|(lo, hi)| Adjustment::Saturation(rng.random_range(lo..=hi))),
                    _ => self
                        .hue
                        .map(|(lo, hi)| Adjustment::Hue(rng.random_range(lo..=hi))),
                })
                .collect()
        })
    }

    fn adjust_rgb(mut img: RgbImage, adjustment: Adjustment) -> RgbImage {
        match adjustment {
            Adjustment::Brightness(f) => {
                for px in img.pixels_mut() {
                    for c in px.0.iter_mut() {
                        *c = to_u8(*c as f32 * f);
                    }
                }
            }
            Adjustment::Contrast(f) => {
                let n = (img.width() as f32 * img.height() as f32).max(1.0);
                let mean = (img
                    .pixels()
                    .map(|Rgb([r, g, b])| luma(*r as f32, *g as f32, *b as f32))
                    .sum::<f32>()
                    / n)
                    .round();
                for px in img.pixels_mut() {
                    for c in px.0.iter_mut() {
                        *c = to_u8(mean + f * (*c as f32 - mean));
                    }
                }
            }
            Adjustment::Saturation(f) => {
                for px in img.pixels_mut() {
                    let [r, g, b] = px.0.map(|c| c as f32);
                    let gray = luma(r, g, b);
                    px.0 = [r, g, b].map(|c| to_u8(gray + f * (c - gray)));
                }
            }
            Adjustment::Hue(shift) => {
                for px in img.pixels_mut() {
                    let (h, s, v) = rgb_to_hsv(px.0);
                    px.0 = hsv_to_rgb((h + shift).rem_euclid(1.0), s, v);
                }
            }
        }
        img
    }

    fn adjust_luma(mut img: GrayImage, adjustment: Adjustment) -> GrayImage {
        match adjustment {
            Adjustment::Brightness(f) => {
                for px in img.pixels_mut() {
                    px.0[0] = to_u8(px.0[0] as f32 * f);
                }
            }
            Adjustment::Contrast(f) => {
                let n = (img.width() as f32 * img.height() as f32).max(1.0);
                let mean = (img.pixels().map(|p| p.0[0] as f32).sum::<f32>() / n).round();
                for px in img.pixels_mut() {
                    px.0[0] = to_u8(mean + f * (px.0[0] as f32 - mean));
                }
            }
            Adjustment::Saturation(_) | Adjustment::Hue(_) => {}
        }
        img
    }
}

/// RGB bytes to HSV, each component in [0, 1].
fn rgb_to_hsv([r, g, b]: [u8; 3]) -> (f32, f32, f32) {
    let (r, g, b) = (r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };
    (h, s, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let sector = (h * 6.0).floor();
    let f = h * 6.0 - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match sector as i32 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [r, g, b].map(|c| to_u8(c * 255.0))
}

impl Transform<DynamicImage, DynamicImage> for ColorJitter {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let adjustments = self.sample();
        trace!(?adjustments, "color jitter");

        Ok(match img {
            DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(
                adjustments.into_iter().fold(gray, Self::adjust_luma),
            ),
            other => DynamicImage::ImageRgb8(
                adjustments
                    .into_iter()
                    .fold(other.to_rgb8(), Self::adjust_rgb),
            ),
        })
    }
}

// ============================================================================
// Grayscale
// ============================================================================

/// Converts to grayscale while keeping the channel count: RGB stays 3
/// channels (all equal), RGBA keeps its alpha, Luma passes through.
#[derive(Debug, Clone, Default)]
pub struct Grayscale;

impl Transform<DynamicImage, DynamicImage> for Grayscale {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(match img {
            DynamicImage::ImageLuma8(_) => img,
            DynamicImage::ImageRgba8(mut rgba) => {
                for px in rgba.pixels_mut() {
                    let [r, g, b, a] = px.0;
                    let y = to_u8(luma(r as f32, g as f32, b as f32));
                    px.0 = [y, y, y, a];
                }
                DynamicImage::ImageRgba8(rgba)
            }
            other => {
                let mut rgb = other.to_rgb8();
                for px in rgb.pixels_mut() {
                    let [r, g, b] = px.0;
                    let y = to_u8(luma(r as f32, g as f32, b as f32));
                    px.0 = [y, y, y];
                }
                DynamicImage::ImageRgb8(rgb)
            }
        })
    }
}

// ============================================================================
// Solarize
// ============================================================================

/// Inverts every colour value at or above `threshold` (`v -> 255 - v`).
/// Values below the threshold and alpha are left alone.
///
/// Deterministic: wrap in [`RandomApply`](crate::transforms::RandomApply)
/// to solarize only some of the time.
#[derive(Debug, Clone, Copy)]
pub struct Solarize {
    threshold: u8,
}

impl Solarize {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    #[inline]
    fn invert(&self, v: u8) -> u8 {
        if v >= self.threshold {
            255 - v
        } else {
            v
        }
    }
}

impl Default for Solarize {
    fn default() -> Self {
        Self::new(128)
    }
}

impl Transform<DynamicImage, DynamicImage> for Solarize {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(match img {
            DynamicImage::ImageLuma8(mut gray) => {
                gray.iter_mut().for_each(|v| *v = self.invert(*v));
                DynamicImage::ImageLuma8(gray)
            }
            DynamicImage::ImageRgba8(mut rgba) => {
                for px in rgba.pixels_mut() {
                    for c in px.0[..3].iter_mut() {
                        *c = self.invert(*c);
                    }
                }
                DynamicImage::ImageRgba8(rgba)
            }
            other => {
                let mut rgb = other.to_rgb8();
                rgb.iter_mut().for_each(|v| *v = self.invert(*v));
                DynamicImage::ImageRgb8(rgb)
            }
        })
    }
}
