use crate::error::AugmentError;
use crate::rng::{with_worker_rng, worker_gen_range};
use crate::transforms::Transform;
use anyhow::{bail, ensure, Result};
use image::{imageops, imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};
use imageproc::geometric_transformations::{rotate, Interpolation};
use rand::Rng as _;
use tracing::{trace, warn};

// ============================================================================
// EnsureRGB
// ============================================================================
/// Ensures that the image is indeed 3-channel RGB
#[derive(Debug, Clone)]
pub struct EnsureRGB;

impl Transform<DynamicImage, DynamicImage> for EnsureRGB {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        Ok(match img {
            DynamicImage::ImageRgb8(_) => img,
            _ => DynamicImage::ImageRgb8(img.to_rgb8()),
        })
    }
}

// ============================================================================
// Resize
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResizeTarget {
    Exact { width: u32, height: u32 },
    ShorterSide(u32),
}

/// Resizes an image either to an exact `(width, height)` or so that its
/// shorter side matches a given length (aspect ratio preserved, longer
/// side truncated). Users must specify the filter type.
///
/// # Filter Types
/// - `Nearest`: Nearest neighbour, fastest
/// - `Triangle`: Bilinear filter, good all-round default
/// - `CatmullRom`: Bicubic sharpening
/// - `Gaussian`: Blurring/smoothing
/// - `Lanczos3`: Lanczos with window 3, highest quality re-sampling but slowest.
///
/// # Examples
/// ``` ignore
/// # use image::imageops::FilterType;
/// let exact = Resize::new((224, 224), FilterType::Triangle)?;
/// let short = Resize::shorter_side(256, FilterType::Triangle)?; // 500x375 -> 341x256
/// ```
#[derive(Debug, Clone)]
pub struct Resize {
    target: ResizeTarget,
    filter: FilterType,
}

impl Resize {
    /// Creates a Resize transform with an exact output size.
    pub fn new((width, height): (u32, u32), filter: FilterType) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            AugmentError::config(format!(
                "Image dimensions must be positive after resizing (got {}x{})",
                width, height
            ))
        );
        Ok(Self {
            target: ResizeTarget::Exact { width, height },
            filter,
        })
    }

    /// Creates a Resize transform that scales the shorter side to `size`.
    pub fn shorter_side(size: u32, filter: FilterType) -> Result<Self> {
        ensure!(
            size > 0,
            AugmentError::config("Shorter-side resize length must be positive")
        );
        Ok(Self {
            target: ResizeTarget::ShorterSide(size),
            filter,
        })
    }

    fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        match self.target {
            ResizeTarget::Exact { width, height } => (width, height),
            ResizeTarget::ShorterSide(size) => {
                let scale_long = |long: u32, short: u32| {
                    ((size as u64 * long as u64) / short as u64).max(1) as u32
                };
                if width <= height {
                    (size, scale_long(height, width))
                } else {
                    (scale_long(width, height), size)
                }
            }
        }
    }
}

impl Transform<DynamicImage, DynamicImage> for Resize {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (width, height) = img.dimensions();
        ensure!(
            width > 0 && height > 0,
            AugmentError::input(format!(
                "Image dimensions must be positive (got {}x{})",
                width, height
            ))
        );

        let (out_w, out_h) = self.output_size(width, height);
        if (out_w, out_h) == (width, height) {
            return Ok(img);
        }
        Ok(img.resize_exact(out_w, out_h, self.filter))
    }
}

// ============================================================================
// CenterCrop
// ============================================================================

/// Crops the central `width x height` region.
///
/// When the image is smaller than the crop in either dimension it is first
/// padded symmetrically with `pad_fill` (output becomes RGB8). Without a
/// fill value an undersized image is an input error.
#[derive(Debug, Clone)]
pub struct CenterCrop {
    width: u32,
    height: u32,
    pad_fill: Option<u8>,
}

impl CenterCrop {
    pub fn new(width: u32, height: u32, pad_fill: Option<u8>) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            AugmentError::config(format!(
                "Crop dimensions must be positive (got {}x{})",
                width, height
            ))
        );
        Ok(Self {
            width,
            height,
            pad_fill,
        })
    }

    fn pad_to_fit(&self, img: DynamicImage, fill: u8) -> DynamicImage {
        let (width, height) = img.dimensions();
        let canvas_w = width.max(self.width);
        let canvas_h = height.max(self.height);
        let left = (canvas_w - width) / 2;
        let top = (canvas_h - height) / 2;

        let mut canvas = RgbImage::from_pixel(canvas_w, canvas_h, Rgb([fill; 3]));
        imageops::replace(&mut canvas, &img.to_rgb8(), left as i64, top as i64);
        DynamicImage::ImageRgb8(canvas)
    }
}

/// Offset of a centred span, rounding half to even.
fn center_offset(outer: u32, inner: u32) -> u32 {
    ((outer - inner) as f64 / 2.0).round_ties_even() as u32
}

impl Transform<DynamicImage, DynamicImage> for CenterCrop {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (width, height) = img.dimensions();
        ensure!(
            width > 0 && height > 0,
            AugmentError::input(format!(
                "Image dimensions must be positive (got {}x{})",
                width, height
            ))
        );

        let img = if width < self.width || height < self.height {
            match self.pad_fill {
                Some(fill) => {
                    warn!(
                        width,
                        height,
                        crop_width = self.width,
                        crop_height = self.height,
                        "Image smaller than center crop, padding"
                    );
                    self.pad_to_fit(img, fill)
                }
                None => bail!(AugmentError::input(format!(
                    "Image {}x{} is smaller than center crop {}x{}",
                    width, height, self.width, self.height
                ))),
            }
        } else {
            img
        };

        let (width, height) = img.dimensions();
        let left = center_offset(width, self.width);
        let top = center_offset(height, self.height);
        Ok(img.crop_imm(left, top, self.width, self.height))
    }
}

// ============================================================================
// RandomResizedCrop
// ============================================================================

/// Crops a random region and resizes it to `width x height`.
///
/// The region covers a fraction of the source area drawn from `scale` and
/// has an aspect ratio drawn log-uniformly from `ratio`. Ten placements are
/// attempted; if none fits, a centred crop clamped to `ratio` is used.
///
/// # Example
/// ```ignore
/// let crop = RandomResizedCrop::new(224, 224)?.with_scale((0.2, 1.0))?;
/// ```
#[derive(Debug, Clone)]
pub struct RandomResizedCrop {
    width: u32,
    height: u32,
    scale: (f64, f64),
    ratio: (f64, f64),
    filter: FilterType,
}

impl RandomResizedCrop {
    const MAX_ATTEMPTS: usize = 10;

    /// Creates the transform with scale `(0.08, 1.0)` and ratio `(3/4, 4/3)`.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            AugmentError::config(format!(
                "Output dimensions must be positive (got {}x{})",
                width, height
            ))
        );
        Ok(Self {
            width,
            height,
            scale: (0.08, 1.0),
            ratio: (3.0 / 4.0, 4.0 / 3.0),
            filter: FilterType::Triangle,
        })
    }

    pub fn with_scale(mut self, scale: (f64, f64)) -> Result<Self> {
        ensure!(
            scale.0 > 0.0 && scale.0 <= scale.1 && scale.1 <= 1.0,
            AugmentError::config(format!(
                "Scale range must satisfy 0 < min <= max <= 1 (got {:?})",
                scale
            ))
        );
        self.scale = scale;
        Ok(self)
    }

    pub fn with_ratio(mut self, ratio: (f64, f64)) -> Result<Self> {
        ensure!(
            ratio.0 > 0.0 && ratio.0 <= ratio.1,
            AugmentError::config(format!(
                "Aspect ratio range must satisfy 0 < min <= max (got {:?})",
                ratio
            ))
        );
        self.ratio = ratio;
        Ok(self)
    }

    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Picks the crop box `(left, top, width, height)` for an image.
    fn crop_box(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let area = width as f64 * height as f64;
        let log_ratio = (self.ratio.0.ln(), self.ratio.1.ln());

        let sampled = with_worker_rng(|rng| {
            for _ in 0..Self::MAX_ATTEMPTS {
                let target_area = area * rng.random_range(self.scale.0..=self.scale.1);
                let aspect = rng.random_range(log_ratio.0..=log_ratio.1).exp();

                let w = (target_area * aspect).sqrt().round() as u32;
                let h = (target_area / aspect).sqrt().round() as u32;

                if w > 0 && w <= width && h > 0 && h <= height {
                    let top = rng.random_range(0..=height - h);
                    let left = rng.random_range(0..=width - w);
                    return Some((left, top, w, h));
                }
            }
            None
        });

        sampled.unwrap_or_else(|| {
            let in_ratio = width as f64 / height as f64;
            let (w, h) = if in_ratio < self.ratio.0 {
                (width, ((width as f64 / self.ratio.0).round() as u32).clamp(1, height))
            } else if in_ratio > self.ratio.1 {
                (((height as f64 * self.ratio.1).round() as u32).clamp(1, width), height)
            } else {
                (width, height)
            };
            ((width - w) / 2, (height - h) / 2, w, h)
        })
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomResizedCrop {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (width, height) = img.dimensions();
        ensure!(
            width > 0 && height > 0,
            AugmentError::input(format!(
                "Image dimensions must be positive (got {}x{})",
                width, height
            ))
        );

        let (left, top, w, h) = self.crop_box(width, height);
        trace!(left, top, w, h, "random resized crop");
        Ok(img
            .crop_imm(left, top, w, h)
            .resize_exact(self.width, self.height, self.filter))
    }
}

// ============================================================================
// RandomRotation
// ============================================================================

/// Rotates by one angle (degrees, counter-clockwise) picked uniformly from a
/// fixed set.
///
/// An angle of exactly `0` returns the input untouched, with no resampling.
/// Rotation is about the pixel centre `((w-1)/2, (h-1)/2)`. Quarter turns are
/// exact; other angles use nearest-neighbour sampling. The canvas keeps its
/// size, so overhang is cropped and uncovered pixels are black.
///
/// # Example
/// ```ignore
/// let rotate = RandomRotation::new(&[0.0, 90.0, 180.0, 270.0])?;
/// let rotated = rotate.apply(image)?;
/// ```
#[derive(Debug, Clone)]
pub struct RandomRotation {
    angles: Vec<f32>,
}

impl RandomRotation {
    pub fn new(angles: &[f32]) -> Result<Self> {
        ensure!(
            !angles.is_empty(),
            AugmentError::config("Rotation angle set cannot be empty")
        );
        ensure!(
            angles.iter().all(|a| a.is_finite()),
            AugmentError::config(format!("Rotation angles must be finite (got {:?})", angles))
        );
        Ok(Self {
            angles: angles.to_vec(),
        })
    }

    /// The quarter-turn set {0, 90, 180, 270}.
    pub fn quarter_turns() -> Self {
        Self {
            angles: vec![0.0, 90.0, 180.0, 270.0],
        }
    }

    pub fn angles(&self) -> &[f32] {
        &self.angles
    }

    /// Pixel-centre of a `width x height` canvas.
    fn pivot(width: u32, height: u32) -> (f32, f32) {
        ((width as f32 - 1.0) / 2.0, (height as f32 - 1.0) / 2.0)
    }

    /// Places a quarter-turned image (`height x width`) centred on a black
    /// canvas of the original `width x height`, cropping the overhang.
    fn recentre(turned: DynamicImage, width: u32, height: u32) -> DynamicImage {
        if turned.dimensions() == (width, height) {
            return turned;
        }
        let mut canvas = DynamicImage::new(width, height, turned.color());
        let dx = (width as i64 - height as i64).div_euclid(2);
        let dy = (height as i64 - width as i64).div_euclid(2);
        imageops::replace(&mut canvas, &turned, dx, dy);
        canvas
    }

    fn rotate_by(img: DynamicImage, degrees: f32) -> DynamicImage {
        let (width, height) = img.dimensions();

        // Quarter turns map pixels exactly, no resampling.
        match degrees.rem_euclid(360.0) {
            0.0 => return img,
            90.0 => return Self::recentre(img.rotate270(), width, height),
            180.0 => return img.rotate180(),
            270.0 => return Self::recentre(img.rotate90(), width, height),
            _ => {}
        }

        // imageproc rotates clockwise; angles here are counter-clockwise.
        let theta = -degrees.to_radians();
        let centre = Self::pivot(width, height);
        match img {
            DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(rotate(
                &buf,
                centre,
                theta,
                Interpolation::Nearest,
                image::Luma([0]),
            )),
            DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(rotate(
                &buf,
                centre,
                theta,
                Interpolation::Nearest,
                image::Rgba([0, 0, 0, 0]),
            )),
            other => DynamicImage::ImageRgb8(rotate(
                &other.to_rgb8(),
                centre,
                theta,
                Interpolation::Nearest,
                Rgb([0, 0, 0]),
            )),
        }
    }
}

impl Transform<DynamicImage, DynamicImage> for RandomRotation {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let angle = self.angles[worker_gen_range(0..self.angles.len())];
        trace!(angle, "random rotation");
        if angle == 0.0 {
            return Ok(img);
        }
        Ok(Self::rotate_by(img, angle))
    }
}
