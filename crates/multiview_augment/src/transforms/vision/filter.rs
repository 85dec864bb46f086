use crate::error::AugmentError;
use crate::rng::worker_gen_range;
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use image::{DynamicImage, GenericImageView, ImageBuffer, Luma, Pixel, Rgb, Rgba};
use imageproc::filter::separable_filter_equal;
use tracing::trace;

// ============================================================================
// GaussianBlur
// ============================================================================

/// Blurs with a square Gaussian kernel whose sigma is redrawn on every call.
///
/// - `kernel_size`: odd, positive window length (same in x and y)
/// - `sigma ~ U[sigma_min, sigma_max]`
///
/// The image is padded by the kernel radius with reflect-101 borders
/// (`dcb|abcd|cba`, the edge pixel is not repeated) and filtered in `f32` by
/// `imageproc`'s separable filter, rows then columns. The padding is cropped
/// off again, so the output keeps the input size. Results are rounded and
/// clamped to `0..=255`.
///
/// # Example
/// ```ignore
/// let blur = GaussianBlur::with_kernel_size(23)?; // sigma in [0.1, 2.0]
/// let blurred = blur.apply(image)?;
/// ```
#[derive(Debug, Clone)]
pub struct GaussianBlur {
    kernel_size: u32,
    sigma_min: f32,
    sigma_max: f32,
}

impl GaussianBlur {
    pub const DEFAULT_SIGMA_MIN: f32 = 0.1;
    pub const DEFAULT_SIGMA_MAX: f32 = 2.0;

    pub fn new(kernel_size: u32, sigma_min: f32, sigma_max: f32) -> Result<Self> {
        ensure!(
            kernel_size > 0 && kernel_size % 2 == 1,
            AugmentError::config(format!(
                "Blur kernel size must be a positive odd integer (got {})",
                kernel_size
            ))
        );
        ensure!(
            sigma_min.is_finite() && sigma_max.is_finite() && sigma_min > 0.0,
            AugmentError::config(format!(
                "Blur sigma must be positive and finite (got [{}, {}])",
                sigma_min, sigma_max
            ))
        );
        ensure!(
            sigma_min <= sigma_max,
            AugmentError::config(format!(
                "Blur sigma range is inverted (min {} > max {})",
                sigma_min, sigma_max
            ))
        );
        Ok(Self {
            kernel_size,
            sigma_min,
            sigma_max,
        })
    }

    /// Blur with the default sigma range `[0.1, 2.0]`.
    pub fn with_kernel_size(kernel_size: u32) -> Result<Self> {
        Self::new(
            kernel_size,
            Self::DEFAULT_SIGMA_MIN,
            Self::DEFAULT_SIGMA_MAX,
        )
    }

    pub fn kernel_size(&self) -> u32 {
        self.kernel_size
    }

    pub fn sigma_range(&self) -> (f32, f32) {
        (self.sigma_min, self.sigma_max)
    }

    /// Normalized 1-D Gaussian weights of length `kernel_size`.
    fn kernel(&self, sigma: f32) -> Vec<f32> {
        let radius = (self.kernel_size / 2) as f32;
        let two_sigma_sq = 2.0 * sigma * sigma;
        let weights: Vec<f32> = (0..self.kernel_size)
            .map(|i| {
                let d = i as f32 - radius;
                (-(d * d) / two_sigma_sq).exp()
            })
            .collect();
        let total: f32 = weights.iter().sum();
        weights.into_iter().map(|w| w / total).collect()
    }

    /// Pads `buf` by the kernel radius with reflect-101 borders, filters it in
    /// `f32` through imageproc, then crops back and rounds to `u8`.
    ///
    /// `Q` is the `f32` counterpart of `P` (e.g. `Rgb<f32>` for `Rgb<u8>`).
    fn blur_buffer<P, Q>(
        buf: &ImageBuffer<P, Vec<u8>>,
        kernel: &[f32],
    ) -> Result<ImageBuffer<P, Vec<u8>>>
    where
        P: Pixel<Subpixel = u8>,
        Q: Pixel<Subpixel = f32>,
    {
        ensure!(
            P::CHANNEL_COUNT == Q::CHANNEL_COUNT,
            AugmentError::input("Blur working buffer has a different channel layout")
        );
        let (width, height) = buf.dimensions();
        let radius = kernel.len() / 2;
        let padded = reflect_pad::<P, Q>(buf, radius).ok_or_else(|| {
            AugmentError::input(format!(
                "Padded buffer does not fit a {}x{} image",
                width, height
            ))
        })?;

        let filtered = separable_filter_equal(&padded, kernel);

        let offset = radius as u32;
        let mut raw = Vec::with_capacity(buf.as_raw().len());
        for y in 0..height {
            for x in 0..width {
                let px = filtered.get_pixel(x + offset, y + offset);
                raw.extend(px.channels().iter().map(|v| v.round().clamp(0.0, 255.0) as u8));
            }
        }

        ImageBuffer::from_raw(width, height, raw).ok_or_else(|| {
            AugmentError::input(format!(
                "Blurred buffer does not fit a {}x{} image",
                width, height
            ))
            .into()
        })
    }
}

/// Reflect-101 index into `0..len` (`len > 0`).
#[inline]
fn reflect(mut i: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    i = i.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as usize
}

/// Copies `buf` into an `f32` buffer grown by `radius` on every side, filling
/// the border by reflect-101 (`dcb|abcd|cba`).
fn reflect_pad<P, Q>(
    buf: &ImageBuffer<P, Vec<u8>>,
    radius: usize,
) -> Option<ImageBuffer<Q, Vec<f32>>>
where
    P: Pixel<Subpixel = u8>,
    Q: Pixel<Subpixel = f32>,
{
    let (width, height) = (buf.width() as usize, buf.height() as usize);
    let channels = P::CHANNEL_COUNT as usize;
    let (padded_w, padded_h) = (width + 2 * radius, height + 2 * radius);
    let src = buf.as_raw();

    let mut raw = Vec::with_capacity(padded_w * padded_h * channels);
    for py in 0..padded_h {
        let sy = reflect(py as isize - radius as isize, height);
        for px in 0..padded_w {
            let sx = reflect(px as isize - radius as isize, width);
            let offset = (sy * width + sx) * channels;
            raw.extend(src[offset..offset + channels].iter().map(|&v| v as f32));
        }
    }
    ImageBuffer::from_raw(padded_w as u32, padded_h as u32, raw)
}

impl Transform<DynamicImage, DynamicImage> for GaussianBlur {
    fn apply(&self, img: DynamicImage) -> Result<DynamicImage> {
        let (width, height) = img.dimensions();
        ensure!(
            width > 0 && height > 0,
            AugmentError::input(format!(
                "Image dimensions must be positive (got {}x{})",
                width, height
            ))
        );

        let sigma = if self.sigma_min == self.sigma_max {
            self.sigma_min
        } else {
            worker_gen_range(self.sigma_min..=self.sigma_max)
        };
        trace!(sigma, kernel_size = self.kernel_size, "gaussian blur");
        let kernel = self.kernel(sigma);

        Ok(match img {
            DynamicImage::ImageLuma8(buf) => {
                DynamicImage::ImageLuma8(Self::blur_buffer::<_, Luma<f32>>(&buf, &kernel)?)
            }
            DynamicImage::ImageRgba8(buf) => {
                DynamicImage::ImageRgba8(Self::blur_buffer::<_, Rgba<f32>>(&buf, &kernel)?)
            }
            other => DynamicImage::ImageRgb8(Self::blur_buffer::<_, Rgb<f32>>(
                &other.to_rgb8(),
                &kernel,
            )?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::init_worker_rng;
    use image::{Rgb, RgbImage};

    fn checkerboard(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                img.put_pixel(x, y, Rgb([v, v / 2, 255 - v]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    fn is_config_error(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<AugmentError>(),
            Some(AugmentError::Configuration(_))
        )
    }

    #[test]
    fn test_blur_rejects_even_kernel() {
        let err = GaussianBlur::with_kernel_size(4).unwrap_err();
        assert!(is_config_error(&err));
    }

    #[test]
    fn test_blur_rejects_zero_kernel_and_inverted_sigma() {
        assert!(is_config_error(&GaussianBlur::with_kernel_size(0).unwrap_err()));
        assert!(is_config_error(&GaussianBlur::new(3, 2.0, 0.5).unwrap_err()));
        assert!(is_config_error(&GaussianBlur::new(3, 0.0, 0.5).unwrap_err()));
    }

    #[test]
    fn test_blur_keeps_dimensions_and_channels() -> Result<()> {
        init_worker_rng(0, 0, 17);
        let blur = GaussianBlur::new(23, 0.1, 2.0)?;

        for (w, h) in [(31, 17), (5, 40), (1, 1)] {
            let out = blur.apply(checkerboard(w, h))?;
            assert_eq!(out.dimensions(), (w, h));
            assert!(matches!(out, DynamicImage::ImageRgb8(_)));
        }

        let gray = DynamicImage::ImageLuma8(image::GrayImage::new(9, 9));
        assert!(matches!(blur.apply(gray)?, DynamicImage::ImageLuma8(_)));
        Ok(())
    }

    #[test]
    fn test_blur_preserves_flat_images() -> Result<()> {
        let blur = GaussianBlur::new(5, 1.5, 1.5)?;
        let flat = DynamicImage::ImageRgb8(RgbImage::from_pixel(6, 6, Rgb([90, 10, 200])));
        assert_eq!(blur.apply(flat.clone())?.as_bytes(), flat.as_bytes());
        Ok(())
    }

    #[test]
    fn test_blur_smooths_checkerboard() -> Result<()> {
        let blur = GaussianBlur::new(5, 2.0, 2.0)?;
        let out = blur.apply(checkerboard(8, 8))?.to_rgb8();
        let red = out.get_pixel(4, 4).0[0];
        assert!(red > 60 && red < 200, "red = {}", red);
        Ok(())
    }

    #[test]
    fn test_kernel_is_normalized_and_symmetric() -> Result<()> {
        let blur = GaussianBlur::with_kernel_size(7)?;
        let k = blur.kernel(1.0);
        assert_eq!(k.len(), 7);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        for i in 0..3 {
            assert!((k[i] - k[6 - i]).abs() < 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_blur_edges_use_reflect_101() -> Result<()> {
        let blur = GaussianBlur::new(3, 1.0, 1.0)?;
        assert_eq!(blur.sigma_range(), (1.0, 1.0));
        let k = blur.kernel(1.0);

        let row = image::GrayImage::from_raw(3, 1, vec![0, 0, 240]).expect("3x1 buffer");
        let out = blur.apply(DynamicImage::ImageLuma8(row))?;

        // Right edge reflects onto x=1 (0), so only the centre tap sees 240.
        let expected_edge = (k[1] * 240.0).round() as u8;
        let expected_mid = (k[2] * 240.0).round() as u8;
        assert_eq!(out.as_bytes(), &[0, expected_mid, expected_edge]);
        Ok(())
    }

    #[test]
    fn test_default_sigma_range() -> Result<()> {
        let blur = GaussianBlur::with_kernel_size(23)?;
        assert_eq!(blur.kernel_size(), 23);
        assert_eq!(
            blur.sigma_range(),
            (GaussianBlur::DEFAULT_SIGMA_MIN, GaussianBlur::DEFAULT_SIGMA_MAX)
        );
        Ok(())
    }

    #[test]
    fn test_reflect_101() {
        let idx: Vec<usize> = (-3..7).map(|i| reflect(i, 4)).collect();
        assert_eq!(idx, vec![3, 2, 1, 0, 1, 2, 3, 2, 1, 0]);
        assert_eq!(reflect(-5, 1), 0);
    }
}
