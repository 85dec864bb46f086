use crate::error::AugmentError;
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use image::{DynamicImage, GenericImageView, GrayImage, RgbImage, RgbaImage};
use tch::{Kind, Tensor};

// ============================================================================
// ToTensor
// ============================================================================

/// Converts an image to a channel-first f32 tensor in [0.0, 1.0] range.
///
/// Channel Handling
/// | Input Format  | Output Shape |
/// |---------------|--------------|
/// | Grayscale (L) | `[1, H, W]`  |
/// | RGB           | `[3, H, W]`  |
/// | RGBA          | `[4, H, W]`  |
/// | Other         | `[3, H, W]`  |
/// Note: *CMYK, BGR, etc. will undergo implicit conversion to RGB.
///       For precise format control, pre-convert your images.
///
/// # Example
/// ```ignore
/// let converter = ToTensor;
/// let tensor = converter.apply(image)?;
/// ```
#[derive(Debug, Clone)]
pub struct ToTensor;

impl Transform<DynamicImage, Tensor> for ToTensor {
    fn apply(&self, img: DynamicImage) -> Result<Tensor> {
        let (width, height) = img.dimensions();
        ensure!(
            width > 0 && height > 0,
            AugmentError::input(format!(
                "Image dimensions must be positive (got {}x{})",
                width, height
            ))
        );

        let (raw, channels) = match img {
            DynamicImage::ImageLuma8(img) => (img.into_raw(), 1),
            DynamicImage::ImageRgb8(img) => (img.into_raw(), 3),
            DynamicImage::ImageRgba8(img) => (img.into_raw(), 4),
            // Handle all other cases via conversion to RGB
            other => (other.to_rgb8().into_raw(), 3),
        };

        // Pixel buffers are interleaved HWC; tensors are CHW.
        Tensor::from_slice(&raw)
            .reshape([height as i64, width as i64, channels])
            .permute([2, 0, 1])
            .to_kind(Kind::Float)
            .f_div_scalar(255.0)
            .context("Failed to scale tensor values")
    }
}

// ============================================================================
// ToImage
// ============================================================================

/// Converts a `[C, H, W]` tensor back into an image, the inverse of
/// [`ToTensor`].
///
/// - `Uint8` tensors are used as-is.
/// - Floating-point tensors are assumed to be in [0, 1], scaled by 255,
///   clamped, and truncated.
/// - `C` must be 1 (Luma8), 3 (Rgb8) or 4 (Rgba8).
#[derive(Debug, Clone)]
pub struct ToImage;

impl Transform<Tensor, DynamicImage> for ToImage {
    fn apply(&self, tensor: Tensor) -> Result<DynamicImage> {
        let (channels, height, width) = tensor.size3().map_err(|_| {
            AugmentError::input(format!(
                "Expected a [C, H, W] tensor, got shape {:?}",
                tensor.size()
            ))
        })?;
        ensure!(
            height > 0 && width > 0,
            AugmentError::input(format!(
                "Image dimensions must be positive (got {}x{})",
                width, height
            ))
        );

        let bytes = match tensor.kind() {
            Kind::Uint8 => tensor,
            Kind::Float | Kind::Double | Kind::Half | Kind::BFloat16 => tensor
                .to_kind(Kind::Float)
                .f_mul_scalar(255.0)?
                .clamp(0.0, 255.0)
                .to_kind(Kind::Uint8),
            other => {
                return Err(AugmentError::input(format!(
                    "Unsupported tensor dtype {:?} for image conversion",
                    other
                ))
                .into())
            }
        };

        let hwc = bytes.permute([1, 2, 0]).contiguous().view([-1]);
        let raw = Vec::<u8>::try_from(&hwc).context("Failed to copy tensor data")?;
        let (w, h) = (width as u32, height as u32);

        let image = match channels {
            1 => GrayImage::from_raw(w, h, raw).map(DynamicImage::ImageLuma8),
            3 => RgbImage::from_raw(w, h, raw).map(DynamicImage::ImageRgb8),
            4 => RgbaImage::from_raw(w, h, raw).map(DynamicImage::ImageRgba8),
            n => {
                return Err(AugmentError::input(format!(
                    "Unsupported channel count {} (expected 1, 3 or 4)",
                    n
                ))
                .into())
            }
        };
        image.ok_or_else(|| AugmentError::input("Tensor data does not fit image buffer").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tch::{Device, Kind};

    fn test_rgb_image() -> DynamicImage {
        let mut img = RgbImage::new(3, 2);
        for x in 0..3 {
            for y in 0..2 {
                img.put_pixel(x, y, Rgb([(x * 85) as u8, (y * 85) as u8, 128]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_to_tensor() -> Result<()> {
        let img = test_rgb_image();
        let converter = ToTensor;

        let tensor = converter.apply(img)?;
        assert_eq!(tensor.size(), vec![3, 2, 3]); // CHW format
        assert_eq!(tensor.kind(), Kind::Float);

        // Verify normalization to [0,1]
        let min = tensor.f_min()?.double_value(&[]);
        let max = tensor.f_max()?.double_value(&[]);
        assert!(min >= 0.0 && max <= 1.0);
        Ok(())
    }

    #[test]
    fn test_to_tensor_is_channel_first() -> Result<()> {
        let tensor = ToTensor.apply(test_rgb_image())?;

        // Pixel (x=2, y=1) is [170, 85, 128]
        assert!((tensor.double_value(&[0, 1, 2]) - 170.0 / 255.0).abs() < 1e-6);
        assert!((tensor.double_value(&[1, 1, 2]) - 85.0 / 255.0).abs() < 1e-6);
        assert!((tensor.double_value(&[2, 1, 2]) - 128.0 / 255.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_to_image_inverts_to_tensor_for_bytes() -> Result<()> {
        let img = test_rgb_image();
        let bytes = ToTensor
            .apply(img.clone())?
            .f_mul_scalar(255.0)?
            .round()
            .to_kind(Kind::Uint8);

        let back = ToImage.apply(bytes)?;
        assert_eq!(back.as_bytes(), img.as_bytes());
        Ok(())
    }

    #[test]
    fn test_to_image_from_float() -> Result<()> {
        let tensor = Tensor::ones([1, 2, 2], (Kind::Float, Device::Cpu));
        let img = ToImage.apply(tensor)?;
        assert!(matches!(img, DynamicImage::ImageLuma8(_)));
        assert_eq!(img.as_bytes(), &[255, 255, 255, 255]);
        Ok(())
    }

    #[test]
    fn test_to_image_rejects_bad_shapes() {
        let two_channel = Tensor::zeros([2, 4, 4], (Kind::Uint8, Device::Cpu));
        let flat = Tensor::zeros([16], (Kind::Uint8, Device::Cpu));

        for tensor in [two_channel, flat] {
            let err = ToImage.apply(tensor).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<AugmentError>(),
                Some(AugmentError::Input(_))
            ));
        }
    }
}
