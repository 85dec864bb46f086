use image::{DynamicImage, Rgb, RgbImage};

/// RGB image with a smooth gradient plus a checker pattern, so crops,
/// flips, rotations and blurs all change the pixels.
pub fn textured_image(width: u32, height: u32) -> DynamicImage {
    let mut img = RgbImage::new(width, height);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let checker = if (x / 8 + y / 8) % 2 == 0 { 60 } else { 0 };
        *px = Rgb([
            ((x * 255 / width.max(1)) as u8).saturating_add(checker),
            (y * 255 / height.max(1)) as u8,
            (((x + y) * 3) % 256) as u8,
        ]);
    }
    DynamicImage::ImageRgb8(img)
}
