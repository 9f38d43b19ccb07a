//! Alpha channel inspection.

use image::DynamicImage;

/// Check if an image has an alpha channel
pub fn has_alpha_channel(img: &DynamicImage) -> bool {
    img.color().has_alpha()
}

/// Check if any pixel of an image is not fully opaque.
///
/// Images without an alpha channel are always opaque. 16-bit and float
/// images are compared against their own maximum sample value.
pub fn uses_alpha(img: &DynamicImage) -> bool {
    match img {
        DynamicImage::ImageLumaA8(buf) => buf.pixels().any(|p| p[1] < u8::MAX),
        DynamicImage::ImageRgba8(buf) => buf.pixels().any(|p| p[3] < u8::MAX),
        DynamicImage::ImageLumaA16(buf) => buf.pixels().any(|p| p[1] < u16::MAX),
        DynamicImage::ImageRgba16(buf) => buf.pixels().any(|p| p[3] < u16::MAX),
        DynamicImage::ImageRgba32F(buf) => buf.pixels().any(|p| p[3] < 1.0),
        other if has_alpha_channel(other) => other.to_rgba8().pixels().any(|p| p[3] < u8::MAX),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{LumaA, Rgba, RgbaImage};

    #[test]
    fn test_has_alpha_channel() {
        let rgba_img = DynamicImage::ImageRgba8(RgbaImage::new(1, 1));
        assert!(has_alpha_channel(&rgba_img));

        let rgb_img = DynamicImage::ImageRgb8(image::RgbImage::new(1, 1));
        assert!(!has_alpha_channel(&rgb_img));
    }

    #[test]
    fn test_opaque_rgba_does_not_use_alpha() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        assert!(!uses_alpha(&DynamicImage::ImageRgba8(img)));
    }

    #[test]
    fn test_single_translucent_pixel_uses_alpha() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));
        img.put_pixel(3, 3, Rgba([10, 20, 30, 254]));
        assert!(uses_alpha(&DynamicImage::ImageRgba8(img)));
    }

    #[test]
    fn test_luma_alpha() {
        let img = image::ImageBuffer::from_pixel(2, 2, LumaA([128u8, 0]));
        assert!(uses_alpha(&DynamicImage::ImageLumaA8(img)));
    }

    #[test]
    fn test_rgb_never_uses_alpha() {
        let img = DynamicImage::ImageRgb8(image::RgbImage::new(3, 3));
        assert!(!uses_alpha(&img));
    }
}
