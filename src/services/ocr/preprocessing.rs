use crate::models::config::PreprocessingConfig;
use image::{imageops, DynamicImage, GenericImageView, ImageBuffer, Luma};

/// Deterministic filter chains that make ticket photos recognition-friendly
#[derive(Debug, Clone, Default)]
pub struct ImageNormalizer {
    config: PreprocessingConfig,
}

impl ImageNormalizer {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    /// Full-ticket pass: contrast → brightness → sharpen → grayscale → blur
    pub fn normalize(&self, image: &DynamicImage) -> DynamicImage {
        let boosted = image
            .adjust_contrast(self.config.contrast)
            .brighten(self.config.brightness);
        let sharpened = boosted.unsharpen(self.config.sharpen_sigma, 1);
        let gray = self.to_grayscale(&sharpened);
        gray.blur(self.config.blur_sigma)
    }

    /// Three variants of a single cell, tried in order:
    /// upscaled + binarized, strong contrast + desaturated, inverted
    pub fn digit_variants(&self, cell: &DynamicImage) -> Vec<DynamicImage> {
        let upscaled = self.scale(cell, self.config.digit_scale_factor);
        let binarized = self.threshold(
            &upscaled
                .adjust_contrast(self.config.contrast)
                .unsharpen(self.config.sharpen_sigma, 1),
        );

        let strong = self.to_grayscale(
            &cell
                .adjust_contrast(self.config.contrast * 2.0)
                .unsharpen(self.config.sharpen_sigma * 2.0, 2),
        );

        let inverted = self.invert(cell);

        vec![binarized, strong, inverted]
    }

    /// Convert image to grayscale
    pub fn to_grayscale(&self, image: &DynamicImage) -> DynamicImage {
        DynamicImage::ImageLuma8(image.to_luma8())
    }

    /// Scale image by factor
    pub fn scale(&self, image: &DynamicImage, factor: f64) -> DynamicImage {
        let (width, height) = image.dimensions();
        let new_width = ((width as f64 * factor) as u32).max(1);
        let new_height = ((height as f64 * factor) as u32).max(1);

        image.resize_exact(new_width, new_height, imageops::FilterType::Lanczos3)
    }

    /// Invert image colors (white text becomes black, black becomes white)
    pub fn invert(&self, image: &DynamicImage) -> DynamicImage {
        let mut img = image.clone();
        img.invert();
        img
    }

    /// Apply binary thresholding (Otsu's method)
    pub fn threshold(&self, image: &DynamicImage) -> DynamicImage {
        use imageproc::contrast::otsu_level;

        let gray_img = image.to_luma8();
        let threshold_value = otsu_level(&gray_img);

        let binary = ImageBuffer::from_fn(gray_img.width(), gray_img.height(), |x, y| {
            if gray_img.get_pixel(x, y)[0] > threshold_value {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });

        DynamicImage::ImageLuma8(binary)
    }
}
