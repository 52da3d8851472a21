use image::DynamicImage;
use serde::{Deserialize, Serialize};

use super::grid::NormalizedRect;

/// Pixel region of an image
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Convert a normalized rectangle to pixels, clamped to the image bounds
    pub fn from_normalized(rect: &NormalizedRect, image_width: u32, image_height: u32) -> Self {
        let w = image_width as f64;
        let h = image_height as f64;

        let x0 = (rect.x * w).floor().clamp(0.0, w) as u32;
        let y0 = (rect.y * h).floor().clamp(0.0, h) as u32;
        let x1 = ((rect.x + rect.width) * w).ceil().clamp(0.0, w) as u32;
        let y1 = ((rect.y + rect.height) * h).ceil().clamp(0.0, h) as u32;

        Self {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Crop this region out of `image`
    pub fn crop(&self, image: &DynamicImage) -> DynamicImage {
        image.crop_imm(self.x, self.y, self.width, self.height)
    }
}

/// Crop geometry applied once to a captured photo before scanning
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CropStrategy {
    /// Use the whole image
    #[default]
    Full,
    /// Keep the central horizontal band, dropping `margin` from top and bottom
    CenterBand { margin: f64 },
    /// User-selected region
    Custom { rect: NormalizedRect },
}

impl CropStrategy {
    /// Apply the crop; a degenerate region leaves the image untouched
    pub fn apply(&self, image: &DynamicImage) -> DynamicImage {
        let rect = match self {
            CropStrategy::Full => return image.clone(),
            CropStrategy::CenterBand { margin } => {
                let margin = margin.clamp(0.0, 0.49);
                NormalizedRect::new(0.0, margin, 1.0, 1.0 - 2.0 * margin)
            }
            CropStrategy::Custom { rect } => *rect,
        };

        let roi = Roi::from_normalized(&rect, image.width(), image.height());
        if !roi.is_valid() {
            return image.clone();
        }
        roi.crop(image)
    }
}
