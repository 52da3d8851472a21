use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::ticket::UNREADABLE;

/// Rectangle in normalized image coordinates (0.0-1.0, origin top-left)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from pixel corner points, normalized by the image size
    pub fn from_pixel_points(points: &[Vec<f64>], image_width: u32, image_height: u32) -> Self {
        let xs = points.iter().filter_map(|p| p.first().copied());
        let ys = points.iter().filter_map(|p| p.get(1).copied());

        let x_min = xs.clone().fold(f64::INFINITY, f64::min);
        let x_max = xs.fold(f64::NEG_INFINITY, f64::max);
        let y_min = ys.clone().fold(f64::INFINITY, f64::min);
        let y_max = ys.fold(f64::NEG_INFINITY, f64::max);

        if !x_min.is_finite() || !y_min.is_finite() || image_width == 0 || image_height == 0 {
            return Self::default();
        }

        let w = image_width as f64;
        let h = image_height as f64;
        Self {
            x: x_min / w,
            y: y_min / h,
            width: (x_max - x_min) / w,
            height: (y_max - y_min) / h,
        }
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Intersection over union with another rectangle
    pub fn iou(&self, other: &NormalizedRect) -> f64 {
        let inter_x_min = self.x.max(other.x);
        let inter_y_min = self.y.max(other.y);
        let inter_x_max = (self.x + self.width).min(other.x + other.width);
        let inter_y_max = (self.y + self.height).min(other.y + other.height);

        if inter_x_max <= inter_x_min || inter_y_max <= inter_y_min {
            return 0.0;
        }

        let inter_area = (inter_x_max - inter_x_min) * (inter_y_max - inter_y_min);
        let union_area = self.area() + other.area() - inter_area;
        if union_area <= 0.0 {
            return 0.0;
        }

        inter_area / union_area
    }

    /// Grow by `padding` on each side, clamped to the unit square
    pub fn expand(&self, padding: f64) -> Self {
        let x0 = (self.x - padding).max(0.0);
        let y0 = (self.y - padding).max(0.0);
        let x1 = (self.x + self.width + padding).min(1.0);
        let y1 = (self.y + self.height + padding).min(1.0);

        Self {
            x: x0,
            y: y0,
            width: (x1 - x0).max(0.0),
            height: (y1 - y0).max(0.0),
        }
    }
}

/// One number cell of the ticket grid.
///
/// Identity (`Eq`, `Hash`, `Ord`) is the slot `(row, column, is_special)`;
/// the crop and bounding box are payload.
#[derive(Debug, Clone)]
pub struct NumberPosition {
    pub row: usize,
    pub column: usize,
    pub is_special: bool,
    pub image: Arc<DynamicImage>,
    pub bounding_box: NormalizedRect,
}

impl NumberPosition {
    pub fn new(
        row: usize,
        column: usize,
        is_special: bool,
        image: DynamicImage,
        bounding_box: NormalizedRect,
    ) -> Self {
        Self {
            row,
            column,
            is_special,
            image: Arc::new(image),
            bounding_box,
        }
    }

    fn key(&self) -> (usize, usize, bool) {
        (self.row, self.column, self.is_special)
    }
}

impl PartialEq for NumberPosition {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for NumberPosition {}

impl Hash for NumberPosition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for NumberPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NumberPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Grid of number cells found on one ticket image
#[derive(Debug, Clone, Default)]
pub struct LotteryGrid {
    pub row_count: usize,
    pub column_count: usize,
    pub positions: BTreeSet<NumberPosition>,
}

impl LotteryGrid {
    pub fn new(positions: BTreeSet<NumberPosition>) -> Self {
        let row_count = positions.iter().map(|p| p.row + 1).max().unwrap_or(0);
        let column_count = positions.iter().map(|p| p.column + 1).max().unwrap_or(0);

        Self {
            row_count,
            column_count,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Outcome of recognizing one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellReading {
    Accepted(i32),
    Unreadable,
}

impl CellReading {
    /// Value as it appears in a ticket row
    pub fn as_sentinel(&self) -> i32 {
        match self {
            CellReading::Accepted(value) => *value,
            CellReading::Unreadable => UNREADABLE,
        }
    }
}

/// Per-cell readings of one scan attempt
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    readings: HashMap<NumberPosition, CellReading>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, position: NumberPosition, reading: CellReading) {
        self.readings.insert(position, reading);
    }

    pub fn get(&self, position: &NumberPosition) -> Option<CellReading> {
        self.readings.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

impl From<HashMap<NumberPosition, CellReading>> for ScanResult {
    fn from(readings: HashMap<NumberPosition, CellReading>) -> Self {
        Self { readings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn blank() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
    }

    #[test]
    fn test_position_identity_ignores_payload() {
        let a = NumberPosition::new(1, 2, false, blank(), NormalizedRect::new(0.1, 0.1, 0.1, 0.1));
        let b = NumberPosition::new(
            1,
            2,
            false,
            DynamicImage::ImageRgb8(RgbImage::new(9, 9)),
            NormalizedRect::new(0.5, 0.5, 0.2, 0.2),
        );
        let c = NumberPosition::new(1, 2, true, blank(), NormalizedRect::default());

        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(!set.insert(b), "same slot should hash identically");
        assert!(set.insert(c));
    }

    #[test]
    fn test_grid_dimensions() {
        let mut positions = BTreeSet::new();
        positions.insert(NumberPosition::new(0, 0, false, blank(), NormalizedRect::default()));
        positions.insert(NumberPosition::new(2, 5, true, blank(), NormalizedRect::default()));

        let grid = LotteryGrid::new(positions);
        assert_eq!(grid.row_count, 3);
        assert_eq!(grid.column_count, 6);
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_rect_from_pixel_points() {
        let points = vec![
            vec![10.0, 20.0],
            vec![30.0, 20.0],
            vec![30.0, 40.0],
            vec![10.0, 40.0],
        ];
        let rect = NormalizedRect::from_pixel_points(&points, 100, 200);

        assert!((rect.x - 0.1).abs() < 1e-9);
        assert!((rect.y - 0.1).abs() < 1e-9);
        assert!((rect.width - 0.2).abs() < 1e-9);
        assert!((rect.height - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_rect_expand_clamps() {
        let rect = NormalizedRect::new(0.0, 0.95, 0.1, 0.05).expand(0.02);
        assert_eq!(rect.x, 0.0);
        assert!((rect.y - 0.93).abs() < 1e-9);
        assert!((rect.y + rect.height - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_iou() {
        let a = NormalizedRect::new(0.0, 0.0, 0.2, 0.2);
        let b = NormalizedRect::new(0.1, 0.0, 0.2, 0.2);
        let far = NormalizedRect::new(0.5, 0.5, 0.1, 0.1);

        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(a.iou(&far), 0.0);
    }

    #[test]
    fn test_cell_reading_sentinel() {
        assert_eq!(CellReading::Accepted(12).as_sentinel(), 12);
        assert_eq!(CellReading::Unreadable.as_sentinel(), -1);
    }
}
