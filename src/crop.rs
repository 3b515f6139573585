//! Pure image transforms: black-bar border removal and center cropping.
//!
//! Nothing in this module touches the filesystem; the assembler decides what
//! to load and where to write.

use image::{GrayImage, RgbImage, imageops};
use imageproc::contrast::otsu_level;

/// How border columns are detected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CropStrategy {
    /// Scan columns inward from both edges while every pixel in the column is
    /// at or below `tolerance` in grayscale intensity.
    ColumnScan { tolerance: u8 },
    /// Binarize with an automatic global (Otsu) threshold and keep the span of
    /// columns whose mean mask value reaches `min_column_mean`.
    ThresholdMask { min_column_mean: f32 },
}

impl CropStrategy {
    /// Intensity at or below which a pixel counts as part of a black bar.
    pub const DEFAULT_TOLERANCE: u8 = 10;
    /// Fraction of content pixels a column needs to count as content.
    pub const DEFAULT_MIN_COLUMN_MEAN: f32 = 0.05;

    pub fn threshold_mask() -> Self {
        Self::ThresholdMask {
            min_column_mean: Self::DEFAULT_MIN_COLUMN_MEAN,
        }
    }
}

impl Default for CropStrategy {
    fn default() -> Self {
        Self::ColumnScan {
            tolerance: Self::DEFAULT_TOLERANCE,
        }
    }
}

/// Remove symmetric black margin columns from `image`.
///
/// The crop keeps the inclusive content interval `[left, right]`: an image
/// bordered by `k` black columns on each side comes back exactly `2k` columns
/// narrower. An image with no detectable border is returned byte-identical,
/// and an image with no content at all (every column reads as border) comes
/// back as an empty zero-width crop rather than an error. Idempotent under
/// the column-scan strategy: the first pass leaves nothing for a second pass
/// to find.
pub fn crop_borders(image: &RgbImage, strategy: &CropStrategy) -> RgbImage {
    match *strategy {
        CropStrategy::ColumnScan { tolerance } => crop_column_scan(image, tolerance),
        CropStrategy::ThresholdMask { min_column_mean } => {
            crop_threshold_mask(image, min_column_mean)
        }
    }
}

fn crop_column_scan(image: &RgbImage, tolerance: u8) -> RgbImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let gray = imageops::grayscale(image);

    let mut left = 0;
    while left < width && column_is_border(&gray, left, tolerance) {
        left += 1;
    }
    if left == width {
        // Pure letterbox, no content columns at all.
        return RgbImage::new(0, height);
    }

    let mut right = width - 1;
    while right > left && column_is_border(&gray, right, tolerance) {
        right -= 1;
    }

    if left == 0 && right == width - 1 {
        return image.clone();
    }
    imageops::crop_imm(image, left, 0, right - left + 1, height).to_image()
}

fn column_is_border(gray: &GrayImage, x: u32, tolerance: u8) -> bool {
    (0..gray.height()).all(|y| gray.get_pixel(x, y)[0] <= tolerance)
}

fn crop_threshold_mask(image: &RgbImage, min_column_mean: f32) -> RgbImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image.clone();
    }

    let gray = imageops::grayscale(image);
    let level = otsu_level(&gray);

    let mut left = None;
    let mut right = None;
    for x in 0..width {
        let content = (0..height)
            .filter(|&y| gray.get_pixel(x, y)[0] > level)
            .count();
        if content as f32 / height as f32 >= min_column_mean {
            if left.is_none() {
                left = Some(x);
            }
            right = Some(x);
        }
    }

    match (left, right) {
        (Some(left), Some(right)) => {
            if left == 0 && right == width - 1 {
                image.clone()
            } else {
                imageops::crop_imm(image, left, 0, right - left + 1, height).to_image()
            }
        }
        // The mask never rose above the tolerance anywhere.
        _ => RgbImage::new(0, height),
    }
}

/// Extract a centered rectangle of `min(target_width, width)` by
/// `min(target_height, height)`; the result never exceeds the source in
/// either dimension.
pub fn crop_to_size(image: &RgbImage, target_width: u32, target_height: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let crop_width = target_width.min(width);
    let crop_height = target_height.min(height);
    let x = (width - crop_width) / 2;
    let y = (height - crop_height) / 2;
    imageops::crop_imm(image, x, y, crop_width, crop_height).to_image()
}
