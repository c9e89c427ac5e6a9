//! Per-pixel semantic class maps produced by the classifier boundary.
//!
//! A class map assigns one of three labels to every pixel of the resized scan
//! that was fed to the classifier: cardboard mount, scanner background, or
//! photograph. The map has the same spatial shape as the classifier input and
//! lives in its own coordinate space; the `prediction_scale` factor relates it
//! to the full-resolution scan.

use crate::core::{ExtractResult, ExtractionError};
use image::{GrayImage, Luma};
use ndarray::Array2;

/// Semantic label of a single class-map pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ClassLabel {
    /// The cardboard mount substrate.
    Cardboard = 0,
    /// The scanner background around the mount.
    Background = 1,
    /// The photograph embedded in the mount.
    Photograph = 2,
}

impl ClassLabel {
    /// Converts a raw label value into a ClassLabel.
    ///
    /// # Arguments
    ///
    /// * `value` - The raw integer label.
    ///
    /// # Returns
    ///
    /// The matching label, or None for values outside the label set.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ClassLabel::Cardboard),
            1 => Some(ClassLabel::Background),
            2 => Some(ClassLabel::Photograph),
            _ => None,
        }
    }
}

/// A per-pixel class label raster over the resized scan.
///
/// Rows are the first array axis, columns the second, matching the row-major
/// layout the classifier emits.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMap {
    labels: Array2<u8>,
}

impl ClassMap {
    /// Wraps a raw label array into a ClassMap.
    ///
    /// # Arguments
    ///
    /// * `labels` - Per-pixel labels with shape (height, width).
    ///
    /// # Returns
    ///
    /// The class map, or an error if the array is empty or contains a value
    /// outside the label set.
    pub fn new(labels: Array2<u8>) -> ExtractResult<Self> {
        let (height, width) = labels.dim();
        if height == 0 || width == 0 {
            return Err(ExtractionError::invalid_input("class map has zero size"));
        }
        if let Some(bad) = labels.iter().find(|&&v| ClassLabel::from_u8(v).is_none()) {
            return Err(ExtractionError::invalid_input(format!(
                "class map contains unknown label {bad}"
            )));
        }
        Ok(Self { labels })
    }

    /// Builds a class map by evaluating a label function at every pixel.
    ///
    /// # Arguments
    ///
    /// * `width` - Map width in pixels.
    /// * `height` - Map height in pixels.
    /// * `label_fn` - Function from (x, y) to the label at that pixel.
    pub fn from_fn(width: u32, height: u32, label_fn: impl Fn(u32, u32) -> ClassLabel) -> Self {
        let labels = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
            label_fn(x as u32, y as u32) as u8
        });
        Self { labels }
    }

    /// Map width in pixels.
    pub fn width(&self) -> u32 {
        self.labels.dim().1 as u32
    }

    /// Map height in pixels.
    pub fn height(&self) -> u32 {
        self.labels.dim().0 as u32
    }

    /// Total number of pixels in the map.
    pub fn pixel_count(&self) -> usize {
        self.labels.len()
    }

    /// Label at the given pixel.
    pub fn label_at(&self, x: u32, y: u32) -> ClassLabel {
        // Construction guarantees every stored value is a valid label.
        ClassLabel::from_u8(self.labels[[y as usize, x as usize]])
            .unwrap_or(ClassLabel::Background)
    }

    /// Scale factor relating this map to the full-resolution scan.
    ///
    /// Computed once per scan and reused for every coordinate conversion
    /// between class-map space and full-image space.
    ///
    /// # Arguments
    ///
    /// * `original_height` - Height of the full-resolution scan in pixels.
    pub fn scale_relative_to(&self, original_height: u32) -> f32 {
        self.height() as f32 / original_height as f32
    }

    /// Builds a binary mask selecting pixels with the given label.
    ///
    /// # Arguments
    ///
    /// * `label` - The label to select.
    ///
    /// # Returns
    ///
    /// A grayscale mask with selected pixels at 255 and all others at 0.
    pub fn mask_for(&self, label: ClassLabel) -> GrayImage {
        self.mask_where(|l| l == label)
    }

    /// Builds a binary mask selecting pixels whose label matches a predicate.
    ///
    /// # Arguments
    ///
    /// * `predicate` - Selection predicate over labels.
    ///
    /// # Returns
    ///
    /// A grayscale mask with selected pixels at 255 and all others at 0.
    pub fn mask_where(&self, predicate: impl Fn(ClassLabel) -> bool) -> GrayImage {
        let mut mask = GrayImage::new(self.width(), self.height());
        for (y, row) in self.labels.outer_iter().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                if ClassLabel::from_u8(value).is_some_and(&predicate) {
                    mask.put_pixel(x as u32, y as u32, Luma([255]));
                }
            }
        }
        mask
    }

    /// Read-only view of the underlying label array.
    pub fn as_array(&self) -> &Array2<u8> {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_labels() {
        let labels = Array2::from_shape_fn((4, 4), |(y, _)| if y == 2 { 7u8 } else { 0u8 });
        assert!(ClassMap::new(labels).is_err());
    }

    #[test]
    fn test_rejects_empty_map() {
        let labels = Array2::<u8>::zeros((0, 4));
        assert!(ClassMap::new(labels).is_err());
    }

    #[test]
    fn test_mask_for_selects_only_matching_pixels() {
        let map = ClassMap::from_fn(4, 3, |x, _| {
            if x < 2 {
                ClassLabel::Cardboard
            } else {
                ClassLabel::Background
            }
        });

        let mask = map.mask_for(ClassLabel::Cardboard);
        assert_eq!(mask.dimensions(), (4, 3));
        assert_eq!(mask.get_pixel(0, 0)[0], 255);
        assert_eq!(mask.get_pixel(1, 2)[0], 255);
        assert_eq!(mask.get_pixel(2, 0)[0], 0);
        assert_eq!(mask.get_pixel(3, 2)[0], 0);
    }

    #[test]
    fn test_scale_relative_to_original() {
        let map = ClassMap::from_fn(10, 8, |_, _| ClassLabel::Background);
        assert_eq!(map.scale_relative_to(16), 0.5);
        assert_eq!(map.scale_relative_to(8), 1.0);
    }
}
