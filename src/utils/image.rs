//! Image loading, conversion, and saving helpers.

use crate::core::{ExtractResult, ExtractionError};
use image::{DynamicImage, RgbImage};
use std::path::Path;

/// Converts a DynamicImage to an RgbImage.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Loads an image from a file path and converts it to RgbImage.
///
/// # Arguments
///
/// * `path` - A reference to the path of the image file to load
///
/// # Returns
///
/// * `Ok(RgbImage)` - The loaded and converted RGB image
/// * `Err(ExtractionError)` - An error if the image could not be loaded
pub fn load_image(path: &Path) -> ExtractResult<RgbImage> {
    let img = image::open(path).map_err(ExtractionError::ImageLoad)?;
    Ok(dynamic_to_rgb(img))
}

/// Saves an RGB image to a file path, with the format inferred from the
/// extension.
///
/// # Arguments
///
/// * `path` - Destination path
/// * `image` - The image to save
pub fn save_image(path: &Path, image: &RgbImage) -> ExtractResult<()> {
    image.save(path).map_err(ExtractionError::from)
}
