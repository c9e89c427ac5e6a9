//! Radial lens/scan distortion correction via backward coordinate warping.
//!
//! Every destination pixel is mapped backward to a source coordinate through
//! a radial polynomial centered on the distortion center, then sampled with
//! bilinear interpolation. The radius is normalized by the product of the
//! coordinate-range spans of the target grid, which makes the model's
//! strength independent of the raster's resolution: the same fitted
//! [`DistortionModel`] applies to the class map and to the full scan even
//! though the two differ in size. The coordinate mapping is evaluated per
//! target shape and never shared between rasters of different shapes.
//!
//! No smoothing pre-filter is applied before resampling; warp magnitudes are
//! assumed small relative to pixel size, and the class map must keep its
//! label boundaries as sharp as order-1 interpolation allows.

use image::{Rgb, RgbImage};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use super::crop::bilinear_sample;
use crate::core::{ExtractResult, ExtractionError, ExtractionStage};
use crate::domain::{ClassLabel, ClassMap};

/// A fitted radial distortion model.
///
/// The model is fitted elsewhere and consumed here read-only. Rows 0 and 2 of
/// the coefficient matrix hold the degree-1 and degree-2 radius coefficients
/// of the per-axis multiplicative terms (x and y respectively); rows 1 and 3
/// hold the four coefficients of the per-axis additive cross terms: cross
/// coefficient, offset, radius-scaling factor, and radius-squared factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistortionModel {
    /// Polynomial coefficients, by row as described above.
    pub coefficients: [[f64; 4]; 4],
    /// Distortion center as (x, y), in the coordinates of the raster being
    /// warped.
    pub center: (f64, f64),
}

impl DistortionModel {
    /// Creates a model from a coefficient matrix and a distortion center.
    pub fn new(coefficients: [[f64; 4]; 4], center: (f64, f64)) -> Self {
        Self {
            coefficients,
            center,
        }
    }

    /// Loads a model from a JSON file produced by the fitting procedure.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the JSON file.
    ///
    /// # Returns
    ///
    /// The deserialized model, or an error if the file cannot be read or
    /// parsed.
    pub fn from_json_file(path: &Path) -> ExtractResult<Self> {
        let file = std::fs::File::open(path)?;
        serde_json::from_reader(std::io::BufReader::new(file)).map_err(|e| {
            ExtractionError::processing(
                ExtractionStage::Distortion,
                "failed to parse distortion model",
                e,
            )
        })
    }

    /// Maps a destination coordinate backward to its source coordinate.
    ///
    /// # Arguments
    ///
    /// * `x` - Destination x-coordinate.
    /// * `y` - Destination y-coordinate.
    /// * `normalize` - Radius normalization factor of the target grid.
    ///
    /// # Returns
    ///
    /// The source coordinate to sample.
    pub fn source_point(&self, x: f64, y: f64, normalize: f64) -> (f64, f64) {
        let (cx, cy) = self.center;
        let c = &self.coefficients;

        let radius = ((x - cx).powi(2) + (y - cy).powi(2)) / normalize;

        let coef_x = 1.0 + radius * c[0][0] + radius.powi(2) * c[0][1];
        let coef_y = 1.0 + radius * c[2][0] + radius.powi(2) * c[2][1];

        let add_x = (c[1][1] * (radius + 2.0 * x * x) + 2.0 * c[1][0] * x * y)
            * (1.0 + radius * c[1][2])
            + radius.powi(2) * c[1][3];
        let add_y = (c[3][1] * (radius + 2.0 * y * y) + 2.0 * c[3][0] * x * y)
            * (1.0 + radius * c[3][2])
            + radius.powi(2) * c[3][3];

        (x * coef_x + add_x, y * coef_y + add_y)
    }
}

/// Radius normalization factor: the product of the coordinate-range spans of
/// the target grid.
fn normalization_factor(width: u32, height: u32) -> f64 {
    ((width - 1) as f64) * ((height - 1) as f64)
}

/// Warps a class map and the full-resolution scan through the same model.
///
/// The two rasters generally differ in resolution; each gets its own
/// coordinate mapping on its own grid.
///
/// # Arguments
///
/// * `map` - The class map to warp.
/// * `image` - The full-resolution scan to warp.
/// * `model` - The fitted distortion model.
///
/// # Returns
///
/// The warped class map and the warped scan.
pub fn warp(
    map: &ClassMap,
    image: &RgbImage,
    model: &DistortionModel,
) -> ExtractResult<(ClassMap, RgbImage)> {
    Ok((warp_class_map(map, model)?, warp_image(image, model)?))
}

/// Warps a class map through a distortion model.
///
/// Labels are resampled with order-1 interpolation and rounded back to the
/// label set; coordinates outside the source grid resolve to label 0.
///
/// # Arguments
///
/// * `map` - The class map to warp.
/// * `model` - The fitted distortion model.
///
/// # Returns
///
/// The warped class map, with the same shape as the input.
pub fn warp_class_map(map: &ClassMap, model: &DistortionModel) -> ExtractResult<ClassMap> {
    let (width, height) = (map.width(), map.height());
    if width < 2 || height < 2 {
        return Err(ExtractionError::invalid_input(
            "class map too small to warp",
        ));
    }

    debug!(width, height, "warping class map");
    let normalize = normalization_factor(width, height);
    let source = map.as_array();

    let labels = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
        let (sx, sy) = model.source_point(x as f64, y as f64, normalize);
        sample_label(source, sx, sy)
    });

    ClassMap::new(labels)
}

/// Warps a full-resolution image through a distortion model.
///
/// Uses the same backward mapping and interpolation order as the class-map
/// warp, evaluated on this image's own grid; pixels sampled from outside the
/// image are black.
///
/// # Arguments
///
/// * `image` - The image to warp.
/// * `model` - The fitted distortion model.
///
/// # Returns
///
/// The warped image, with the same dimensions as the input.
pub fn warp_image(image: &RgbImage, model: &DistortionModel) -> ExtractResult<RgbImage> {
    let (width, height) = image.dimensions();
    if width < 2 || height < 2 {
        return Err(ExtractionError::invalid_input("image too small to warp"));
    }

    debug!(width, height, "warping full image");
    let normalize = normalization_factor(width, height);

    let mut output = RgbImage::new(width, height);
    let buffer: &mut [u8] = output.as_mut();

    buffer
        .par_chunks_mut((width * 3) as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..width {
                let (sx, sy) = model.source_point(x as f64, y as f64, normalize);
                let pixel =
                    bilinear_sample(image, sx as f32, sy as f32).unwrap_or(Rgb([0, 0, 0]));

                let index = (x * 3) as usize;
                row[index..index + 3].copy_from_slice(&pixel.0);
            }
        });

    Ok(output)
}

/// Samples a label array at fractional coordinates with order-1
/// interpolation, using label 0 outside the grid.
fn sample_label(labels: &Array2<u8>, x: f64, y: f64) -> u8 {
    let (rows, cols) = labels.dim();

    let x1 = x.floor();
    let y1 = y.floor();
    let dx = x - x1;
    let dy = y - y1;

    let at = |xi: f64, yi: f64| -> f64 {
        if xi < 0.0 || yi < 0.0 || xi >= cols as f64 || yi >= rows as f64 {
            0.0
        } else {
            labels[[yi as usize, xi as usize]] as f64
        }
    };

    let value = (1.0 - dx) * (1.0 - dy) * at(x1, y1)
        + dx * (1.0 - dy) * at(x1 + 1.0, y1)
        + (1.0 - dx) * dy * at(x1, y1 + 1.0)
        + dx * dy * at(x1 + 1.0, y1 + 1.0);

    let max_label = ClassLabel::Photograph as u8 as f64;
    value.round().clamp(0.0, max_label) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClassLabel::{Background, Cardboard, Photograph};

    fn zero_model() -> DistortionModel {
        DistortionModel::new([[0.0; 4]; 4], (50.0, 40.0))
    }

    #[test]
    fn test_zero_coefficients_identity_on_class_map() {
        let map = ClassMap::from_fn(60, 40, |x, y| {
            if x > 20 && x < 40 && y > 10 && y < 30 {
                Photograph
            } else if x % 7 == 0 {
                Background
            } else {
                Cardboard
            }
        });

        let warped = warp_class_map(&map, &zero_model()).unwrap();
        assert_eq!(warped, map);
    }

    #[test]
    fn test_zero_coefficients_identity_on_image() {
        let image = RgbImage::from_fn(50, 30, |x, y| {
            Rgb([(x * 5) as u8, (y * 8) as u8, (x + y) as u8])
        });

        let warped = warp_image(&image, &zero_model()).unwrap();
        assert_eq!(warped.as_raw(), image.as_raw());
    }

    #[test]
    fn test_source_point_radial_term() {
        // A single degree-1 radial coefficient on the x axis doubles the
        // x coordinate at radius 1 from the center.
        let mut coefficients = [[0.0; 4]; 4];
        coefficients[0][0] = 1.0;
        let model = DistortionModel::new(coefficients, (0.0, 0.0));

        let (sx, sy) = model.source_point(1.0, 0.0, 1.0);
        assert!((sx - 2.0).abs() < 1e-9);
        assert!((sy - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_warp_rejects_tiny_rasters() {
        let map = ClassMap::from_fn(1, 5, |_, _| Cardboard);
        assert!(warp_class_map(&map, &zero_model()).is_err());

        let image = RgbImage::new(5, 1);
        assert!(warp_image(&image, &zero_model()).is_err());
    }

    #[test]
    fn test_model_serde_round_trip() {
        let mut coefficients = [[0.0; 4]; 4];
        coefficients[0][0] = 1.5e-3;
        coefficients[1][3] = -2.0e-6;
        let model = DistortionModel::new(coefficients, (512.0, 384.0));

        let json = serde_json::to_string(&model).unwrap();
        let back: DistortionModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn test_model_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(
            &path,
            r#"{"coefficients":[[0,0,0,0],[0,0,0,0],[0,0,0,0],[0,0,0,0]],"center":[10.0,20.0]}"#,
        )
        .unwrap();

        let model = DistortionModel::from_json_file(&path).unwrap();
        assert_eq!(model.center, (10.0, 20.0));
        assert!(DistortionModel::from_json_file(&dir.path().join("missing.json")).is_err());
    }
}
