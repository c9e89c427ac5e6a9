//! Error types for the extraction pipeline.
//!
//! This module defines the errors that can occur while extracting a cardboard
//! mount and its photograph from a scan, including input validation errors,
//! segmentation failures, and geometric degeneracies. Every failure aborts the
//! current scan's extraction and carries enough context (stage, region) for a
//! batch caller to log it and continue with the next scan.

use thiserror::Error;

/// Stages of the extraction pipeline an error can originate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    /// Running the external classifier and validating its output.
    Classification,
    /// Deriving oriented rectangles from the class map.
    RectExtraction,
    /// Warping the class map or the full image for distortion correction.
    Distortion,
    /// Extracting an oriented rectangle into an axis-aligned raster.
    Cropping,
    /// Writing diagnostic artifacts.
    Diagnostics,
}

impl std::fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionStage::Classification => write!(f, "classification"),
            ExtractionStage::RectExtraction => write!(f, "rectangle extraction"),
            ExtractionStage::Distortion => write!(f, "distortion correction"),
            ExtractionStage::Cropping => write!(f, "cropping"),
            ExtractionStage::Diagnostics => write!(f, "diagnostics"),
        }
    }
}

/// Semantic regions a binary mask can describe.
///
/// Used to report which region's segmentation came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskRegion {
    /// The cardboard mount.
    Cardboard,
    /// The photograph glued onto the mount.
    Photograph,
}

impl std::fmt::Display for MaskRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaskRegion::Cardboard => write!(f, "cardboard"),
            MaskRegion::Photograph => write!(f, "photograph"),
        }
    }
}

/// Errors produced by the extraction pipeline.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// A pipeline stage failed with an underlying cause.
    #[error("{stage} failed: {context}")]
    Processing {
        /// The stage of the pipeline where the error occurred.
        stage: ExtractionStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No contour was found for a region's mask, even after cleanup and
    /// fallback. The scan cannot be extracted.
    #[error("no {region} contour found in segmentation")]
    SegmentationEmpty {
        /// The region whose mask came back empty.
        region: MaskRegion,
    },

    /// An oriented rectangle has zero or near-zero size and cannot be cropped.
    #[error("degenerate rectangle: {width:.1}x{height:.1}")]
    DegenerateRect {
        /// Scaled rectangle width at the time of cropping.
        width: f32,
        /// Scaled rectangle height at the time of cropping.
        height: f32,
    },

    /// A runtime-checkable precondition was violated.
    #[error("precondition violated: {message}")]
    Precondition {
        /// A message describing the violated precondition.
        message: String,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error from array shape operations.
    #[error("array shape")]
    Shape(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// Creates an error for a failed pipeline stage.
    ///
    /// # Arguments
    ///
    /// * `stage` - The stage of the pipeline where the error occurred.
    /// * `context` - Additional context about the error.
    /// * `error` - The underlying error that caused this error.
    ///
    /// # Returns
    ///
    /// An ExtractionError instance.
    pub fn processing(
        stage: ExtractionStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            stage,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for invalid input.
    ///
    /// # Arguments
    ///
    /// * `message` - A message describing the invalid input.
    ///
    /// # Returns
    ///
    /// An ExtractionError instance.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an error for a violated precondition.
    ///
    /// # Arguments
    ///
    /// * `message` - A message describing the violated precondition.
    ///
    /// # Returns
    ///
    /// An ExtractionError instance.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }
}

impl From<image::ImageError> for ExtractionError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for ExtractionError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::InvalidInput {
            message: error.to_string(),
        }
    }
}

/// Convenient result alias for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segmentation_empty_names_region() {
        let err = ExtractionError::SegmentationEmpty {
            region: MaskRegion::Photograph,
        };
        assert_eq!(err.to_string(), "no photograph contour found in segmentation");
    }

    #[test]
    fn test_processing_error_carries_stage() {
        let err = ExtractionError::processing(
            ExtractionStage::Cropping,
            "affine matrix not invertible",
            std::io::Error::other("boom"),
        );
        assert!(err.to_string().starts_with("cropping failed"));
    }
}
