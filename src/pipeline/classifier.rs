//! The semantic classifier boundary.
//!
//! Segmentation itself is not part of this crate: an external model takes the
//! resized scan and returns a per-pixel class map of the same spatial shape.
//! Anything that can do that, from an ONNX session to a fixture in a test,
//! plugs in through [`MountClassifier`].

use image::RgbImage;

use crate::core::ExtractResult;
use crate::domain::ClassMap;

/// Produces a per-pixel class map for a resized scan.
pub trait MountClassifier {
    /// Predicts the class map of the given image.
    ///
    /// The returned map must have the same spatial shape as `image`; the
    /// orchestrator rejects mismatched shapes with a precondition error.
    fn predict(&self, image: &RgbImage) -> ExtractResult<ClassMap>;
}

impl<T: MountClassifier + ?Sized> MountClassifier for &T {
    fn predict(&self, image: &RgbImage) -> ExtractResult<ClassMap> {
        (**self).predict(image)
    }
}
