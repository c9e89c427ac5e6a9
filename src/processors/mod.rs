//! Computational stages of the extraction pipeline.
//!
//! Each stage is a pure function over in-memory buffers: geometry fitting,
//! mask derivation, distortion warping, and affine cropping. Stages hold no
//! cross-scan state; the pipeline module threads values between them.

pub mod crop;
pub mod distortion;
pub mod geometry;
pub mod mask;
pub mod rect_extract;

pub use crop::extract_oriented_rect;
pub use distortion::{DistortionModel, warp, warp_class_map, warp_image};
pub use geometry::{OrientedRect, Point, PointSet};
pub use mask::{MaskCleanup, MorphologicalCleanup};
pub use rect_extract::{MountRects, RectExtractor, RectExtractorConfig};
