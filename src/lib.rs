//! # mount-extract
//!
//! Extraction of cardboard mounts and embedded photographs from raw scans of
//! mounted archival photographs.
//!
//! A scan of a mounted photograph shows three things: the cardboard mount, the
//! photograph glued onto it, and the scanner background. Given the scan and a
//! per-pixel class map produced by an external semantic classifier, this crate
//! locates the oriented bounding rectangles of the cardboard and of the
//! photograph, optionally corrects radial lens/scan distortion, and extracts
//! both regions as axis-aligned, portrait-normalized raster crops.
//!
//! ## Components
//!
//! - **Rectangle extraction**: contour analysis over binary class masks with
//!   fallback and merge heuristics ([`processors::rect_extract`])
//! - **Distortion correction**: backward radial polynomial warp of the class
//!   map and the full scan ([`processors::distortion`])
//! - **Rectified cropping**: affine de-rotation and cropping of an oriented
//!   rectangle in one pass ([`processors::crop`])
//! - **Scan orchestration**: end-to-end pipeline, orientation normalization,
//!   typed result accessors, and diagnostic export ([`pipeline::scan`])
//!
//! ## Modules
//!
//! * [`core`] - Error taxonomy and configuration validation
//! * [`domain`] - Class maps and labels produced by the classifier boundary
//! * [`processors`] - Geometry, masking, warping, and cropping primitives
//! * [`pipeline`] - Scan lifecycle and orchestration
//! * [`utils`] - Image loading and diagnostic visualization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mount_extract::prelude::*;
//! use std::path::Path;
//!
//! # struct MyClassifier;
//! # impl MountClassifier for MyClassifier {
//! #     fn predict(&self, _image: &image::RgbImage) -> ExtractResult<ClassMap> {
//! #         unimplemented!()
//! #     }
//! # }
//! # fn main() -> ExtractResult<()> {
//! let classifier = MyClassifier;
//!
//! let original = load_image(Path::new("scan.jpg"))?;
//! let resized = load_image(Path::new("scan_small.jpg"))?;
//!
//! let scan = RawScan::new(ScanContext::new(ScanSide::Recto), original, resized)?;
//! let extraction = scan.extract(&classifier, ExtractOptions::default())?;
//!
//! extraction.write_diagnostics(Path::new("out"))?;
//! let (cardboard, photograph) = extraction.into_crops();
//! # let _ = (cardboard, photograph);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// Bring the essentials into scope with a single use statement:
///
/// ```rust
/// use mount_extract::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{ExtractResult, ExtractionError, MaskRegion};
    pub use crate::domain::{ClassLabel, ClassMap};
    pub use crate::pipeline::{
        ExtractOptions, MountClassifier, RawScan, ScanContext, ScanExtraction, ScanSide,
    };
    pub use crate::processors::{
        DistortionModel, MountRects, OrientedRect, RectExtractorConfig, extract_oriented_rect,
    };
    pub use crate::utils::load_image;
}
