//! Scan orchestration: classifier boundary, lifecycle, and results.

pub mod classifier;
pub mod scan;

pub use classifier::MountClassifier;
pub use scan::{
    Cardboard, CardboardBoundsCheck, ExtractOptions, ExtractedPhoto, RawScan, ScanContext,
    ScanExtraction, ScanSide,
};
