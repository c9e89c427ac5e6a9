//! Scan lifecycle and end-to-end extraction.
//!
//! [`RawScan`] holds a scan before extraction; [`ScanExtraction`] holds the
//! results after. The pipeline is an explicit sequence: classify, fit
//! rectangles, optionally correct distortion, crop both rectangles, normalize
//! orientation. Each stage takes immutable inputs and returns new values, and
//! a [`ScanExtraction`] cannot exist before every stage has completed, so
//! result accessors never observe a half-finished pipeline.

use std::ops::RangeInclusive;
use std::path::Path;

use image::{RgbImage, imageops};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::{ConfigValidator, ExtractResult, ExtractionError};
use crate::domain::ClassMap;
use crate::pipeline::classifier::MountClassifier;
use crate::processors::crop::extract_oriented_rect;
use crate::processors::distortion::{self, DistortionModel};
use crate::processors::mask::{MaskCleanup, MorphologicalCleanup};
use crate::processors::rect_extract::{MountRects, RectExtractor, RectExtractorConfig};
use crate::utils::image as image_utils;
use crate::utils::visualization;

/// Which physical side of the mount a scan shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanSide {
    /// The front of the mount, carrying the photograph.
    Recto,
    /// The back of the mount.
    Verso,
}

impl std::fmt::Display for ScanSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanSide::Recto => write!(f, "recto"),
            ScanSide::Verso => write!(f, "verso"),
        }
    }
}

/// Identity of a scan: the side it shows and the artifact naming convention
/// that follows from it. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanContext {
    /// The mount side this scan shows.
    pub side: ScanSide,
}

impl ScanContext {
    /// Creates a context for the given side.
    pub fn new(side: ScanSide) -> Self {
        Self { side }
    }

    /// Default filename for the cropped cardboard of this side.
    pub fn cardboard_filename(&self) -> &'static str {
        match self.side {
            ScanSide::Recto => "cardboard_recto.jpg",
            ScanSide::Verso => "cardboard_verso.jpg",
        }
    }

    /// Default filename for the prediction visualization.
    pub fn prediction_filename(&self) -> &'static str {
        "prediction_cardboard.png"
    }

    /// Default filename for the annotated extraction thumbnail.
    pub fn thumbnail_filename(&self) -> &'static str {
        "extraction_thumbnail.jpg"
    }
}

/// Optional sanity check on the cardboard crop's dimensions.
///
/// Out-of-range dimensions are logged as warnings, never treated as errors;
/// archival mounts vary and the extraction may still be correct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardboardBoundsCheck {
    /// Expected crop height range in pixels.
    pub height: RangeInclusive<u32>,
    /// Expected crop width range in pixels.
    pub width: RangeInclusive<u32>,
    /// Expected height-to-width ratio range.
    pub ratio: RangeInclusive<f32>,
}

impl CardboardBoundsCheck {
    fn check(&self, crop: &RgbImage) {
        let (width, height) = crop.dimensions();
        if !self.height.contains(&height) {
            warn!(height, "unusual cardboard height");
        }
        if !self.width.contains(&width) {
            warn!(width, "unusual cardboard width");
        }
        let ratio = height as f32 / width as f32;
        if !self.ratio.contains(&ratio) {
            warn!(ratio, "unusual cardboard ratio");
        }
    }
}

/// Options for a single extraction run.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Fitted distortion model. When present, both the class map and the
    /// full scan are warped before cropping.
    pub distortion: Option<DistortionModel>,
    /// Rectangle extraction configuration.
    pub rect_config: RectExtractorConfig,
    /// Optional warn-only bounds check on the cardboard crop.
    pub bounds_check: Option<CardboardBoundsCheck>,
}

/// A raw scan ready for extraction.
///
/// Holds the full-resolution scan and the resized copy prepared for the
/// classifier. Both are created at construction and never mutated;
/// extraction consumes the scan and returns a [`ScanExtraction`].
#[derive(Debug)]
pub struct RawScan {
    context: ScanContext,
    original: RgbImage,
    resized: RgbImage,
}

impl RawScan {
    /// Creates a scan from in-memory rasters.
    ///
    /// # Arguments
    ///
    /// * `context` - Side and naming convention of the scan.
    /// * `original` - The full-resolution scan.
    /// * `resized` - The resized copy fed to the classifier.
    ///
    /// # Returns
    ///
    /// The scan, or [`ExtractionError::InvalidInput`] when either raster is
    /// empty.
    pub fn new(context: ScanContext, original: RgbImage, resized: RgbImage) -> ExtractResult<Self> {
        if original.width() == 0 || original.height() == 0 {
            return Err(ExtractionError::invalid_input("original scan is empty"));
        }
        if resized.width() == 0 || resized.height() == 0 {
            return Err(ExtractionError::invalid_input("resized scan is empty"));
        }
        Ok(Self {
            context,
            original,
            resized,
        })
    }

    /// Creates a scan by loading the full-resolution image from a file.
    ///
    /// # Arguments
    ///
    /// * `context` - Side and naming convention of the scan.
    /// * `path` - Path of the full-resolution scan image.
    /// * `resized` - The resized copy fed to the classifier.
    pub fn from_path(context: ScanContext, path: &Path, resized: RgbImage) -> ExtractResult<Self> {
        let original = image_utils::load_image(path)?;
        Self::new(context, original, resized)
    }

    /// The scan's context.
    pub fn context(&self) -> ScanContext {
        self.context
    }

    /// The full-resolution scan.
    pub fn original(&self) -> &RgbImage {
        &self.original
    }

    /// The resized copy prepared for the classifier.
    pub fn resized(&self) -> &RgbImage {
        &self.resized
    }

    /// Runs the full extraction pipeline with the default mask cleanup.
    ///
    /// # Arguments
    ///
    /// * `classifier` - The segmentation boundary.
    /// * `options` - Extraction options.
    ///
    /// # Returns
    ///
    /// The completed extraction, or the error of the first stage that failed.
    pub fn extract<C: MountClassifier>(
        self,
        classifier: &C,
        options: ExtractOptions,
    ) -> ExtractResult<ScanExtraction> {
        self.extract_with_cleanup(classifier, &MorphologicalCleanup::default(), options)
    }

    /// Runs the full extraction pipeline with a caller-supplied mask cleanup
    /// primitive.
    pub fn extract_with_cleanup<C: MountClassifier, M: MaskCleanup>(
        self,
        classifier: &C,
        cleaner: &M,
        options: ExtractOptions,
    ) -> ExtractResult<ScanExtraction> {
        options.rect_config.validate()?;

        let prediction = classifier.predict(&self.resized)?;
        if (prediction.width(), prediction.height()) != self.resized.dimensions() {
            return Err(ExtractionError::precondition(format!(
                "class map shape {}x{} does not match resized scan {}x{}",
                prediction.width(),
                prediction.height(),
                self.resized.width(),
                self.resized.height()
            )));
        }

        let prediction_scale = prediction.scale_relative_to(self.original.height());
        debug!(side = %self.context.side, prediction_scale, "extracting scan");

        let extractor = RectExtractor::with_cleanup(options.rect_config.clone(), cleaner);
        let rects = extractor.extract(&prediction)?;

        let (prediction, working) = match &options.distortion {
            Some(model) => {
                info!("applying distortion correction");
                distortion::warp(&prediction, &self.original, model)?
            }
            None => (prediction, self.original),
        };

        let scale = 1.0 / prediction_scale;
        let cardboard = extract_oriented_rect(&working, &rects.cardboard, scale)?;
        let photograph = extract_oriented_rect(&working, &rects.photograph, scale)?;
        drop(working);

        // Store the cardboard tall. The photograph turns with it so the two
        // crops stay spatially consistent.
        let (cardboard, photograph) = if cardboard.height() < cardboard.width() {
            info!("rotating crops to portrait orientation");
            (
                imageops::rotate270(&cardboard),
                imageops::rotate270(&photograph),
            )
        } else {
            (cardboard, photograph)
        };

        if let Some(bounds) = &options.bounds_check {
            bounds.check(&cardboard);
        }

        Ok(ScanExtraction {
            context: self.context,
            resized: self.resized,
            prediction,
            rects,
            cardboard,
            photograph,
        })
    }
}

/// A cropped cardboard mount, tagged with the side it shows.
#[derive(Debug, Clone, Copy)]
pub struct Cardboard<'a> {
    /// The mount side this crop shows.
    pub side: ScanSide,
    /// The rectified crop.
    pub image: &'a RgbImage,
}

/// A cropped photograph.
#[derive(Debug, Clone, Copy)]
pub struct ExtractedPhoto<'a> {
    /// The rectified crop.
    pub image: &'a RgbImage,
}

/// The completed extraction of one scan.
///
/// Values of this type only exist after [`RawScan::extract`] succeeded;
/// there is no way to request a crop from a pipeline that has not run.
/// A new extraction means a new [`RawScan`].
#[derive(Debug)]
pub struct ScanExtraction {
    context: ScanContext,
    resized: RgbImage,
    prediction: ClassMap,
    rects: MountRects,
    cardboard: RgbImage,
    photograph: RgbImage,
}

impl ScanExtraction {
    /// The scan's context.
    pub fn context(&self) -> ScanContext {
        self.context
    }

    /// The class map the rectangles were fitted on, warped when distortion
    /// correction ran.
    pub fn class_map(&self) -> &ClassMap {
        &self.prediction
    }

    /// The fitted rectangles, in class-map coordinates.
    pub fn rects(&self) -> &MountRects {
        &self.rects
    }

    /// The cardboard crop, tagged with its side.
    pub fn cardboard(&self) -> Cardboard<'_> {
        Cardboard {
            side: self.context.side,
            image: &self.cardboard,
        }
    }

    /// The photograph crop.
    pub fn photograph(&self) -> ExtractedPhoto<'_> {
        ExtractedPhoto {
            image: &self.photograph,
        }
    }

    /// Consumes the extraction and returns the two crops, cardboard first.
    pub fn into_crops(self) -> (RgbImage, RgbImage) {
        (self.cardboard, self.photograph)
    }

    /// Writes the color-mapped prediction visualization.
    ///
    /// # Arguments
    ///
    /// * `path` - Destination image path.
    pub fn save_prediction(&self, path: &Path) -> ExtractResult<()> {
        let rendered = visualization::render_class_map(&self.prediction);
        image_utils::save_image(path, &rendered)
    }

    /// Writes the annotated extraction thumbnail: the resized scan with both
    /// fitted rectangles drawn as closed polylines.
    ///
    /// # Arguments
    ///
    /// * `path` - Destination image path.
    pub fn save_extraction_thumbnail(&self, path: &Path) -> ExtractResult<()> {
        let annotated = visualization::annotate_extraction(&self.resized, &self.rects);
        image_utils::save_image(path, &annotated)
    }

    /// Writes both diagnostic artifacts into a directory using the context's
    /// default filenames.
    ///
    /// # Arguments
    ///
    /// * `dir` - Destination directory, created if missing.
    pub fn write_diagnostics(&self, dir: &Path) -> ExtractResult<()> {
        std::fs::create_dir_all(dir)?;
        self.save_prediction(&dir.join(self.context.prediction_filename()))?;
        self.save_extraction_thumbnail(&dir.join(self.context.thumbnail_filename()))?;
        info!(dir = %dir.display(), "wrote extraction diagnostics");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClassLabel::{Background, Cardboard as CardboardLabel, Photograph};
    use image::Rgb;

    struct FixedClassifier {
        map: ClassMap,
    }

    impl MountClassifier for FixedClassifier {
        fn predict(&self, _image: &RgbImage) -> ExtractResult<ClassMap> {
            Ok(self.map.clone())
        }
    }

    /// 1000x800 scan: cardboard 900x700 centered, photograph 400x300 at
    /// offset (250, 250), prediction at full resolution.
    fn mounted_scan() -> (RawScan, FixedClassifier) {
        let mut original = RgbImage::from_pixel(1000, 800, Rgb([240, 240, 240]));
        original.put_pixel(250, 250, Rgb([200, 0, 0]));
        let resized = original.clone();

        let map = ClassMap::from_fn(1000, 800, |x, y| {
            if x >= 250 && x < 650 && y >= 250 && y < 550 {
                Photograph
            } else if x >= 50 && x < 950 && y >= 50 && y < 750 {
                CardboardLabel
            } else {
                Background
            }
        });

        let scan = RawScan::new(
            ScanContext::new(ScanSide::Recto),
            original,
            resized,
        )
        .unwrap();
        (scan, FixedClassifier { map })
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = RawScan::new(
            ScanContext::new(ScanSide::Recto),
            RgbImage::new(0, 10),
            RgbImage::new(10, 10),
        )
        .unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidInput { .. }));
    }

    #[test]
    fn test_mismatched_class_map_shape_is_precondition() {
        let (scan, _) = mounted_scan();
        let classifier = FixedClassifier {
            map: ClassMap::from_fn(100, 100, |_, _| CardboardLabel),
        };

        let err = scan
            .extract(&classifier, ExtractOptions::default())
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Precondition { .. }));
    }

    #[test]
    fn test_end_to_end_extraction_portrait_crops() {
        let (scan, classifier) = mounted_scan();
        let extraction = scan.extract(&classifier, ExtractOptions::default()).unwrap();

        // The cardboard comes out landscape and is rotated to portrait; the
        // photograph turns with it.
        let cardboard = extraction.cardboard();
        let photograph = extraction.photograph();
        assert_eq!(cardboard.side, ScanSide::Recto);

        let (cw, ch) = cardboard.image.dimensions();
        assert!((cw as i64 - 700).abs() <= 1, "cardboard width {cw}");
        assert!((ch as i64 - 900).abs() <= 1, "cardboard height {ch}");

        let (pw, ph) = photograph.image.dimensions();
        assert!((pw as i64 - 300).abs() <= 1, "photograph width {pw}");
        assert!((ph as i64 - 400).abs() <= 1, "photograph height {ph}");
    }

    #[test]
    fn test_rotation_applied_consistently_to_both_crops() {
        let (scan, classifier) = mounted_scan();
        let extraction = scan.extract(&classifier, ExtractOptions::default()).unwrap();

        // The marker sits at the photograph's top-left corner before
        // rotation; a quarter turn counter-clockwise moves it to the
        // bottom-left.
        let photo = extraction.photograph().image;
        let (_, ph) = photo.dimensions();
        assert_eq!(*photo.get_pixel(0, ph - 1), Rgb([200, 0, 0]));

        // The same marker seen through the cardboard crop. The crop starts
        // at (50, 50) in scan coordinates, so the marker is at (200, 200)
        // before rotation and at (200, old_width - 1 - 200) after.
        let cardboard = extraction.cardboard().image;
        let (_, ch) = cardboard.dimensions();
        assert_eq!(*cardboard.get_pixel(200, ch - 1 - 200), Rgb([200, 0, 0]));
    }

    #[test]
    fn test_identity_distortion_changes_nothing() {
        let (scan, classifier) = mounted_scan();
        let baseline = {
            let (scan, classifier) = mounted_scan();
            scan.extract(&classifier, ExtractOptions::default()).unwrap()
        };

        let options = ExtractOptions {
            distortion: Some(DistortionModel::new([[0.0; 4]; 4], (500.0, 400.0))),
            ..Default::default()
        };
        let warped = scan.extract(&classifier, options).unwrap();

        assert_eq!(
            warped.cardboard().image.dimensions(),
            baseline.cardboard().image.dimensions()
        );
        assert_eq!(
            warped.photograph().image.as_raw(),
            baseline.photograph().image.as_raw()
        );
    }

    #[test]
    fn test_context_filenames_by_side() {
        let recto = ScanContext::new(ScanSide::Recto);
        let verso = ScanContext::new(ScanSide::Verso);

        assert_eq!(recto.cardboard_filename(), "cardboard_recto.jpg");
        assert_eq!(verso.cardboard_filename(), "cardboard_verso.jpg");
        assert_eq!(recto.prediction_filename(), verso.prediction_filename());
    }

    #[test]
    fn test_write_diagnostics_creates_artifacts() {
        let (scan, classifier) = mounted_scan();
        let extraction = scan.extract(&classifier, ExtractOptions::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        extraction.write_diagnostics(dir.path()).unwrap();

        assert!(dir.path().join("prediction_cardboard.png").exists());
        assert!(dir.path().join("extraction_thumbnail.jpg").exists());
    }

    #[test]
    fn test_bounds_check_warns_without_failing() {
        let (scan, classifier) = mounted_scan();
        let options = ExtractOptions {
            bounds_check: Some(CardboardBoundsCheck {
                height: 10..=20,
                width: 10..=20,
                ratio: 0.9..=1.1,
            }),
            ..Default::default()
        };

        // Dimensions are far outside the configured ranges; extraction must
        // still succeed.
        assert!(scan.extract(&classifier, options).is_ok());
    }
}
