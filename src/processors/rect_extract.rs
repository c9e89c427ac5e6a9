//! Oriented rectangle extraction from per-pixel class maps.
//!
//! This is the first stage of the pipeline: it reduces the classifier's noisy
//! class map to two oriented bounding rectangles, one for the cardboard mount
//! and one for the photograph. Both rectangles come out of the same
//! mask-to-rectangle primitive; what differs between the two regions is how
//! the mask is derived and which merge policy picks the contour points.

use image::GrayImage;
use imageproc::contours::find_contours;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::geometry::{OrientedRect, PointSet};
use super::mask::{self, MaskCleanup, MorphologicalCleanup};
use crate::core::{ConfigError, ConfigValidator, ExtractResult, ExtractionError, MaskRegion};
use crate::domain::{ClassLabel, ClassMap};

/// Configuration for rectangle extraction.
///
/// The default ratios reproduce the values the extraction heuristics were
/// tuned with; their calibration basis is not documented, so override them
/// with care.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RectExtractorConfig {
    /// Minimum cardboard rectangle area, as a fraction of the total class-map
    /// pixel count, below which the cardboard segmentation is considered
    /// unreliable and refitted on the union of cardboard and photograph
    /// pixels (default: 0.20).
    pub fallback_area_ratio: f32,
    /// Minimum ratio of the second-largest photograph contour's area to the
    /// largest's at which the two contours are merged into one rectangle
    /// (default: 0.50).
    pub merge_area_ratio: f32,
    /// Chebyshev radius by which the cardboard rectangle mask is shrunk when
    /// recovering photograph pixels mislabelled as cardboard (default: 10).
    pub erosion_radius: u8,
}

impl Default for RectExtractorConfig {
    fn default() -> Self {
        Self {
            fallback_area_ratio: 0.20,
            merge_area_ratio: 0.50,
            erosion_radius: 10,
        }
    }
}

impl ConfigValidator for RectExtractorConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_ratio("fallback_area_ratio", self.fallback_area_ratio)?;
        self.validate_ratio("merge_area_ratio", self.merge_area_ratio)?;
        if self.erosion_radius == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "erosion_radius must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

/// The two oriented rectangles located on a scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MountRects {
    /// Bounding rectangle of the cardboard mount, in class-map coordinates.
    pub cardboard: OrientedRect,
    /// Bounding rectangle of the photograph, in class-map coordinates.
    pub photograph: OrientedRect,
}

/// How contour points are combined before rectangle fitting.
enum MergePolicy {
    /// Fit one rectangle over the union of all contours' points.
    UnionAll,
    /// Fit over the largest contour, or over the two largest combined when
    /// the second's area exceeds `ratio` times the largest's.
    LargestOrMergePair { ratio: f32 },
}

/// Extracts cardboard and photograph rectangles from a class map.
pub struct RectExtractor<C = MorphologicalCleanup> {
    config: RectExtractorConfig,
    cleaner: C,
}

impl RectExtractor<MorphologicalCleanup> {
    /// Creates an extractor with the default morphological mask cleanup.
    pub fn new(config: RectExtractorConfig) -> Self {
        Self::with_cleanup(config, MorphologicalCleanup::default())
    }
}

impl<C: MaskCleanup> RectExtractor<C> {
    /// Creates an extractor with a caller-supplied mask cleanup primitive.
    pub fn with_cleanup(config: RectExtractorConfig, cleaner: C) -> Self {
        Self { config, cleaner }
    }

    /// Locates the cardboard and photograph rectangles on a class map.
    ///
    /// # Arguments
    ///
    /// * `class_map` - The per-pixel segmentation of the resized scan.
    ///
    /// # Returns
    ///
    /// Both rectangles with unnormalized angles, or
    /// [`ExtractionError::SegmentationEmpty`] naming the region whose mask
    /// produced no contour.
    pub fn extract(&self, class_map: &ClassMap) -> ExtractResult<MountRects> {
        let (cardboard, cardboard_mask) = self.cardboard_rect(class_map)?;
        let photograph = self.photograph_rect(class_map, &cardboard, &cardboard_mask)?;
        Ok(MountRects {
            cardboard,
            photograph,
        })
    }

    /// Fits the cardboard rectangle, falling back to the union of cardboard
    /// and photograph pixels when the primary fit is too small.
    ///
    /// Mounted photographs often blend into the cardboard class at their
    /// edges; when the cardboard-only segmentation is unreliable the union
    /// mask recovers the full mount. Returns the rectangle together with the
    /// cleaned mask it was fitted on, which the photograph stage needs.
    fn cardboard_rect(&self, class_map: &ClassMap) -> ExtractResult<(OrientedRect, GrayImage)> {
        let mask = self.cleaner.clean(&class_map.mask_for(ClassLabel::Cardboard));
        let primary = Self::rect_from_mask(&mask, MaskRegion::Cardboard, MergePolicy::UnionAll);

        let too_small = match &primary {
            Ok(rect) => {
                rect.area() < self.config.fallback_area_ratio * class_map.pixel_count() as f32
            }
            // An empty cardboard mask is the extreme case of an unreliable
            // segmentation; the union mask still gets its chance.
            Err(ExtractionError::SegmentationEmpty { .. }) => true,
            Err(_) => false,
        };

        if !too_small {
            return primary.map(|rect| (rect, mask));
        }

        debug!("cardboard rectangle unreliable, refitting on cardboard and photograph pixels");
        let union_mask = self.cleaner.clean(
            &class_map
                .mask_where(|l| matches!(l, ClassLabel::Cardboard | ClassLabel::Photograph)),
        );
        let rect = Self::rect_from_mask(&union_mask, MaskRegion::Cardboard, MergePolicy::UnionAll)?;
        Ok((rect, union_mask))
    }

    /// Fits the photograph rectangle inside the cardboard rectangle.
    ///
    /// The photograph mask is constrained to the cardboard rectangle, then
    /// augmented with pixels the cardboard mask did not claim inside a
    /// shrunken version of that rectangle. The shrink margin keeps the
    /// recovery away from the mount's own border.
    fn photograph_rect(
        &self,
        class_map: &ClassMap,
        cardboard: &OrientedRect,
        cardboard_mask: &GrayImage,
    ) -> ExtractResult<OrientedRect> {
        let bounds = mask::rect_mask(class_map.width(), class_map.height(), cardboard);
        let inside = mask::intersect(&class_map.mask_for(ClassLabel::Photograph), &bounds);

        let eroded = mask::erode(&bounds, self.config.erosion_radius);
        let recovered = mask::difference(&eroded, cardboard_mask);

        let photo_mask = self.cleaner.clean(&mask::union(&inside, &recovered));
        Self::rect_from_mask(
            &photo_mask,
            MaskRegion::Photograph,
            MergePolicy::LargestOrMergePair {
                ratio: self.config.merge_area_ratio,
            },
        )
    }

    /// The shared mask-to-rectangle primitive.
    ///
    /// Extracts all contours from the mask, combines their points according
    /// to the merge policy, and fits the minimum-area enclosing rectangle.
    fn rect_from_mask(
        mask: &GrayImage,
        region: MaskRegion,
        policy: MergePolicy,
    ) -> ExtractResult<OrientedRect> {
        let contours = find_contours::<u32>(mask);
        if contours.is_empty() {
            return Err(ExtractionError::SegmentationEmpty { region });
        }

        let points = match policy {
            MergePolicy::UnionAll => PointSet::from_contours(&contours),
            MergePolicy::LargestOrMergePair { ratio } => {
                let mut sets: Vec<(PointSet, f32)> = contours
                    .iter()
                    .map(|c| {
                        let set = PointSet::from_contour(c);
                        let area = set.area();
                        (set, area)
                    })
                    .collect();
                sets.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

                if sets.len() >= 2 && sets[1].1 > ratio * sets[0].1 {
                    debug!(region = %region, "merging two largest contours of similar area");
                    let (second, _) = sets.swap_remove(1);
                    let (first, _) = sets.swap_remove(0);
                    first.merged(second)
                } else {
                    let (first, _) = sets.swap_remove(0);
                    first
                }
            }
        };

        Ok(points.min_area_rect())
    }
}
