//! Binary mask derivation and cleanup for class-map segmentation.
//!
//! Masks are 8-bit grayscale images with foreground at 255 and background at
//! 0, the representation imageproc's contour and morphology operators work
//! on. Mask denoising sits behind the [`MaskCleanup`] trait so callers can
//! substitute their own primitive; [`MorphologicalCleanup`] is the default.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_polygon_mut;
use imageproc::morphology;

use super::geometry::OrientedRect;

/// Denoising boundary for binary masks.
///
/// Implementations take a mask and return a cleaned mask of the same shape.
pub trait MaskCleanup {
    /// Cleans a binary mask.
    fn clean(&self, mask: &GrayImage) -> GrayImage;
}

impl<T: MaskCleanup + ?Sized> MaskCleanup for &T {
    fn clean(&self, mask: &GrayImage) -> GrayImage {
        (**self).clean(mask)
    }
}

/// Default mask cleanup: morphological opening followed by closing.
///
/// Opening drops isolated speckles, closing fills pinholes inside solid
/// regions. Both use the Chebyshev norm.
#[derive(Debug, Clone, Copy)]
pub struct MorphologicalCleanup {
    /// Structuring element radius in pixels.
    pub radius: u8,
}

impl Default for MorphologicalCleanup {
    fn default() -> Self {
        Self { radius: 2 }
    }
}

impl MaskCleanup for MorphologicalCleanup {
    fn clean(&self, mask: &GrayImage) -> GrayImage {
        let opened = morphology::open(mask, Norm::LInf, self.radius);
        morphology::close(&opened, Norm::LInf, self.radius)
    }
}

/// Rasterizes an oriented rectangle as a filled polygon mask.
///
/// # Arguments
///
/// * `width` - Mask width in pixels.
/// * `height` - Mask height in pixels.
/// * `rect` - The rectangle to rasterize, in the same pixel space.
///
/// # Returns
///
/// A mask with pixels inside the rectangle at 255. Rectangles thinner than a
/// pixel produce an empty mask.
pub fn rect_mask(width: u32, height: u32, rect: &OrientedRect) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    if rect.width < 1.0 || rect.height < 1.0 {
        return mask;
    }

    let corners: Vec<imageproc::point::Point<i32>> = rect
        .corner_points()
        .iter()
        .map(|p| p.to_imageproc_point())
        .collect();

    // The polygon fill rejects a closed point list
    if corners.first() == corners.last() {
        return mask;
    }
    draw_polygon_mut(&mut mask, &corners, Luma([255]));
    mask
}

/// Erodes a mask by a Chebyshev radius.
pub fn erode(mask: &GrayImage, radius: u8) -> GrayImage {
    morphology::erode(mask, Norm::LInf, radius)
}

/// Pixels present in both masks.
pub fn intersect(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        if a.get_pixel(x, y)[0] > 0 && b.get_pixel(x, y)[0] > 0 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Pixels present in either mask.
pub fn union(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        if a.get_pixel(x, y)[0] > 0 || b.get_pixel(x, y)[0] > 0 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Pixels present in `a` but not in `b`.
pub fn difference(a: &GrayImage, b: &GrayImage) -> GrayImage {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        if a.get_pixel(x, y)[0] > 0 && b.get_pixel(x, y)[0] == 0 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::geometry::Point;

    fn filled_block(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            if x >= x0 && x < x1 && y >= y0 && y < y1 {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }

    #[test]
    fn test_cleanup_removes_speckle_keeps_block() {
        let mut mask = filled_block(40, 40, 5, 5, 30, 30);
        mask.put_pixel(37, 37, Luma([255]));

        let cleaned = MorphologicalCleanup::default().clean(&mask);

        assert_eq!(cleaned.get_pixel(37, 37)[0], 0);
        assert_eq!(cleaned.get_pixel(15, 15)[0], 255);
    }

    #[test]
    fn test_rect_mask_covers_interior() {
        let rect = OrientedRect::new(Point::new(10.0, 10.0), 10.0, 6.0, 0.0);
        let mask = rect_mask(20, 20, &rect);

        assert_eq!(mask.get_pixel(10, 10)[0], 255);
        assert_eq!(mask.get_pixel(6, 8)[0], 255);
        assert_eq!(mask.get_pixel(1, 1)[0], 0);
        assert_eq!(mask.get_pixel(10, 16)[0], 0);
    }

    #[test]
    fn test_rect_mask_degenerate_is_empty() {
        let rect = OrientedRect::new(Point::new(5.0, 5.0), 0.0, 8.0, 0.0);
        let mask = rect_mask(10, 10, &rect);
        assert!(mask.as_raw().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_erode_shrinks_border() {
        let mask = filled_block(20, 20, 4, 4, 16, 16);
        let eroded = erode(&mask, 2);

        assert_eq!(eroded.get_pixel(10, 10)[0], 255);
        assert_eq!(eroded.get_pixel(4, 10)[0], 0);
        assert_eq!(eroded.get_pixel(6, 10)[0], 255);
    }

    #[test]
    fn test_set_operations() {
        let a = filled_block(8, 8, 0, 0, 4, 8);
        let b = filled_block(8, 8, 2, 0, 6, 8);

        let both = intersect(&a, &b);
        let either = union(&a, &b);
        let only_a = difference(&a, &b);

        assert_eq!(both.get_pixel(3, 0)[0], 255);
        assert_eq!(both.get_pixel(1, 0)[0], 0);
        assert_eq!(either.get_pixel(5, 0)[0], 255);
        assert_eq!(either.get_pixel(7, 0)[0], 0);
        assert_eq!(only_a.get_pixel(1, 0)[0], 255);
        assert_eq!(only_a.get_pixel(3, 0)[0], 0);
    }
}
