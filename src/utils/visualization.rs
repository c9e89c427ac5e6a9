//! Diagnostic visualization of extraction results.
//!
//! Two artifacts are produced per scan: a color-mapped rendering of the class
//! map, and a thumbnail of the resized scan with both fitted rectangles drawn
//! as closed polylines in distinct colors.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point as ImageProcPoint;

use crate::domain::ClassMap;
use crate::processors::geometry::{OrientedRect, Point};
use crate::processors::rect_extract::MountRects;

/// Rendering colors for class-map labels: cardboard, background, photograph.
const CLASS_COLORS: [Rgb<u8>; 3] = [Rgb([68, 1, 84]), Rgb([33, 145, 140]), Rgb([253, 231, 37])];

const CARDBOARD_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const PHOTOGRAPH_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Width of the rectangle outlines in pixels.
const OUTLINE_THICKNESS: f32 = 4.0;

/// Renders a class map as a color-mapped raster.
///
/// # Arguments
///
/// * `map` - The class map to render.
///
/// # Returns
///
/// An RGB image of the same shape with one color per label.
pub fn render_class_map(map: &ClassMap) -> RgbImage {
    RgbImage::from_fn(map.width(), map.height(), |x, y| {
        CLASS_COLORS[map.label_at(x, y) as usize]
    })
}

/// Draws both fitted rectangles onto a copy of the resized scan.
///
/// # Arguments
///
/// * `resized` - The resized scan the rectangles were fitted on.
/// * `rects` - The fitted rectangles, in the same coordinate space.
///
/// # Returns
///
/// The annotated thumbnail.
pub fn annotate_extraction(resized: &RgbImage, rects: &MountRects) -> RgbImage {
    let mut output = resized.clone();
    draw_oriented_rect(&mut output, &rects.cardboard, CARDBOARD_COLOR);
    draw_oriented_rect(&mut output, &rects.photograph, PHOTOGRAPH_COLOR);
    output
}

/// Draws an oriented rectangle as a closed polyline.
pub fn draw_oriented_rect(image: &mut RgbImage, rect: &OrientedRect, color: Rgb<u8>) {
    let corners = rect.corner_points();
    for i in 0..4 {
        draw_thick_segment(image, corners[i], corners[(i + 1) % 4], OUTLINE_THICKNESS, color);
    }
}

/// Draws a line segment as a filled quadrilateral of the given thickness.
///
/// The quadrilateral is extended by half the thickness along the segment
/// direction so consecutive segments cover their shared corner.
fn draw_thick_segment(image: &mut RgbImage, from: Point, to: Point, thickness: f32, color: Rgb<u8>) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let length = (dx * dx + dy * dy).sqrt();
    if length < f32::EPSILON {
        return;
    }

    let half = thickness / 2.0;
    let (ux, uy) = (dx / length, dy / length);
    let (px, py) = (-uy * half, ux * half);

    let quad: Vec<ImageProcPoint<i32>> = [
        Point::new(from.x - ux * half + px, from.y - uy * half + py),
        Point::new(to.x + ux * half + px, to.y + uy * half + py),
        Point::new(to.x + ux * half - px, to.y + uy * half - py),
        Point::new(from.x - ux * half - px, from.y - uy * half - py),
    ]
    .iter()
    .map(|p| p.to_imageproc_point())
    .collect();

    // The polygon fill rejects a closed point list
    if quad.first() == quad.last() {
        return;
    }
    draw_polygon_mut(image, &quad, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ClassLabel;
    use crate::processors::rect_extract::MountRects;

    #[test]
    fn test_render_class_map_uses_palette() {
        let map = ClassMap::from_fn(3, 1, |x, _| match x {
            0 => ClassLabel::Cardboard,
            1 => ClassLabel::Background,
            _ => ClassLabel::Photograph,
        });

        let rendered = render_class_map(&map);
        assert_eq!(*rendered.get_pixel(0, 0), CLASS_COLORS[0]);
        assert_eq!(*rendered.get_pixel(1, 0), CLASS_COLORS[1]);
        assert_eq!(*rendered.get_pixel(2, 0), CLASS_COLORS[2]);
    }

    #[test]
    fn test_annotate_draws_both_outlines() {
        let resized = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let rects = MountRects {
            cardboard: OrientedRect::new(Point::new(50.0, 50.0), 80.0, 60.0, 0.0),
            photograph: OrientedRect::new(Point::new(50.0, 50.0), 40.0, 30.0, 0.0),
        };

        let annotated = annotate_extraction(&resized, &rects);

        // Top edges of both rectangles
        assert_eq!(*annotated.get_pixel(50, 20), CARDBOARD_COLOR);
        assert_eq!(*annotated.get_pixel(50, 35), PHOTOGRAPH_COLOR);
        // Far from both outlines the thumbnail is untouched
        assert_eq!(*annotated.get_pixel(50, 50), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_degenerate_rect_outline_is_noop() {
        let mut image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let rect = OrientedRect::new(Point::new(5.0, 5.0), 0.0, 0.0, 0.0);
        draw_oriented_rect(&mut image, &rect, CARDBOARD_COLOR);
        assert!(image.as_raw().iter().all(|&v| v == 0));
    }
}
