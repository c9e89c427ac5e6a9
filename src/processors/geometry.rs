//! Geometric primitives for mount extraction.
//!
//! This module provides point representations, contour point sets, and the
//! algorithms used to reduce a noisy segmentation to an oriented bounding
//! rectangle: convex hulls and rotating-calipers minimum-area rectangles.
//! It also defines [`OrientedRect`], the rectangle representation consumed by
//! the cropping stage, together with its angle normalization rule.

use imageproc::contours::Contour;
use imageproc::point::Point as ImageProcPoint;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Creates a point from an imageproc contour point.
    pub fn from_contour_point(p: ImageProcPoint<u32>) -> Self {
        Self {
            x: p.x as f32,
            y: p.y as f32,
        }
    }

    /// Converts this point to an imageproc point with integer coordinates.
    pub fn to_imageproc_point(self) -> ImageProcPoint<i32> {
        ImageProcPoint::new(self.x.round() as i32, self.y.round() as i32)
    }
}

/// An unordered collection of contour points.
///
/// A point set is what contour extraction hands to rectangle fitting: the
/// union of one or more contours' points. The set does not need to describe a
/// single connected shape; fitting works on the union.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointSet {
    /// The points in the set.
    pub points: Vec<Point>,
}

impl PointSet {
    /// Creates a point set from a vector of points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Creates a point set from a single contour.
    ///
    /// # Arguments
    ///
    /// * `contour` - A contour produced by imageproc contour extraction.
    pub fn from_contour(contour: &Contour<u32>) -> Self {
        let points = contour
            .points
            .iter()
            .map(|&p| Point::from_contour_point(p))
            .collect();
        Self { points }
    }

    /// Creates a point set from the union of several contours' points.
    ///
    /// # Arguments
    ///
    /// * `contours` - Contours whose points are combined into one set.
    pub fn from_contours(contours: &[Contour<u32>]) -> Self {
        let points = contours
            .iter()
            .flat_map(|c| c.points.iter().map(|&p| Point::from_contour_point(p)))
            .collect();
        Self { points }
    }

    /// Returns true if the set contains no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Merges this set with another, consuming both.
    pub fn merged(mut self, other: PointSet) -> Self {
        self.points.extend(other.points);
        self
    }

    /// Calculates the polygon area of the point sequence using the shoelace
    /// formula.
    ///
    /// For an ordered contour this is the enclosed area. Returns 0.0 for
    /// fewer than 3 points.
    pub fn area(&self) -> f32 {
        if self.points.len() < 3 {
            return 0.0;
        }

        let mut area = 0.0;
        let n = self.points.len();
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area.abs() / 2.0
    }

    /// Computes the convex hull of the point set using Graham's scan.
    fn convex_hull(&self) -> Vec<Point> {
        if self.points.len() < 3 {
            return self.points.clone();
        }

        let mut points = self.points.clone();

        // Find the point with the lowest y-coordinate (and leftmost if tied)
        let mut start_idx = 0;
        for i in 1..points.len() {
            if points[i].y < points[start_idx].y
                || (points[i].y == points[start_idx].y && points[i].x < points[start_idx].x)
            {
                start_idx = i;
            }
        }
        points.swap(0, start_idx);
        let start_point = points[0];

        // Sort the remaining points by polar angle around the start point
        points[1..].sort_by(|a, b| {
            let cross = cross_product(&start_point, a, b);
            if cross == 0.0 {
                let dist_a = (a.x - start_point.x).powi(2) + (a.y - start_point.y).powi(2);
                let dist_b = (b.x - start_point.x).powi(2) + (b.y - start_point.y).powi(2);
                dist_a
                    .partial_cmp(&dist_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
            } else if cross > 0.0 {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Greater
            }
        });

        // Build the hull with a stack, dropping clockwise turns
        let mut hull: Vec<Point> = Vec::new();
        for point in points {
            while hull.len() > 1
                && cross_product(&hull[hull.len() - 2], &hull[hull.len() - 1], &point) <= 0.0
            {
                hull.pop();
            }
            hull.push(point);
        }

        hull
    }

    /// Computes the minimum-area oriented rectangle enclosing the point set.
    ///
    /// Uses rotating calipers over the convex hull: the minimum-area
    /// enclosing rectangle of a point set has one side collinear with a hull
    /// edge, so it suffices to test every hull edge direction.
    ///
    /// # Returns
    ///
    /// The enclosing [`OrientedRect`], with the angle as produced by the
    /// winning hull edge (not yet normalized). Degenerate inputs (fewer than
    /// 3 distinct points, collinear sets) produce an axis-aligned rectangle
    /// over the coordinate extents, which may have zero width or height.
    pub fn min_area_rect(&self) -> OrientedRect {
        let hull = self.convex_hull();

        if hull.len() < 3 {
            return self.axis_aligned_extents();
        }

        let mut min_area = f32::MAX;
        let mut min_rect = OrientedRect::new(Point::new(0.0, 0.0), 0.0, 0.0, 0.0);
        let mut found = false;

        let n = hull.len();
        for i in 0..n {
            let j = (i + 1) % n;

            let edge_x = hull[j].x - hull[i].x;
            let edge_y = hull[j].y - hull[i].y;
            let edge_length = (edge_x * edge_x + edge_y * edge_y).sqrt();

            if edge_length < f32::EPSILON {
                continue;
            }

            // Unit edge direction and its perpendicular
            let nx = edge_x / edge_length;
            let ny = edge_y / edge_length;
            let px = -ny;
            let py = nx;

            // Project all hull points onto both directions
            let mut min_n = f32::MAX;
            let mut max_n = f32::MIN;
            let mut min_p = f32::MAX;
            let mut max_p = f32::MIN;

            for point in &hull {
                let proj_n = nx * (point.x - hull[i].x) + ny * (point.y - hull[i].y);
                min_n = min_n.min(proj_n);
                max_n = max_n.max(proj_n);

                let proj_p = px * (point.x - hull[i].x) + py * (point.y - hull[i].y);
                min_p = min_p.min(proj_p);
                max_p = max_p.max(proj_p);
            }

            let width = max_n - min_n;
            let height = max_p - min_p;
            let area = width * height;

            if area < min_area {
                min_area = area;
                found = true;

                let center_n = (min_n + max_n) / 2.0;
                let center_p = (min_p + max_p) / 2.0;

                let center_x = hull[i].x + center_n * nx + center_p * px;
                let center_y = hull[i].y + center_n * ny + center_p * py;

                let angle = f32::atan2(ny, nx) * 180.0 / PI;

                min_rect = OrientedRect::new(Point::new(center_x, center_y), width, height, angle);
            }
        }

        if found {
            min_rect
        } else {
            self.axis_aligned_extents()
        }
    }

    /// Axis-aligned bounding rectangle over the coordinate extents.
    fn axis_aligned_extents(&self) -> OrientedRect {
        let Some((min_x, max_x)) = self.points.iter().map(|p| p.x).minmax().into_option() else {
            return OrientedRect::new(Point::new(0.0, 0.0), 0.0, 0.0, 0.0);
        };
        let Some((min_y, max_y)) = self.points.iter().map(|p| p.y).minmax().into_option() else {
            return OrientedRect::new(Point::new(0.0, 0.0), 0.0, 0.0, 0.0);
        };

        OrientedRect::new(
            Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0),
            max_x - min_x,
            max_y - min_y,
            0.0,
        )
    }
}

/// Cross product of the vectors p1->p2 and p1->p3.
///
/// Positive for a counter-clockwise turn, negative for clockwise, zero for
/// collinear points.
fn cross_product(p1: &Point, p2: &Point, p3: &Point) -> f32 {
    (p2.x - p1.x) * (p3.y - p1.y) - (p2.y - p1.y) * (p3.x - p1.x)
}

/// An oriented rectangle described by center, size, and rotation angle.
///
/// Coordinates are class-map pixels until the cropping stage scales them into
/// full-image space. The same physical rectangle has several equivalent
/// representations (angle plus a multiple of 90 degrees with width and height
/// swapped); [`OrientedRect::normalized`] picks the canonical one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedRect {
    /// The center point of the rectangle.
    pub center: Point,
    /// The width of the rectangle.
    pub width: f32,
    /// The height of the rectangle.
    pub height: f32,
    /// The rotation angle of the rectangle in degrees.
    pub angle: f32,
}

impl OrientedRect {
    /// Creates a new oriented rectangle.
    pub fn new(center: Point, width: f32, height: f32, angle: f32) -> Self {
        Self {
            center,
            width,
            height,
            angle,
        }
    }

    /// Area of the rectangle.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Returns the representation of this rectangle whose angle lies in
    /// (-45, 45] degrees.
    ///
    /// Each 90-degree step swaps width and height, so the result describes
    /// the same physical rectangle with the rotation closest to axis-aligned,
    /// independent of which edge the rectangle fitting happened to label as
    /// "width". Normalization is idempotent.
    pub fn normalized(&self) -> Self {
        let mut angle = self.angle;
        let mut width = self.width;
        let mut height = self.height;

        while angle > 45.0 {
            angle -= 90.0;
            std::mem::swap(&mut width, &mut height);
        }
        while angle <= -45.0 {
            angle += 90.0;
            std::mem::swap(&mut width, &mut height);
        }

        Self {
            center: self.center,
            width,
            height,
            angle,
        }
    }

    /// The four corner points of the rectangle in polygon order.
    ///
    /// Corners are emitted counter-clockwise starting from the corner at
    /// (-w/2, -h/2) in the rectangle's own frame, so consecutive points form
    /// the rectangle's edges.
    pub fn corner_points(&self) -> [Point; 4] {
        let cos_a = (self.angle * PI / 180.0).cos();
        let sin_a = (self.angle * PI / 180.0).sin();

        let w_2 = self.width / 2.0;
        let h_2 = self.height / 2.0;

        let corners = [(-w_2, -h_2), (w_2, -h_2), (w_2, h_2), (-w_2, h_2)];

        corners.map(|(x, y)| {
            Point::new(
                x * cos_a - y * sin_a + self.center.x,
                x * sin_a + y * cos_a + self.center.y,
            )
        })
    }
}
