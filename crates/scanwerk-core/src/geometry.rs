// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image-plane geometry: points, canonically ordered quadrilaterals, and
// the scale-invariant corner math used by the boundary detector and the
// rectifier.

use serde::{Deserialize, Serialize};

/// A point in image-plane coordinates (pixel units, origin top-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Four corners of a document boundary, always stored in canonical order:
/// top-left, top-right, bottom-right, bottom-left.
///
/// The ordering is determined geometrically on every construction, never
/// taken from the input order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral([Point2D; 4]);

impl Quadrilateral {
    /// Build a quadrilateral from four points in any order.
    pub fn from_points(pts: [Point2D; 4]) -> Self {
        Self(order_points(pts))
    }

    pub fn top_left(&self) -> Point2D {
        self.0[0]
    }

    pub fn top_right(&self) -> Point2D {
        self.0[1]
    }

    pub fn bottom_right(&self) -> Point2D {
        self.0[2]
    }

    pub fn bottom_left(&self) -> Point2D {
        self.0[3]
    }

    /// Corners in canonical order [TL, TR, BR, BL].
    pub fn corners(&self) -> [Point2D; 4] {
        self.0
    }

    /// Corners as `(x, y)` tuples, the form `imageproc` projections take.
    pub fn to_tuples(&self) -> [(f32, f32); 4] {
        [
            (self.0[0].x, self.0[0].y),
            (self.0[1].x, self.0[1].y),
            (self.0[2].x, self.0[2].y),
            (self.0[3].x, self.0[3].y),
        ]
    }

    /// Area via the shoelace formula.
    pub fn area(&self) -> f32 {
        shoelace_area(&self.0)
    }

    /// Length of the top edge (TL → TR).
    pub fn top_edge(&self) -> f32 {
        self.0[0].distance_to(&self.0[1])
    }

    /// Length of the bottom edge (BL → BR).
    pub fn bottom_edge(&self) -> f32 {
        self.0[3].distance_to(&self.0[2])
    }

    /// Length of the left edge (TL → BL).
    pub fn left_edge(&self) -> f32 {
        self.0[0].distance_to(&self.0[3])
    }

    /// Length of the right edge (TR → BR).
    pub fn right_edge(&self) -> f32 {
        self.0[1].distance_to(&self.0[2])
    }

    /// Scale all corners by a uniform factor (used to map detector output
    /// from processing resolution back to original image coordinates).
    pub fn scaled(&self, factor: f32) -> Self {
        let scale = |p: Point2D| Point2D::new(p.x * factor, p.y * factor);
        Self::from_points([
            scale(self.0[0]),
            scale(self.0[1]),
            scale(self.0[2]),
            scale(self.0[3]),
        ])
    }

    /// Ratio of the shorter to the longer of two opposing edges, in [0, 1].
    /// Returns 0 when both edges are degenerate.
    pub fn edge_ratio(a: f32, b: f32) -> f32 {
        let longer = a.max(b);
        if longer <= 0.0 {
            return 0.0;
        }
        a.min(b) / longer
    }
}

/// Order four points canonically: top-left, top-right, bottom-right,
/// bottom-left.
///
/// The top-left corner has the smallest coordinate sum and the bottom-right
/// the largest; the top-right has the smallest y−x difference and the
/// bottom-left the largest. Correct for convex quadrilaterals; ties
/// (degenerate input) resolve deterministically by scan order and never
/// panic.
pub fn order_points(pts: [Point2D; 4]) -> [Point2D; 4] {
    let sum = |p: &Point2D| p.x + p.y;
    let diff = |p: &Point2D| p.y - p.x;

    let top_left = pts
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| sum(a).total_cmp(&sum(b)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let bottom_right = pts
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| sum(a).total_cmp(&sum(b)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let top_right = pts
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| diff(a).total_cmp(&diff(b)))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let bottom_left = pts
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| diff(a).total_cmp(&diff(b)))
        .map(|(i, _)| i)
        .unwrap_or(0);

    [
        pts[top_left],
        pts[top_right],
        pts[bottom_right],
        pts[bottom_left],
    ]
}

/// Area of a polygon given by its vertices in order (CW or CCW), via the
/// shoelace formula.
pub fn shoelace_area(corners: &[Point2D]) -> f32 {
    let n = corners.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0f32;
    for i in 0..n {
        let j = (i + 1) % n;
        area += corners[i].x * corners[j].y;
        area -= corners[j].x * corners[i].y;
    }
    area.abs() / 2.0
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> [Point2D; 4] {
        [
            Point2D::new(0.0, 0.0),
            Point2D::new(100.0, 0.0),
            Point2D::new(100.0, 100.0),
            Point2D::new(0.0, 100.0),
        ]
    }

    #[test]
    fn order_points_is_idempotent() {
        let canonical = order_points(square());
        assert_eq!(order_points(canonical), canonical);
    }

    #[test]
    fn order_points_invariant_under_permutation() {
        let [tl, tr, br, bl] = square();
        let permutations = [
            [tl, tr, br, bl],
            [br, tl, bl, tr],
            [bl, br, tr, tl],
            [tr, bl, tl, br],
        ];
        let expected = order_points(square());
        for perm in permutations {
            assert_eq!(order_points(perm), expected, "permutation {perm:?}");
        }
    }

    #[test]
    fn order_points_skewed_quad() {
        // A tilted quadrilateral with clearly separated corners.
        let tl = Point2D::new(20.0, 10.0);
        let tr = Point2D::new(180.0, 30.0);
        let br = Point2D::new(190.0, 170.0);
        let bl = Point2D::new(10.0, 150.0);
        let ordered = order_points([br, tl, tr, bl]);
        assert_eq!(ordered, [tl, tr, br, bl]);
    }

    #[test]
    fn order_points_degenerate_does_not_panic() {
        let p = Point2D::new(50.0, 50.0);
        let ordered = order_points([p, p, p, p]);
        assert_eq!(ordered[0], p);
    }

    #[test]
    fn quadrilateral_reorders_on_construction() {
        let [tl, tr, br, bl] = square();
        let quad = Quadrilateral::from_points([br, bl, tl, tr]);
        assert_eq!(quad.top_left(), tl);
        assert_eq!(quad.bottom_right(), br);
    }

    #[test]
    fn shoelace_area_rectangle() {
        let quad = Quadrilateral::from_points(square());
        assert!((quad.area() - 10_000.0).abs() < 1e-3);
    }

    #[test]
    fn edge_lengths() {
        let quad = Quadrilateral::from_points(square());
        assert!((quad.top_edge() - 100.0).abs() < 1e-3);
        assert!((quad.left_edge() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn edge_ratio_handles_degenerate_edges() {
        assert_eq!(Quadrilateral::edge_ratio(0.0, 0.0), 0.0);
        assert!((Quadrilateral::edge_ratio(50.0, 100.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn scaled_maps_back_to_original_resolution() {
        let quad = Quadrilateral::from_points(square()).scaled(2.5);
        assert!((quad.bottom_right().x - 250.0).abs() < 1e-3);
        assert!((quad.area() - 62_500.0).abs() < 1e-1);
    }
}
