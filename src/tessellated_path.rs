//! The input contract: a polyline approximation of a vector path.

use crate::math::{point, Box2D, Point};
use std::ops::Range;

/// A tessellated path: contours made of edges, each edge a run of points in a
/// shared vertex table.
///
/// An edge is the flattening of one path segment. Adjacent edges of a contour
/// repeat their shared point: the last point of an edge is the first point of
/// the next one (wrapping around at the end of the contour). Consumers drop
/// each edge's trailing point when walking a contour.
///
/// Only positions are consumed here; any other per-vertex data the producer
/// stores is ignored.
pub trait TessellatedPath {
    fn num_contours(&self) -> usize;
    fn num_edges(&self, contour: usize) -> usize;
    /// Half-open range of indices into `positions()` for one edge.
    fn edge_range(&self, contour: usize, edge: usize) -> Range<usize>;
    fn positions(&self) -> &[Point];
    fn bounding_box(&self) -> Box2D;
}

/// A simple concrete [`TessellatedPath`], built with [`FlattenedPathBuilder`].
#[derive(Clone, Debug, Default)]
pub struct FlattenedPath {
    points: Vec<Point>,
    contours: Vec<Vec<Range<usize>>>,
    bounds: Box2D,
}

impl FlattenedPath {
    pub fn builder() -> FlattenedPathBuilder {
        FlattenedPathBuilder::new()
    }
}

impl TessellatedPath for FlattenedPath {
    fn num_contours(&self) -> usize {
        self.contours.len()
    }

    fn num_edges(&self, contour: usize) -> usize {
        self.contours[contour].len()
    }

    fn edge_range(&self, contour: usize, edge: usize) -> Range<usize> {
        self.contours[contour][edge].clone()
    }

    fn positions(&self) -> &[Point] {
        &self.points
    }

    fn bounding_box(&self) -> Box2D {
        self.bounds
    }
}

/// Builds a [`FlattenedPath`] one contour at a time.
///
/// Every `line_to` becomes a two-point edge; `edge` submits the flattening of
/// a longer segment in one go. Contours are closed automatically.
#[derive(Clone, Debug, Default)]
pub struct FlattenedPathBuilder {
    points: Vec<Point>,
    contours: Vec<Vec<Range<usize>>>,
    current: Vec<Range<usize>>,
    first: Point,
    prev: Point,
    in_contour: bool,
}

impl FlattenedPathBuilder {
    pub fn new() -> Self {
        FlattenedPathBuilder::default()
    }

    /// Starts a new contour at `at`.
    pub fn begin(&mut self, at: Point) {
        debug_assert!(!self.in_contour);
        self.first = at;
        self.prev = at;
        self.in_contour = true;
    }

    /// Adds a straight edge from the current position to `to`.
    pub fn line_to(&mut self, to: Point) {
        self.edge(&[to]);
    }

    /// Adds one edge whose interior points are `points` (the flattening of a
    /// curve). The edge starts at the current position and ends at the last
    /// point of `points`.
    pub fn edge(&mut self, points: &[Point]) {
        debug_assert!(self.in_contour);
        if points.is_empty() {
            return;
        }
        let start = self.points.len();
        self.points.push(self.prev);
        self.points.extend_from_slice(points);
        self.current.push(start..self.points.len());
        self.prev = *points.last().unwrap();
    }

    /// Closes the current contour, adding the closing edge if needed.
    pub fn close(&mut self) {
        debug_assert!(self.in_contour);
        if self.prev != self.first && !self.current.is_empty() {
            let first = self.first;
            self.edge(&[first]);
        }
        if !self.current.is_empty() {
            self.contours.push(std::mem::take(&mut self.current));
        }
        self.current.clear();
        self.in_contour = false;
    }

    /// Convenience: adds `points` as one closed contour of straight edges.
    pub fn add_polygon(&mut self, points: &[Point]) {
        if points.len() < 3 {
            return;
        }
        self.begin(points[0]);
        for p in &points[1..] {
            self.line_to(*p);
        }
        self.close();
    }

    pub fn build(mut self) -> FlattenedPath {
        if self.in_contour {
            self.close();
        }
        let bounds = bounding_box_of(&self.points);
        FlattenedPath {
            points: self.points,
            contours: self.contours,
            bounds,
        }
    }
}

/// Non-finite positions are excluded; with no finite point the box collapses
/// to a zero box, which downstream treats as degenerate input.
fn bounding_box_of(points: &[Point]) -> Box2D {
    let mut min = point(f32::MAX, f32::MAX);
    let mut max = point(f32::MIN, f32::MIN);
    let mut any = false;
    for p in points {
        if !p.x.is_finite() || !p.y.is_finite() {
            continue;
        }
        any = true;
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    if !any {
        return Box2D::zero();
    }
    Box2D::new(min, max)
}
