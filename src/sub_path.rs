//! Recursively splittable representation of the path's contours.
//!
//! A `SubPath` is split in half along one axis of its bounding box; contours
//! are re-stitched across the cut. A child contour that ends up tracing the
//! child's bounding box (possibly several turns around it) carries no
//! geometry of its own; it only biases the winding number of everything
//! inside the box. Such contours are collapsed into the child's
//! `winding_start`.

use crate::math::{point, Box2D, Point};
use crate::tessellated_path::TessellatedPath;

pub(crate) const RECURSION_DEPTH: u32 = 12;
pub(crate) const POINTS_PER_SUBSET: usize = 64;

/// Boxes wider than this times their height (or vice versa) are always split
/// along the long axis.
const SIZE_MAX_RATIO: f32 = 4.0;

pub(crate) const BOX_MAX_X_FLAG: u8 = 1;
pub(crate) const BOX_MAX_Y_FLAG: u8 = 2;

/// Corner traversal order used for boundary and guide-box contours:
/// (min,min), (min,max), (max,max), (max,min). This orientation contributes
/// -1 to the winding number of everything inside the box.
pub(crate) const BOUNDARY_CORNER_ORDER: [u8; 4] = [
    0,
    BOX_MAX_Y_FLAG,
    BOX_MAX_X_FLAG | BOX_MAX_Y_FLAG,
    BOX_MAX_X_FLAG,
];

/// The 4-cycle mm -> mM -> MM -> Mm -> mm.
fn box_next_neighbor(v: u8) -> u8 {
    const VALUES: [u8; 4] = [
        /* 0 is min x, min y */ BOX_MAX_Y_FLAG,
        /* 1 is max x, min y */ 0,
        /* 2 is min x, max y */ BOX_MAX_X_FLAG | BOX_MAX_Y_FLAG,
        /* 3 is max x, max y */ BOX_MAX_X_FLAG,
    ];
    VALUES[v as usize]
}

#[inline]
fn coord(p: Point, axis: usize) -> f32 {
    if axis == 0 {
        p.x
    } else {
        p.y
    }
}

#[inline]
fn set_coord(p: &mut Point, axis: usize, value: f32) {
    if axis == 0 {
        p.x = value;
    } else {
        p.y = value;
    }
}

/// Which boundary of the sub-path box a point sits on, per axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Boundary {
    OnMin,
    OnMax,
    Interior,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct SubContourPoint {
    position: Point,
    start_tessellated_edge: bool,
    boundary: [Boundary; 2],
}

impl SubContourPoint {
    pub fn new(position: Point, start_tessellated_edge: bool) -> SubContourPoint {
        SubContourPoint {
            position,
            start_tessellated_edge,
            boundary: [Boundary::Interior; 2],
        }
    }

    /// A point created on the cut line between `a` and `b`. The tag on the
    /// unsplit axis is inherited only when both endpoints agree on it.
    fn split(
        a: &SubContourPoint,
        b: &SubContourPoint,
        position: Point,
        split_coordinate: usize,
        side: Boundary,
    ) -> SubContourPoint {
        let unsplit = 1 - split_coordinate;
        let mut boundary = [Boundary::Interior; 2];
        if a.boundary[unsplit] == b.boundary[unsplit] {
            boundary[unsplit] = a.boundary[unsplit];
        }
        boundary[split_coordinate] = side;
        SubContourPoint {
            position,
            start_tessellated_edge: true,
            boundary,
        }
    }

    #[inline]
    pub fn position(&self) -> Point {
        self.position
    }

    #[inline]
    pub fn starts_tessellated_edge(&self) -> bool {
        self.start_tessellated_edge
    }

    fn corner_code(&self) -> Option<u8> {
        if self.boundary[0] == Boundary::Interior || self.boundary[1] == Boundary::Interior {
            return None;
        }
        let mut code = 0;
        if self.boundary[0] == Boundary::OnMax {
            code |= BOX_MAX_X_FLAG;
        }
        if self.boundary[1] == Boundary::OnMax {
            code |= BOX_MAX_Y_FLAG;
        }
        Some(code)
    }
}

pub(crate) type SubContour = Vec<SubContourPoint>;

pub(crate) struct SubPath {
    total_points: usize,
    bounds: Box2D,
    contours: Vec<SubContour>,
    winding_start: i32,
}

impl SubPath {
    pub fn new<P: TessellatedPath + ?Sized>(path: &P) -> SubPath {
        let mut contours = Vec::with_capacity(path.num_contours());
        for c in 0..path.num_contours() {
            let mut contour = SubContour::new();
            copy_contour(&mut contour, path, c);
            if !contour.is_empty() {
                contours.push(contour);
            }
        }
        SubPath::from_parts(path.bounding_box(), contours, 0)
    }

    fn from_parts(bounds: Box2D, contours: Vec<SubContour>, winding_start: i32) -> SubPath {
        let total_points = contours.iter().map(|c| c.len()).sum();
        SubPath {
            total_points,
            bounds,
            contours,
            winding_start,
        }
    }

    #[inline]
    pub fn bounds(&self) -> Box2D {
        self.bounds
    }

    #[inline]
    pub fn contours(&self) -> &[SubContour] {
        &self.contours
    }

    #[inline]
    pub fn total_points(&self) -> usize {
        self.total_points
    }

    #[inline]
    pub fn winding_start(&self) -> i32 {
        self.winding_start
    }

    /// Counts, per axis, the vertices falling in each half plus the edges
    /// crossing the midline (once per side), and picks the axis with the
    /// smaller total. Boxes beyond `SIZE_MAX_RATIO` always split their long
    /// axis.
    fn choose_splitting_coordinate(&self, mid: Point) -> usize {
        let size = self.bounds.size();
        if size.width >= SIZE_MAX_RATIO * size.height {
            return 0;
        }
        if size.height >= SIZE_MAX_RATIO * size.width {
            return 1;
        }

        let mut before = [0i32; 2];
        let mut after = [0i32; 2];
        for contour in &self.contours {
            let mut prev = contour.last().unwrap().position;
            for pt in contour {
                let p = pt.position;
                for i in 0..2 {
                    let prev_b = coord(prev, i) < coord(mid, i);
                    let b = coord(p, i) < coord(mid, i);
                    if b || coord(p, i) == coord(mid, i) {
                        before[i] += 1;
                    }
                    if !b || coord(p, i) == coord(mid, i) {
                        after[i] += 1;
                    }
                    if coord(prev, i) != coord(mid, i) && prev_b != b {
                        before[i] += 1;
                        after[i] += 1;
                    }
                }
                prev = p;
            }
        }

        if before[0] + after[0] < before[1] + after[1] {
            0
        } else {
            1
        }
    }

    /// Splits the bounding box at its midpoint along the chosen axis and
    /// re-stitches every contour across the cut.
    pub fn split(&self) -> [SubPath; 2] {
        let mid = self.bounds.center();
        let axis = self.choose_splitting_coordinate(mid);
        let value = coord(mid, axis);

        let mut b0_max = self.bounds.max;
        set_coord(&mut b0_max, axis, value);
        let mut b1_min = self.bounds.min;
        set_coord(&mut b1_min, axis, value);
        let b0 = Box2D::new(self.bounds.min, b0_max);
        let b1 = Box2D::new(b1_min, self.bounds.max);

        let mut c0 = Vec::with_capacity(self.contours.len());
        let mut c1 = Vec::with_capacity(self.contours.len());
        let mut w0 = 0;
        let mut w1 = 0;
        for contour in &self.contours {
            let mut d0 = SubContour::new();
            let mut d1 = SubContour::new();
            split_contour(contour, axis, value, &mut d0, &mut d1, &mut w0, &mut w1);
            if !d0.is_empty() {
                c0.push(d0);
            }
            if !d1.is_empty() {
                c1.push(d1);
            }
        }

        [
            SubPath::from_parts(b0, c0, w0 + self.winding_start),
            SubPath::from_parts(b1, c1, w1 + self.winding_start),
        ]
    }
}

/// The first point of every edge is marked as an edge start; each edge's
/// trailing point is dropped (it repeats the next edge's first point).
fn copy_contour<P: TessellatedPath + ?Sized>(dst: &mut SubContour, path: &P, contour: usize) {
    for e in 0..path.num_edges(contour) {
        let range = path.edge_range(contour, e);
        let pts = &path.positions()[range];
        if pts.is_empty() {
            continue;
        }
        dst.push(SubContourPoint::new(pts[0], true));
        for p in pts.iter().take(pts.len() - 1).skip(1) {
            dst.push(SubContourPoint::new(*p, false));
        }
    }
}

/// Exactly-reproducible interpolation along the splitting coordinate only.
fn compute_split_point(a: Point, b: Point, axis: usize, value: f32) -> Point {
    let n = value - coord(a, axis);
    let d = coord(b, axis) - coord(a, axis);
    let t = n / d;

    let aa = coord(a, 1 - axis);
    let bb = coord(b, 1 - axis);
    let mut result = point(0.0, 0.0);
    set_coord(&mut result, axis, value);
    set_coord(&mut result, 1 - axis, (1.0 - t) * aa + t * bb);
    result
}

/// A vertex exactly on the cut goes to both sides unchanged; straddling edges
/// get a boundary-tagged point on each side.
fn split_contour(
    src: &SubContour,
    axis: usize,
    value: f32,
    c0: &mut SubContour,
    c1: &mut SubContour,
    w0: &mut i32,
    w1: &mut i32,
) {
    let mut prev = match src.last() {
        Some(p) => *p,
        None => return,
    };
    for pt in src {
        let prev_b0 = coord(prev.position, axis) <= value;
        let b0 = coord(pt.position, axis) <= value;
        let prev_b1 = coord(prev.position, axis) >= value;
        let b1 = coord(pt.position, axis) >= value;

        let mut split_pt = point(0.0, 0.0);
        if prev_b0 != b0 || prev_b1 != b1 {
            split_pt = compute_split_point(prev.position, pt.position, axis, value);
        }

        if prev_b0 != b0 {
            c0.push(SubContourPoint::split(
                &prev,
                pt,
                split_pt,
                axis,
                Boundary::OnMax,
            ));
        }
        if b0 {
            c0.push(*pt);
        }

        if prev_b1 != b1 {
            c1.push(SubContourPoint::split(
                &prev,
                pt,
                split_pt,
                axis,
                Boundary::OnMin,
            ));
        }
        if b1 {
            c1.push(*pt);
        }

        prev = *pt;
    }

    *w0 += post_process_sub_contour(c0);
    *w1 += post_process_sub_contour(c1);
}

/// If every point of `c` is a box corner and every step moves to a
/// neighboring corner, the contour traces the box boundary; discard it and
/// return the number of (signed) turns it makes around the box.
fn post_process_sub_contour(c: &mut SubContour) -> i32 {
    let mut prev_code = match c.last().and_then(|p| p.corner_code()) {
        Some(code) => code,
        None => return 0,
    };

    let mut forwards = 0i32;
    let mut backwards = 0i32;
    for pt in c.iter() {
        let code = match pt.corner_code() {
            Some(code) => code,
            None => return 0,
        };
        if code == box_next_neighbor(prev_code) {
            forwards += 1;
        } else if prev_code == box_next_neighbor(code) {
            backwards += 1;
        } else {
            return 0;
        }
        prev_code = code;
    }

    let counter = backwards - forwards;
    if counter % 4 == 0 {
        c.clear();
        counter / 4
    } else {
        0
    }
}
