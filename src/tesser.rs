//! Drives the sweep tessellator over a sub-path and routes the triangles it
//! produces into per-winding index buckets.
//!
//! Two passes run over every sub-path. The non-zero pass tessellates the
//! regions whose winding is not zero, tagging each with its winding number
//! (biased by the sub-path's `winding_start`). The zero pass adds the
//! sub-path's bounding box as an extra enclosing contour, shifting every
//! winding down by one, and keeps the regions that land on -1: the zero
//! region of the original path.
//!
//! Every accepted triangle is subdivided into six around its centroid before
//! emission, so that each interior point of the triangle has an incident
//! emitted triangle whose vertices all carry the region's winding number.
//! The anti-aliasing boundary test relies on this.

use crate::coordinate::BOX_DIM;
use crate::hoard::{FillPoint, GuideBoxes, HoardPath, PointHoard};
use crate::math::{point, DoublePoint, Point};
use crate::sub_path::{SubPath, BOUNDARY_CORNER_ORDER, BOX_MAX_X_FLAG, BOX_MAX_Y_FLAG};
use crate::sweep::{RegionSink, SweepTessellator};
use crate::winding::WindingHoard;
use crate::{FillOptions, VertexId};
use std::collections::BTreeMap;
use std::ops::Range;

enum Pass {
    /// Regions with winding != 0, bucketed by `winding + winding_start`.
    NonZero { winding_start: i32, current: i32 },
    /// Regions with winding == -1 relative to the boundary contour, all
    /// bucketed under `winding_start`.
    Zero { winding: i32 },
}

pub(crate) struct Tesser<'l, 'p> {
    points: &'l mut PointHoard<'p>,
    hoard: &'l mut WindingHoard,
    pass: Pass,
    temp_verts: [VertexId; 3],
    temp_count: usize,
    failed: bool,
}

impl<'l, 'p> Tesser<'l, 'p> {
    pub fn execute_non_zero(
        points: &'l mut PointHoard<'p>,
        hoard: &'l mut WindingHoard,
        path: &HoardPath,
        boxes: &GuideBoxes,
        sub_path: &SubPath,
    ) -> bool {
        let pass = Pass::NonZero {
            winding_start: sub_path.winding_start(),
            current: 0,
        };
        Tesser::execute(points, hoard, path, boxes, sub_path, pass, false)
    }

    pub fn execute_zero(
        points: &'l mut PointHoard<'p>,
        hoard: &'l mut WindingHoard,
        path: &HoardPath,
        boxes: &GuideBoxes,
        sub_path: &SubPath,
    ) -> bool {
        let winding = sub_path.winding_start();
        hoard.entry(winding).or_default();
        let pass = Pass::Zero { winding };
        Tesser::execute(points, hoard, path, boxes, sub_path, pass, true)
    }

    fn execute(
        points: &'l mut PointHoard<'p>,
        hoard: &'l mut WindingHoard,
        path: &HoardPath,
        boxes: &GuideBoxes,
        sub_path: &SubPath,
        pass: Pass,
        with_boundary: bool,
    ) -> bool {
        let mut tess = SweepTessellator::new();
        let mut tesser = Tesser {
            points,
            hoard,
            pass,
            temp_verts: [VertexId::INVALID; 3],
            temp_count: 0,
            failed: false,
        };

        let mut fudge_count = 0u32;
        tesser.add_path(&mut tess, path, &mut fudge_count);
        tesser.add_guiding_boxes(&mut tess, boxes, &mut fudge_count);
        if with_boundary {
            tesser.add_path_boundary(&mut tess, sub_path, fudge_count);
        }

        if let Err(e) = tess.tessellate(&mut tesser) {
            log::debug!("filled-path sweep error: {e}");
            tesser.failed = true;
        }
        tesser.failed
    }

    /// Submits every contour, incrementing the fudge counter on each vertex
    /// regardless of contour so no two submissions share an offset.
    fn add_path(&mut self, tess: &mut SweepTessellator, path: &HoardPath, fudge_count: &mut u32) {
        for contour in path {
            tess.begin_contour(true);
            for &id in contour {
                let p = self
                    .points
                    .converter()
                    .apply(self.points.position(id), *fudge_count);
                *fudge_count += 1;
                tess.add_vertex(p, id);
            }
            tess.end_contour();
        }
    }

    /// Guide boxes are pushed outward by the accumulated slack so they
    /// strictly enclose the (perturbed) vertices they group. They do not
    /// affect winding numbers.
    fn add_guiding_boxes(
        &mut self,
        tess: &mut SweepTessellator,
        boxes: &GuideBoxes,
        fudge_count: &mut u32,
    ) {
        for b in boxes {
            let slack = f64::from(*fudge_count) * self.points.converter().fudge_delta();
            tess.begin_contour(false);
            for &k in &BOUNDARY_CORNER_ORDER {
                let id = b[k as usize];
                let mut p = self.points.converter().apply(self.points.position(id), 0);
                if k & BOX_MAX_X_FLAG != 0 {
                    p.x += slack;
                } else {
                    p.x -= slack;
                }
                if k & BOX_MAX_Y_FLAG != 0 {
                    p.y += slack;
                } else {
                    p.y -= slack;
                }
                tess.add_vertex(p, id);
            }
            tess.end_contour();
            *fudge_count += 1;
        }
    }

    /// The enclosing contour of the zero pass, at grid coordinates
    /// `[-slack, 2^22 + slack]` so it strictly contains every perturbed
    /// vertex. Its corners intern the sub-path's bounding box corners.
    fn add_path_boundary(
        &mut self,
        tess: &mut SweepTessellator,
        sub_path: &SubPath,
        fudge_count: u32,
    ) {
        let bounds = sub_path.bounds();
        let slack = f64::from(fudge_count) * self.points.converter().fudge_delta();

        tess.begin_contour(true);
        for &k in &BOUNDARY_CORNER_ORDER {
            let (x, px) = if k & BOX_MAX_X_FLAG != 0 {
                (BOX_DIM + slack, bounds.max.x)
            } else {
                (-slack, bounds.min.x)
            };
            let (y, py) = if k & BOX_MAX_Y_FLAG != 0 {
                (BOX_DIM + slack, bounds.max.y)
            } else {
                (-slack, bounds.min.y)
            };
            let id = self.points.fetch(point(px, py));
            tess.add_vertex(DoublePoint::new(x, y), id);
        }
        tess.end_contour();
    }

    fn current_winding(&self) -> i32 {
        match self.pass {
            Pass::NonZero { current, .. } => current,
            Pass::Zero { winding } => winding,
        }
    }

    fn position(&self, v: VertexId) -> Point {
        self.points.position(v)
    }

    fn non_degenerate(&self) -> bool {
        let [a, b, c] = self.temp_verts;
        if a == b || a == c || b == c {
            return false;
        }
        let p0 = self.position(a);
        let p1 = self.position(b);
        let p2 = self.position(c);
        if p0 == p1 || p0 == p2 || p1 == p2 {
            return false;
        }
        // Reject only triangles whose area is zero in f32 arithmetic.
        let v = p1 - p0;
        let w = p2 - p0;
        (v.x * w.y - v.y * w.x).abs() > 0.0
    }

    /// Subdivides the staged triangle at its edge midpoints and centroid and
    /// emits the six-triangle fan around the centroid.
    fn subdivide_and_emit(&mut self) {
        let [a, b, c] = self.temp_verts;
        let p0 = self.position(a);
        let p1 = self.position(b);
        let p2 = self.position(c);
        let m01 = p0.lerp(p1, 0.5);
        let m02 = p0.lerp(p2, 0.5);
        let m12 = p1.lerp(p2, 0.5);
        let center = point(
            (p0.x + p1.x + p2.x) / 3.0,
            (p0.y + p1.y + p2.y) / 3.0,
        );

        let i01 = self.points.fetch(m01);
        let i02 = self.points.fetch(m02);
        let i12 = self.points.fetch(m12);
        let ic = self.points.fetch(center);
        if [i01, i02, i12, ic].contains(&VertexId::INVALID) {
            self.failed = true;
            return;
        }

        self.add_triangle(a, i01, ic);
        self.add_triangle(a, ic, i02);
        self.add_triangle(ic, b, i12);
        self.add_triangle(i01, b, ic);
        self.add_triangle(i02, ic, c);
        self.add_triangle(ic, i12, c);
    }

    fn add_triangle(&mut self, a: VertexId, b: VertexId, c: VertexId) {
        self.add_vertex_to_region(a);
        self.add_vertex_to_region(b);
        self.add_vertex_to_region(c);
    }

    fn add_vertex_to_region(&mut self, v: VertexId) {
        let winding = self.current_winding();
        self.hoard.entry(winding).or_default().push(v.offset());
        self.points.add_winding(v, winding);
    }
}

impl RegionSink for Tesser<'_, '_> {
    fn fill_region(&mut self, winding: i32) -> bool {
        match self.pass {
            Pass::NonZero { .. } => winding != 0,
            Pass::Zero { .. } => winding == -1,
        }
    }

    fn begin_region(&mut self, winding: i32) {
        self.temp_count = 0;
        if let Pass::NonZero {
            winding_start,
            ref mut current,
        } = self.pass
        {
            *current = winding + winding_start;
        }
    }

    fn vertex(&mut self, id: VertexId) {
        if id == VertexId::INVALID {
            self.failed = true;
        }
        self.temp_verts[self.temp_count] = id;
        self.temp_count += 1;
        if self.temp_count == 3 {
            self.temp_count = 0;
            if self.temp_verts.iter().all(|&v| v != VertexId::INVALID) && self.non_degenerate() {
                self.subdivide_and_emit();
            }
        }
    }

    /// Weighted average of the contributors' original (un-perturbed)
    /// positions, interned through the hoard so coincident combines collapse
    /// to one vertex.
    fn combine(
        &mut self,
        _position: DoublePoint,
        ids: [VertexId; 4],
        weights: [f64; 4],
    ) -> VertexId {
        let mut pt = point(0.0, 0.0);
        for (id, weight) in ids.iter().zip(weights.iter()) {
            if *id != VertexId::INVALID {
                let p = self.points.position(*id);
                pt.x += *weight as f32 * p.x;
                pt.y += *weight as f32 * p.y;
            }
        }
        self.points.fetch(pt)
    }
}

/// Runs both tessellation passes over one sub-path and linearizes the
/// per-winding buckets into a single index buffer.
pub(crate) struct Builder {
    hoard: WindingHoard,
    failed: bool,
}

impl Builder {
    pub fn new(sub_path: &SubPath, points: &mut Vec<FillPoint>, options: &FillOptions) -> Builder {
        let mut point_hoard = PointHoard::new(sub_path.bounds(), points);
        let (path, boxes) = point_hoard.generate_path(sub_path, options);
        let mut hoard = WindingHoard::new();
        let failed_nz =
            Tesser::execute_non_zero(&mut point_hoard, &mut hoard, &path, &boxes, sub_path);
        let failed_z = Tesser::execute_zero(&mut point_hoard, &mut hoard, &path, &boxes, sub_path);
        Builder {
            hoard,
            failed: failed_nz || failed_z,
        }
    }

    pub fn triangulation_failed(&self) -> bool {
        self.failed
    }

    /// Lays the indices out as three contiguous regions (odd windings, even
    /// non-zero windings, zero winding) and records where each winding's
    /// slice landed. Returns the start of the second and third regions, which
    /// is all the four standard fill rules need to name contiguous slices.
    pub fn fill_indices(
        &self,
        indices: &mut Vec<u32>,
        winding_map: &mut BTreeMap<i32, Range<u32>>,
    ) -> (u32, u32) {
        let mut num_odd = 0usize;
        let mut num_even_non_zero = 0usize;
        let mut num_zero = 0usize;
        for (&winding, bucket) in &self.hoard {
            if winding == 0 {
                num_zero += bucket.len();
            } else if winding % 2 == 0 {
                num_even_non_zero += bucket.len();
            } else {
                num_odd += bucket.len();
            }
        }

        let total = num_odd + num_even_non_zero + num_zero;
        indices.clear();
        indices.resize(total, 0);

        let mut current_odd = 0usize;
        let mut current_even_non_zero = num_odd;
        let mut current_zero = num_odd + num_even_non_zero;
        for (&winding, bucket) in &self.hoard {
            if bucket.is_empty() {
                continue;
            }
            let current = if winding == 0 {
                &mut current_zero
            } else if winding % 2 == 0 {
                &mut current_even_non_zero
            } else {
                &mut current_odd
            };
            indices[*current..*current + bucket.len()].copy_from_slice(bucket);
            winding_map.insert(winding, *current as u32..(*current + bucket.len()) as u32);
            *current += bucket.len();
        }

        debug_assert_eq!(current_odd, num_odd);
        debug_assert_eq!(current_even_non_zero, num_odd + num_even_non_zero);
        debug_assert_eq!(current_zero, total);

        (num_odd as u32, (num_odd + num_even_non_zero) as u32)
    }
}
