//! Vertex deduplication and the shared vertex table of one tessellation run.

use crate::coordinate::CoordinateConverter;
use crate::math::{point, Box2D, Point};
use crate::sub_path::{SubContour, SubPath, BOX_MAX_X_FLAG, BOX_MAX_Y_FLAG};
use crate::{FillOptions, VertexId};
use std::collections::{BTreeMap, BTreeSet};

/// Guide boxes group this many consecutive source vertices.
const POINTS_PER_GUIDING_BOX: usize = 16;
/// Groups shorter than this never become a box.
const MIN_POINTS_PER_GUIDING_BOX: usize = 4;
/// Second-level grouping fan-in: boxes per box-of-boxes.
const GUIDING_BOXES_PER_GUIDING_BOX: usize = 8;

/// A stored vertex: its position plus the winding numbers of every emitted
/// triangle incident on it.
#[derive(Clone, Debug)]
pub(crate) struct FillPoint {
    pub position: Point,
    pub windings: BTreeSet<i32>,
}

pub(crate) type HoardContour = Vec<VertexId>;
pub(crate) type HoardPath = Vec<HoardContour>;
/// Guide-box corner ids, indexed by corner code.
pub(crate) type GuideBoxes = Vec<[VertexId; 4]>;

/// Deduplicates vertices by their quantized integer grid coordinates and
/// assigns dense ids into a caller-owned vertex table.
pub(crate) struct PointHoard<'l> {
    converter: CoordinateConverter,
    map: BTreeMap<(i32, i32), VertexId>,
    points: &'l mut Vec<FillPoint>,
}

impl<'l> PointHoard<'l> {
    pub fn new(bounds: Box2D, points: &'l mut Vec<FillPoint>) -> PointHoard<'l> {
        debug_assert!(!bounds.is_empty());
        PointHoard {
            converter: CoordinateConverter::new(bounds.min, bounds.max),
            map: BTreeMap::new(),
            points,
        }
    }

    /// Returns the id of the vertex at `position`, inserting it on first use.
    /// Returns `VertexId::INVALID` if the table is full.
    pub fn fetch(&mut self, position: Point) -> VertexId {
        let key = self.converter.iapply(position);
        if let Some(&id) = self.map.get(&key) {
            return id;
        }
        if self.points.len() >= u32::MAX as usize {
            return VertexId::INVALID;
        }
        let id = VertexId::from_usize(self.points.len());
        self.points.push(FillPoint {
            position,
            windings: BTreeSet::new(),
        });
        self.map.insert(key, id);
        id
    }

    #[inline]
    pub fn position(&self, v: VertexId) -> Point {
        self.points[v.to_usize()].position
    }

    #[inline]
    pub fn add_winding(&mut self, v: VertexId, winding: i32) {
        self.points[v.to_usize()].windings.insert(winding);
    }

    #[inline]
    pub fn converter(&self) -> &CoordinateConverter {
        &self.converter
    }

    /// Interns every contour of `input` and, when enabled, generates the
    /// guide-box contours.
    pub fn generate_path(
        &mut self,
        input: &SubPath,
        options: &FillOptions,
    ) -> (HoardPath, GuideBoxes) {
        let mut path = Vec::with_capacity(input.contours().len());
        let mut boxes = GuideBoxes::new();
        for contour in input.contours() {
            let c = self.generate_contour(contour, options, &mut boxes);
            path.push(c);
        }
        (path, boxes)
    }

    /// Groups runs of `POINTS_PER_GUIDING_BOX` consecutive vertices into
    /// boxes, restarting at each tessellated-edge start so boxes follow the
    /// source segments.
    fn generate_contour(
        &mut self,
        contour: &SubContour,
        options: &FillOptions,
        guide: &mut GuideBoxes,
    ) -> HoardContour {
        let mut out = HoardContour::with_capacity(contour.len());
        let mut boxes = vec![empty_box()];
        let mut cnt = 0usize;
        let mut total_cnt = 0usize;

        for (v, pt) in contour.iter().enumerate() {
            if options.guiding_boxes && v != 0 && pt.starts_tessellated_edge() {
                pre_process_boxes(&mut boxes, cnt);
                if total_cnt >= MIN_POINTS_PER_GUIDING_BOX {
                    self.process_bounding_boxes(&boxes, guide);
                }
                boxes.clear();
                boxes.push(empty_box());
                cnt = 0;
                total_cnt = 0;
            }

            out.push(self.fetch(pt.position()));
            union_point(boxes.last_mut().unwrap(), pt.position());
            cnt += 1;
            total_cnt += 1;
            if cnt == POINTS_PER_GUIDING_BOX {
                cnt = 0;
                boxes.push(empty_box());
            }
        }

        if options.guiding_boxes {
            pre_process_boxes(&mut boxes, cnt);
            if total_cnt >= MIN_POINTS_PER_GUIDING_BOX {
                self.process_bounding_boxes(&boxes, guide);
            }
        }
        out
    }

    /// Interns the four corners of each box and recursively builds
    /// boxes-of-boxes while enough boxes remain.
    fn process_bounding_boxes(&mut self, in_boxes: &[Box2D], guide: &mut GuideBoxes) {
        let mut boxes_of_boxes = vec![empty_box()];
        let mut cnt = 0usize;
        let mut total_cnt = 0usize;

        for b in in_boxes {
            if is_empty_box(b) {
                continue;
            }
            let mut ids = [VertexId::INVALID; 4];
            for (k, id) in ids.iter_mut().enumerate() {
                let x = if k as u8 & BOX_MAX_X_FLAG != 0 {
                    b.max.x
                } else {
                    b.min.x
                };
                let y = if k as u8 & BOX_MAX_Y_FLAG != 0 {
                    b.max.y
                } else {
                    b.min.y
                };
                *id = self.fetch(point(x, y));
            }
            guide.push(ids);

            union_box(boxes_of_boxes.last_mut().unwrap(), b);
            cnt += 1;
            total_cnt += 1;
            if cnt == GUIDING_BOXES_PER_GUIDING_BOX {
                cnt = 0;
                boxes_of_boxes.push(empty_box());
            }
        }

        pre_process_boxes(&mut boxes_of_boxes, cnt);
        if total_cnt >= GUIDING_BOXES_PER_GUIDING_BOX {
            self.process_bounding_boxes(&boxes_of_boxes, guide);
        }
    }
}

/// Merges a short trailing group into the previous box, and drops a lone
/// group too small to matter.
fn pre_process_boxes(boxes: &mut Vec<Box2D>, cnt: usize) {
    if cnt <= MIN_POINTS_PER_GUIDING_BOX && boxes.len() > 1 {
        let b = boxes.pop().unwrap();
        union_box(boxes.last_mut().unwrap(), &b);
    } else if boxes.len() == 1 && cnt <= 2 {
        boxes.pop();
    }
}

fn empty_box() -> Box2D {
    Box2D::new(point(f32::MAX, f32::MAX), point(f32::MIN, f32::MIN))
}

fn is_empty_box(b: &Box2D) -> bool {
    b.min.x > b.max.x || b.min.y > b.max.y
}

fn union_point(b: &mut Box2D, p: Point) {
    b.min.x = b.min.x.min(p.x);
    b.min.y = b.min.y.min(p.y);
    b.max.x = b.max.x.max(p.x);
    b.max.y = b.max.y.max(p.y);
}

fn union_box(b: &mut Box2D, other: &Box2D) {
    if is_empty_box(other) {
        return;
    }
    union_point(b, other.min);
    union_point(b, other.max);
}
