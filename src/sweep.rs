//! A winding-aware sweep-line polygon tessellator over f64 grid coordinates.
//!
//! Contours go in with a per-contour *affects-winding* flag; triangles come
//! out through a [`RegionSink`], one region at a time, each region tagged
//! with its winding number. The sink's predicate decides which windings are
//! tessellated at all, and its combine hook owns the creation of vertices the
//! sweep needs that are not input vertices (edge intersections and span
//! corners).
//!
//! The sweep proceeds bottom-up in y. Edge crossings are resolved up front by
//! splitting edges at their intersections, so that between two consecutive
//! event coordinates the active edges are totally ordered in x. The region
//! between two neighboring active edges keeps its winding number until one of
//! the bounding edges ends or another edge starts in between; such a maximal
//! region is a trapezoid and is emitted as (at most) two triangles.

use crate::error::InternalError;
use crate::math::DoublePoint;
use crate::VertexId;
use float_next_after::NextAfter;
use std::collections::HashSet;

/// Snap tolerance, as a fraction of an edge, under which an intersection is
/// considered to hit an endpoint.
const T_SNAP: f64 = 1e-9;

#[cfg(debug_assertions)]
macro_rules! tess_log {
    ($obj:ident, $fmt:expr) => (
        if $obj.log {
            println!($fmt);
        }
    );
    ($obj:ident, $fmt:expr, $($arg:tt)*) => (
        if $obj.log {
            println!($fmt, $($arg)*);
        }
    );
}

#[cfg(not(debug_assertions))]
macro_rules! tess_log {
    ($obj:ident, $fmt:expr) => {};
    ($obj:ident, $fmt:expr, $($arg:tt)*) => {};
}

/// Receives the output of a [`SweepTessellator`] run.
pub(crate) trait RegionSink {
    /// Predicate deciding whether regions with this winding are emitted.
    fn fill_region(&mut self, winding: i32) -> bool;
    /// Starts a run of triangles covering one region with the given winding.
    fn begin_region(&mut self, winding: i32);
    /// Triangle vertices, in groups of three.
    fn vertex(&mut self, id: VertexId);
    /// A new vertex created by the sweep, described as a weighted combination
    /// of up to four existing vertices (unused slots hold
    /// `VertexId::INVALID`). Returns the id allocated for it.
    fn combine(
        &mut self,
        position: DoublePoint,
        ids: [VertexId; 4],
        weights: [f64; 4],
    ) -> VertexId;
}

#[derive(Copy, Clone, Debug)]
struct EndPoint {
    position: DoublePoint,
    id: VertexId,
}

#[derive(Copy, Clone, Debug)]
struct Split {
    t: f64,
    vertex: EndPoint,
}

#[derive(Debug)]
struct Edge {
    from: EndPoint,
    to: EndPoint,
    /// +1 when the edge is directed toward +y, -1 toward -y, 0 for exactly
    /// horizontal edges and for contours that do not affect winding.
    winding: i32,
    splits: Vec<Split>,
}

#[derive(Copy, Clone, Debug)]
struct SubEdge {
    upper: EndPoint,
    lower: EndPoint,
    winding: i32,
}

/// A maximal region between a fixed pair of active edges with a fixed
/// winding; open from `start` y until one of its bounds changes.
#[derive(Copy, Clone, Debug)]
struct Span {
    left: usize,
    right: usize,
    winding: i32,
    start_left: VertexId,
    start_right: VertexId,
}

pub(crate) struct SweepTessellator {
    edges: Vec<Edge>,
    contour: Vec<EndPoint>,
    contour_affects_winding: bool,
    in_contour: bool,
    log: bool,
}

impl SweepTessellator {
    pub fn new() -> SweepTessellator {
        SweepTessellator {
            edges: Vec::new(),
            contour: Vec::new(),
            contour_affects_winding: true,
            in_contour: false,
            log: false,
        }
    }

    #[allow(dead_code)]
    pub fn set_logging(&mut self, log: bool) {
        self.log = log;
    }

    pub fn begin_contour(&mut self, affects_winding: bool) {
        debug_assert!(!self.in_contour);
        self.contour.clear();
        self.contour_affects_winding = affects_winding;
        self.in_contour = true;
    }

    pub fn add_vertex(&mut self, position: DoublePoint, id: VertexId) {
        debug_assert!(self.in_contour);
        self.contour.push(EndPoint { position, id });
    }

    /// Closes the contour (last vertex back to the first) and turns it into
    /// edges, dropping zero-length ones.
    pub fn end_contour(&mut self) {
        debug_assert!(self.in_contour);
        self.in_contour = false;
        let n = self.contour.len();
        if n < 2 {
            return;
        }
        for i in 0..n {
            let a = self.contour[i];
            let b = self.contour[(i + 1) % n];
            if a.position == b.position {
                continue;
            }
            let winding = if !self.contour_affects_winding {
                0
            } else if b.position.y > a.position.y {
                1
            } else if b.position.y < a.position.y {
                -1
            } else {
                0
            };
            self.edges.push(Edge {
                from: a,
                to: b,
                winding,
                splits: Vec::new(),
            });
        }
    }

    /// Runs the sweep. On an internal inconsistency the error is returned but
    /// every region emitted up to that point remains valid.
    pub fn tessellate(&mut self, sink: &mut dyn RegionSink) -> Result<(), InternalError> {
        debug_assert!(!self.in_contour);
        self.resolve_intersections(sink);
        let sub_edges = self.build_sub_edges();
        self.sweep(&sub_edges, sink)
    }

    /// Splits every pair of crossing edges at their intersection. Both edges
    /// share the single combine-created vertex, so the triangulations on all
    /// four sides meet exactly there. An intersection at an endpoint of one
    /// edge splits only the other edge, reusing the endpoint's vertex.
    fn resolve_intersections(&mut self, sink: &mut dyn RegionSink) {
        for i in 0..self.edges.len() {
            for j in (i + 1)..self.edges.len() {
                let (a_from, a_to) = (self.edges[i].from, self.edges[i].to);
                let (b_from, b_to) = (self.edges[j].from, self.edges[j].to);
                let (s, u, position) =
                    match segment_intersection(a_from, a_to, b_from, b_to) {
                        Some(hit) => hit,
                        None => continue,
                    };
                let s_interior = s > T_SNAP && s < 1.0 - T_SNAP;
                let u_interior = u > T_SNAP && u < 1.0 - T_SNAP;
                if s_interior && u_interior {
                    let ids = [a_from.id, a_to.id, b_from.id, b_to.id];
                    let weights = [
                        0.5 * (1.0 - s),
                        0.5 * s,
                        0.5 * (1.0 - u),
                        0.5 * u,
                    ];
                    let id = sink.combine(position, ids, weights);
                    let vertex = EndPoint { position, id };
                    self.edges[i].splits.push(Split { t: s, vertex });
                    self.edges[j].splits.push(Split { t: u, vertex });
                } else if s_interior {
                    let vertex = if u <= T_SNAP { b_from } else { b_to };
                    self.edges[i].splits.push(Split { t: s, vertex });
                } else if u_interior {
                    let vertex = if s <= T_SNAP { a_from } else { a_to };
                    self.edges[j].splits.push(Split { t: u, vertex });
                }
            }
        }
    }

    fn build_sub_edges(&mut self) -> Vec<SubEdge> {
        let mut out = Vec::with_capacity(self.edges.len());
        for edge in &mut self.edges {
            edge.splits.sort_by(|a, b| a.t.total_cmp(&b.t));
            let mut prev = edge.from;
            for split in &edge.splits {
                push_sub_edge(&mut out, prev, split.vertex, edge.winding);
                prev = split.vertex;
            }
            push_sub_edge(&mut out, prev, edge.to, edge.winding);
        }
        out
    }

    fn sweep(
        &self,
        sub_edges: &[SubEdge],
        sink: &mut dyn RegionSink,
    ) -> Result<(), InternalError> {
        let mut events = Vec::with_capacity(sub_edges.len() * 2);
        for e in sub_edges {
            events.push(e.upper.position.y);
            events.push(e.lower.position.y);
        }
        events.sort_by(f64::total_cmp);
        events.dedup();
        if events.len() < 2 {
            return Ok(());
        }

        let mut result = Ok(());
        let mut active: Vec<usize> = Vec::new();
        let mut regions: Vec<(usize, usize, i32)> = Vec::new();
        let mut spans: Vec<Span> = Vec::new();

        for w in events.windows(2) {
            let (y0, y1) = (w[0], w[1]);
            if !(y1 > y0) {
                continue;
            }
            let mut ym = 0.5 * (y0 + y1);
            if ym <= y0 {
                ym = y0.next_after(f64::INFINITY);
            }

            active.clear();
            for (i, e) in sub_edges.iter().enumerate() {
                if e.upper.position.y <= y0 && e.lower.position.y >= y1 {
                    active.push(i);
                }
            }
            active.sort_by(|&a, &b| {
                x_at(&sub_edges[a], ym).total_cmp(&x_at(&sub_edges[b], ym))
            });

            regions.clear();
            let mut winding = 0i32;
            for pair in active.windows(2) {
                winding -= sub_edges[pair[0]].winding;
                if sink.fill_region(winding) {
                    regions.push((pair[0], pair[1], winding));
                }
            }
            if let Some(&last) = active.last() {
                let closing = winding - sub_edges[last].winding;
                if closing != 0 {
                    tess_log!(self, "unbalanced slab [{}, {}]: {}", y0, y1, closing);
                    if result.is_ok() {
                        result = Err(InternalError::UnbalancedSlabWinding(closing));
                    }
                }
            }
            tess_log!(
                self,
                "slab [{}, {}]: {} active edges, {} regions",
                y0,
                y1,
                active.len(),
                regions.len()
            );

            // A span survives the event at y0 only if the same (left, right,
            // winding) region still exists; everything else closes at y0 and
            // the new regions open there.
            let region_keys: HashSet<(usize, usize, i32)> = regions.iter().copied().collect();
            let span_keys: HashSet<(usize, usize, i32)> = spans
                .iter()
                .map(|s| (s.left, s.right, s.winding))
                .collect();

            let mut kept = Vec::with_capacity(spans.len());
            for span in spans.drain(..) {
                if region_keys.contains(&(span.left, span.right, span.winding)) {
                    kept.push(span);
                } else {
                    close_span(&span, y0, sub_edges, sink);
                }
            }
            spans = kept;

            for &(left, right, winding) in &regions {
                if !span_keys.contains(&(left, right, winding)) {
                    let start_left = vertex_on_edge(&sub_edges[left], y0, sink);
                    let start_right = vertex_on_edge(&sub_edges[right], y0, sink);
                    spans.push(Span {
                        left,
                        right,
                        winding,
                        start_left,
                        start_right,
                    });
                }
            }
        }

        let y_end = *events.last().unwrap();
        for span in &spans {
            close_span(span, y_end, sub_edges, sink);
        }

        result
    }
}

fn push_sub_edge(out: &mut Vec<SubEdge>, a: EndPoint, b: EndPoint, winding: i32) {
    if a.position == b.position {
        return;
    }
    let a_key = (a.position.y, a.position.x);
    let b_key = (b.position.y, b.position.x);
    let (upper, lower) = if a_key <= b_key { (a, b) } else { (b, a) };
    out.push(SubEdge {
        upper,
        lower,
        winding,
    });
}

fn segment_intersection(
    a1: EndPoint,
    a2: EndPoint,
    b1: EndPoint,
    b2: EndPoint,
) -> Option<(f64, f64, DoublePoint)> {
    let d1 = a2.position - a1.position;
    let d2 = b2.position - b1.position;
    let denom = d1.cross(d2);
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let v = b1.position - a1.position;
    let s = v.cross(d2) / denom;
    let u = v.cross(d1) / denom;
    if !(0.0..=1.0).contains(&s) || !(0.0..=1.0).contains(&u) {
        return None;
    }
    Some((s, u, a1.position + d1 * s))
}

fn x_at(e: &SubEdge, y: f64) -> f64 {
    let dy = e.lower.position.y - e.upper.position.y;
    let t = (y - e.upper.position.y) / dy;
    e.upper.position.x + (e.lower.position.x - e.upper.position.x) * t
}

/// The vertex where `e` crosses the horizontal line at `y`: one of its
/// endpoints when `y` reaches them, otherwise a combine-created vertex
/// interpolated along the edge.
fn vertex_on_edge(e: &SubEdge, y: f64, sink: &mut dyn RegionSink) -> VertexId {
    if y <= e.upper.position.y {
        return e.upper.id;
    }
    if y >= e.lower.position.y {
        return e.lower.id;
    }
    let t = (y - e.upper.position.y) / (e.lower.position.y - e.upper.position.y);
    let position = e.upper.position.lerp(e.lower.position, t);
    sink.combine(
        position,
        [e.upper.id, e.lower.id, VertexId::INVALID, VertexId::INVALID],
        [1.0 - t, t, 0.0, 0.0],
    )
}

/// Emits the trapezoid of a closed span as up to two triangles, oriented
/// counter-clockwise. Degenerate sides collapse to a single triangle; a span
/// with both sides degenerate is a sliver between coincident edges and is
/// dropped entirely.
fn close_span(span: &Span, y: f64, sub_edges: &[SubEdge], sink: &mut dyn RegionSink) {
    let end_left = vertex_on_edge(&sub_edges[span.left], y, sink);
    let end_right = vertex_on_edge(&sub_edges[span.right], y, sink);
    let (sl, sr) = (span.start_left, span.start_right);
    let (el, er) = (end_left, end_right);
    if sl == sr && el == er {
        return;
    }
    sink.begin_region(span.winding);
    if sl != sr {
        sink.vertex(sl);
        sink.vertex(sr);
        sink.vertex(er);
    }
    if el != er {
        sink.vertex(sl);
        sink.vertex(er);
        sink.vertex(el);
    }
}
