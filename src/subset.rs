//! The spatial hierarchy: a flat arena of subset nodes, baked lazily.

use crate::clip::clip_against_planes;
use crate::filled_path::ScratchSpace;
use crate::hoard::FillPoint;
use crate::math::{Box2D, Point};
use crate::sub_path::{SubPath, POINTS_PER_SUBSET, RECURSION_DEPTH};
use crate::tesser::Builder;
use crate::winding::{chunk_from_fill_rule, chunk_from_winding_number, WindingSet};
use crate::winding::FILL_RULE_CHUNK_COUNT;
use crate::{FillOptions, FillRule};
use std::collections::BTreeSet;
use std::ops::Range;

/// A baked mesh: one vertex array plus index chunks keyed by chunk id. All
/// chunks are ranges into one shared index buffer; for a leaf the buffer is
/// laid out as three contiguous regions (odd, even non-zero, zero winding),
/// so the standard fill rules and the per-winding chunks all name slices of
/// it without duplication.
#[derive(Clone, Debug, Default)]
pub(crate) struct AttributeData {
    pub positions: Vec<Point>,
    pub indices: Vec<u32>,
    pub chunks: Vec<Range<u32>>,
}

impl AttributeData {
    pub fn index_chunk(&self, chunk: usize) -> &[u32] {
        match self.chunks.get(chunk) {
            Some(range) => &self.indices[range.start as usize..range.end as usize],
            None => &[],
        }
    }

    pub fn number_index_chunks(&self) -> usize {
        self.chunks.len()
    }
}

pub(crate) struct SubsetNode {
    pub bounds: Box2D,
    pub children: Option<[usize; 2]>,
    pub sub_path: Option<SubPath>,
    pub data: Option<AttributeData>,
    /// Sorted list of winding numbers with at least one triangle.
    pub winding_numbers: Vec<i32>,
    /// Parallel to `data.positions`: the windings incident on each vertex.
    pub windings_per_vertex: Vec<WindingSet>,
    pub sizes_ready: bool,
    pub num_attributes: u32,
    pub largest_index_chunk: u32,
    pub triangulation_failed: bool,
}

impl SubsetNode {
    fn new(bounds: Box2D) -> SubsetNode {
        SubsetNode {
            bounds,
            children: None,
            sub_path: None,
            data: None,
            winding_numbers: Vec::new(),
            windings_per_vertex: Vec::new(),
            sizes_ready: false,
            num_attributes: 0,
            largest_index_chunk: 0,
            triangulation_failed: false,
        }
    }
}

/// Builds the tree. Nodes are appended in construction order; a node's
/// position in the arena is its stable id.
pub(crate) fn create_hierarchy(sub_path: SubPath, nodes: &mut Vec<SubsetNode>) -> usize {
    build_node(sub_path, RECURSION_DEPTH, nodes)
}

fn build_node(sub_path: SubPath, max_recursion: u32, nodes: &mut Vec<SubsetNode>) -> usize {
    let id = nodes.len();
    nodes.push(SubsetNode::new(sub_path.bounds()));

    if max_recursion > 0 && sub_path.total_points() > POINTS_PER_SUBSET {
        let [a, b] = sub_path.split();
        // A split that shrinks neither side would recurse forever on a
        // single cluster of coincident points.
        if a.total_points() < sub_path.total_points() || b.total_points() < sub_path.total_points()
        {
            let c0 = build_node(a, max_recursion - 1, nodes);
            let c1 = build_node(b, max_recursion - 1, nodes);
            nodes[id].children = Some([c0, c1]);
            return id;
        }
    }

    nodes[id].sub_path = Some(sub_path);
    id
}

/// Memoized: a second call is a no-op.
pub(crate) fn make_ready(nodes: &mut [SubsetNode], id: usize, options: &FillOptions) {
    if nodes[id].data.is_some() {
        return;
    }
    if nodes[id].sub_path.is_some() {
        make_ready_from_sub_path(nodes, id, options);
    } else {
        make_ready_from_children(nodes, id, options);
    }
}

fn make_ready_from_sub_path(nodes: &mut [SubsetNode], id: usize, options: &FillOptions) {
    let sub_path = nodes[id].sub_path.take().unwrap();
    let mut points: Vec<FillPoint> = Vec::new();
    let builder = Builder::new(&sub_path, &mut points, options);

    let mut indices = Vec::new();
    let mut winding_map = std::collections::BTreeMap::new();
    let (even_non_zero_start, zero_start) = builder.fill_indices(&mut indices, &mut winding_map);
    let end = indices.len() as u32;

    let mut chunks: Vec<Range<u32>> = vec![0..0; FILL_RULE_CHUNK_COUNT];
    chunks[chunk_from_fill_rule(FillRule::NonZero)] = 0..zero_start;
    chunks[chunk_from_fill_rule(FillRule::OddEven)] = 0..even_non_zero_start;
    chunks[chunk_from_fill_rule(FillRule::ComplementNonZero)] = zero_start..end;
    chunks[chunk_from_fill_rule(FillRule::ComplementOddEven)] = even_non_zero_start..end;
    for (&winding, range) in &winding_map {
        // Winding zero is already covered by the complement-non-zero chunk.
        if winding != 0 {
            let chunk = chunk_from_winding_number(winding);
            if chunks.len() <= chunk {
                chunks.resize(chunk + 1, 0..0);
            }
            chunks[chunk] = range.clone();
        }
    }

    let largest = (zero_start.max(end - zero_start)).max(
        even_non_zero_start.max(end - even_non_zero_start),
    );

    let node = &mut nodes[id];
    node.winding_numbers = winding_map.keys().copied().collect();
    node.windings_per_vertex = points
        .iter()
        .map(|p| WindingSet::from_set(&p.windings))
        .collect();
    node.num_attributes = points.len() as u32;
    node.largest_index_chunk = largest;
    node.sizes_ready = true;
    node.triangulation_failed = builder.triangulation_failed();
    if node.triangulation_failed {
        log::warn!("triangulation failed on filled-path subset {id}; output is partial");
    }
    node.data = Some(AttributeData {
        positions: points.into_iter().map(|p| p.position).collect(),
        indices,
        chunks,
    });
}

fn make_ready_from_children(nodes: &mut [SubsetNode], id: usize, options: &FillOptions) {
    let [a, b] = nodes[id].children.expect("interior node without children");
    make_ready(nodes, a, options);
    make_ready(nodes, b, options);

    let (data, winding_numbers, windings_per_vertex) = merge_children(&nodes[a], &nodes[b]);
    let (a_attrs, a_largest) = (nodes[a].num_attributes, nodes[a].largest_index_chunk);
    let (b_attrs, b_largest) = (nodes[b].num_attributes, nodes[b].largest_index_chunk);
    let failed = nodes[a].triangulation_failed || nodes[b].triangulation_failed;

    let node = &mut nodes[id];
    node.data = Some(data);
    node.winding_numbers = winding_numbers;
    node.windings_per_vertex = windings_per_vertex;
    node.triangulation_failed = failed;
    if !node.sizes_ready {
        node.sizes_ready = true;
        node.num_attributes = a_attrs + b_attrs;
        node.largest_index_chunk = a_largest + b_largest;
    }
}

/// Concatenates the children's vertex arrays and index chunks (offsetting the
/// second child's indices), so an interior node can be drawn in one call.
fn merge_children(a: &SubsetNode, b: &SubsetNode) -> (AttributeData, Vec<i32>, Vec<WindingSet>) {
    let da = a.data.as_ref().unwrap();
    let db = b.data.as_ref().unwrap();
    let offset = da.positions.len() as u32;

    let mut positions = Vec::with_capacity(da.positions.len() + db.positions.len());
    positions.extend_from_slice(&da.positions);
    positions.extend_from_slice(&db.positions);

    let mut windings_per_vertex =
        Vec::with_capacity(a.windings_per_vertex.len() + b.windings_per_vertex.len());
    windings_per_vertex.extend_from_slice(&a.windings_per_vertex);
    windings_per_vertex.extend_from_slice(&b.windings_per_vertex);

    let num_chunks = da.number_index_chunks().max(db.number_index_chunks());
    let mut indices = Vec::new();
    let mut chunks = Vec::with_capacity(num_chunks);
    for c in 0..num_chunks {
        let start = indices.len() as u32;
        indices.extend_from_slice(da.index_chunk(c));
        indices.extend(db.index_chunk(c).iter().map(|&i| i + offset));
        chunks.push(start..indices.len() as u32);
    }

    let windings: BTreeSet<i32> = a
        .winding_numbers
        .iter()
        .chain(b.winding_numbers.iter())
        .copied()
        .collect();

    (
        AttributeData {
            positions,
            indices,
            chunks,
        },
        windings.into_iter().collect(),
        windings_per_vertex,
    )
}

pub(crate) fn select_subsets(
    nodes: &mut [SubsetNode],
    root: usize,
    scratch: &mut ScratchSpace,
    max_attribute_count: u32,
    max_index_count: u32,
    dst: &mut Vec<usize>,
    options: &FillOptions,
) -> usize {
    dst.clear();
    select_subsets_implement(
        nodes,
        root,
        scratch,
        max_attribute_count,
        max_index_count,
        dst,
        options,
    );
    dst.len()
}

fn select_subsets_implement(
    nodes: &mut [SubsetNode],
    id: usize,
    scratch: &mut ScratchSpace,
    max_attribute_count: u32,
    max_index_count: u32,
    dst: &mut Vec<usize>,
    options: &FillOptions,
) {
    let corners = box_corners(nodes[id].bounds);
    let unclipped = clip_against_planes(
        &scratch.adjusted_clip_eqs,
        &corners,
        &mut scratch.clipped_rect,
        &mut scratch.clip_scratch,
    );
    if scratch.clipped_rect.is_empty() {
        // Fully outside one of the clip planes.
        return;
    }

    let children = nodes[id].children;
    if unclipped || children.is_none() {
        select_subsets_all_unculled(
            nodes,
            id,
            max_attribute_count,
            max_index_count,
            dst,
            options,
        );
        return;
    }

    let [a, b] = children.unwrap();
    select_subsets_implement(
        nodes,
        a,
        scratch,
        max_attribute_count,
        max_index_count,
        dst,
        options,
    );
    select_subsets_implement(
        nodes,
        b,
        scratch,
        max_attribute_count,
        max_index_count,
        dst,
        options,
    );
}

fn select_subsets_all_unculled(
    nodes: &mut [SubsetNode],
    id: usize,
    max_attribute_count: u32,
    max_index_count: u32,
    dst: &mut Vec<usize>,
    options: &FillOptions,
) {
    if !nodes[id].sizes_ready && nodes[id].children.is_none() {
        // The subset is about to be selected; bake it so its sizes are known.
        make_ready_from_sub_path(nodes, id, options);
    }

    if nodes[id].sizes_ready
        && nodes[id].num_attributes <= max_attribute_count
        && nodes[id].largest_index_chunk <= max_index_count
    {
        dst.push(id);
        return;
    }

    match nodes[id].children {
        Some([a, b]) => {
            select_subsets_all_unculled(nodes, a, max_attribute_count, max_index_count, dst, options);
            select_subsets_all_unculled(nodes, b, max_attribute_count, max_index_count, dst, options);
            if !nodes[id].sizes_ready {
                let attrs = nodes[a].num_attributes + nodes[b].num_attributes;
                let largest = nodes[a].largest_index_chunk + nodes[b].largest_index_chunk;
                let node = &mut nodes[id];
                node.sizes_ready = true;
                node.num_attributes = attrs;
                node.largest_index_chunk = largest;
            }
        }
        None => {
            // A childless subset that exceeds the budget is still emitted;
            // the caller is responsible for splitting the draw.
            log::warn!(
                "filled-path subset {id} exceeds the requested attribute/index budget"
            );
            dst.push(id);
        }
    }
}

fn box_corners(b: Box2D) -> [Point; 4] {
    [
        b.min,
        Point::new(b.max.x, b.min.y),
        b.max,
        Point::new(b.min.x, b.max.y),
    ]
}
