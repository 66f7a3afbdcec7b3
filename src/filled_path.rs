//! The public entry point: a path tessellated for filling, split into a
//! hierarchy of subsets baked on demand.

use crate::clip::{ClipEquation, ClipMatrix};
use crate::math::{Box2D, Point};
use crate::sub_path::SubPath;
use crate::subset::{create_hierarchy, make_ready, select_subsets, SubsetNode};
use crate::tessellated_path::TessellatedPath;
use crate::winding::{chunk_from_winding_number, WindingSet};
use crate::writer::{DataWriter, PerAttributeChunk, PerIndexChunk};
use crate::{CustomFillRule, FillOptions};

/// Reusable scratch buffers for the selection path. Callers keep one around
/// and pass it to every [`FilledPath::select_subsets`] /
/// [`FilledPath::compute_writer`] call.
#[derive(Default)]
pub struct ScratchSpace {
    pub(crate) adjusted_clip_eqs: Vec<ClipEquation>,
    pub(crate) clipped_rect: Vec<Point>,
    pub(crate) clip_scratch: Vec<Point>,
}

impl ScratchSpace {
    pub fn new() -> ScratchSpace {
        ScratchSpace::default()
    }
}

/// A filled path: the subset hierarchy over one tessellated input path.
///
/// Subsets are identified by their index in construction order; index 0 is
/// the root. Baking is lazy and memoized, which is why the accessors that can
/// trigger it take `&mut self`.
pub struct FilledPath {
    nodes: Vec<SubsetNode>,
    options: FillOptions,
}

impl FilledPath {
    pub fn new<P: TessellatedPath + ?Sized>(path: &P) -> FilledPath {
        FilledPath::with_options(path, &FillOptions::DEFAULT)
    }

    /// Degenerate input (no points, or a bounding box with zero width or
    /// height) produces a filled path with no subsets.
    pub fn with_options<P: TessellatedPath + ?Sized>(
        path: &P,
        options: &FillOptions,
    ) -> FilledPath {
        let mut nodes = Vec::new();
        let root = SubPath::new(path);
        if !root.bounds().is_empty() && root.total_points() > 0 {
            create_hierarchy(root, &mut nodes);
        }
        FilledPath {
            nodes,
            options: *options,
        }
    }

    pub fn number_subsets(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the subset with the given id, baking it if needed.
    pub fn subset(&mut self, id: usize) -> Subset<'_> {
        let options = self.options;
        make_ready(&mut self.nodes, id, &options);
        Subset {
            node: &self.nodes[id],
        }
    }

    /// Writes into `dst` the ids of the subsets that cover the clip region,
    /// in pre-order, preferring nodes whose baked sizes fit the given
    /// per-draw budgets. Returns the number of subsets written.
    ///
    /// `clip_equations` are half-planes in clip space; `clip_matrix_local`
    /// maps local coordinates to clip space.
    pub fn select_subsets(
        &mut self,
        scratch: &mut ScratchSpace,
        clip_equations: &[ClipEquation],
        clip_matrix_local: &ClipMatrix,
        max_attribute_count: u32,
        max_index_count: u32,
        dst: &mut Vec<usize>,
    ) -> usize {
        if self.nodes.is_empty() {
            dst.clear();
            return 0;
        }
        scratch.adjusted_clip_eqs.clear();
        scratch.adjusted_clip_eqs.extend(
            clip_equations
                .iter()
                .map(|eq| clip_matrix_local.transform_equation(eq)),
        );
        let options = self.options;
        select_subsets(
            &mut self.nodes,
            0,
            scratch,
            max_attribute_count,
            max_index_count,
            dst,
            &options,
        )
    }

    /// Selects, bakes, and assembles everything a renderer needs to draw the
    /// path under `fill_rule` within the clip region.
    pub fn compute_writer<R: CustomFillRule + ?Sized>(
        &mut self,
        scratch: &mut ScratchSpace,
        fill_rule: &R,
        clip_equations: &[ClipEquation],
        clip_matrix_local: &ClipMatrix,
        max_attribute_count: u32,
        max_index_count: u32,
    ) -> DataWriter<'_> {
        let mut selection = Vec::new();
        let count = self.select_subsets(
            scratch,
            clip_equations,
            clip_matrix_local,
            max_attribute_count,
            max_index_count,
            &mut selection,
        );
        if count == 0 {
            return DataWriter::empty();
        }

        let options = self.options;
        for &id in &selection {
            make_ready(&mut self.nodes, id, &options);
        }

        let mut min_winding = i32::MAX;
        let mut max_winding = i32::MIN;
        for &id in &selection {
            for &w in &self.nodes[id].winding_numbers {
                min_winding = min_winding.min(w);
                max_winding = max_winding.max(w);
            }
        }
        if min_winding > max_winding {
            // Nothing was tessellated anywhere in the selection.
            return DataWriter::empty();
        }

        let winding_rule = WindingSet::from_fill_rule(min_winding, max_winding, fill_rule, false);
        let complement_winding_rule =
            WindingSet::from_fill_rule(min_winding, max_winding, fill_rule, true);

        let mut attribute_chunks = Vec::new();
        let mut index_chunks = Vec::new();
        for &id in &selection {
            let node = &self.nodes[id];
            let data = node.data.as_ref().unwrap();
            let mut attribute_chunk = None;
            for &w in &node.winding_numbers {
                if !winding_rule.has(w) {
                    continue;
                }
                let chunk = *attribute_chunk.get_or_insert_with(|| {
                    attribute_chunks.push(PerAttributeChunk {
                        positions: &data.positions,
                        windings: &node.windings_per_vertex,
                    });
                    attribute_chunks.len() - 1
                });
                index_chunks.push(PerIndexChunk {
                    indices: data.index_chunk(chunk_from_winding_number(w)),
                    attribute_chunk: chunk,
                });
            }
        }

        DataWriter {
            attribute_chunks,
            index_chunks,
            complement_winding_rule,
        }
    }
}

/// A handle to one baked subset.
pub struct Subset<'l> {
    node: &'l SubsetNode,
}

impl Subset<'_> {
    pub fn bounds(&self) -> Box2D {
        self.node.bounds
    }

    /// The winding numbers with at least one triangle, sorted.
    pub fn winding_numbers(&self) -> &[i32] {
        &self.node.winding_numbers
    }

    pub fn number_attributes(&self) -> usize {
        self.node.data.as_ref().unwrap().positions.len()
    }

    pub fn attributes(&self) -> &[Point] {
        &self.node.data.as_ref().unwrap().positions
    }

    pub fn number_index_chunks(&self) -> usize {
        self.node.data.as_ref().unwrap().number_index_chunks()
    }

    /// The indices of one chunk (see [`chunk_from_winding_number`] and
    /// [`crate::chunk_from_fill_rule`]). Unknown chunks are empty.
    pub fn index_chunk(&self, chunk: usize) -> &[u32] {
        self.node.data.as_ref().unwrap().index_chunk(chunk)
    }

    /// Set when the tessellator could not fully classify this subset; the
    /// baked data is still well formed, possibly with missing triangles.
    pub fn triangulation_failed(&self) -> bool {
        self.node.triangulation_failed
    }
}
