//! The read-only view a renderer walks to emit draw calls.

use crate::math::Point;
use crate::winding::WindingSet;

/// One output vertex: position plus the anti-aliasing boundary flag
/// (1.0 = interior, 0.0 = on the fill boundary).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FillAttribute {
    pub position: Point,
    pub interior: f32,
}

pub(crate) struct PerAttributeChunk<'l> {
    pub positions: &'l [Point],
    pub windings: &'l [WindingSet],
}

pub(crate) struct PerIndexChunk<'l> {
    pub indices: &'l [u32],
    pub attribute_chunk: usize,
}

/// Assembled by [`FilledPath::compute_writer`](crate::FilledPath::compute_writer):
/// one attribute chunk per selected subset contributing to the active fill
/// rule, one index chunk per (subset, selected winding number).
pub struct DataWriter<'l> {
    pub(crate) attribute_chunks: Vec<PerAttributeChunk<'l>>,
    pub(crate) index_chunks: Vec<PerIndexChunk<'l>>,
    pub(crate) complement_winding_rule: WindingSet,
}

impl<'l> DataWriter<'l> {
    pub(crate) fn empty() -> DataWriter<'l> {
        DataWriter {
            attribute_chunks: Vec::new(),
            index_chunks: Vec::new(),
            complement_winding_rule: WindingSet::new(),
        }
    }

    pub fn number_attribute_chunks(&self) -> usize {
        self.attribute_chunks.len()
    }

    pub fn number_attributes(&self, attribute_chunk: usize) -> usize {
        self.attribute_chunks[attribute_chunk].positions.len()
    }

    pub fn number_index_chunks(&self) -> usize {
        self.index_chunks.len()
    }

    pub fn number_indices(&self, index_chunk: usize) -> usize {
        self.index_chunks[index_chunk].indices.len()
    }

    /// The attribute chunk the given index chunk's indices refer to.
    pub fn attribute_chunk_selection(&self, index_chunk: usize) -> usize {
        self.index_chunks[index_chunk].attribute_chunk
    }

    /// Copies the chunk's indices into `dst`, adding `index_offset` to each
    /// (the base offset at which the matching attributes were written).
    pub fn write_indices(&self, dst: &mut [u32], index_offset: u32, index_chunk: usize) {
        let src = self.index_chunks[index_chunk].indices;
        assert_eq!(dst.len(), src.len());
        for (d, s) in dst.iter_mut().zip(src.iter()) {
            *d = s + index_offset;
        }
    }

    /// Copies the chunk's vertices into `dst`. A vertex is on the fill
    /// boundary iff one of its incident winding numbers is not selected by
    /// the active fill rule.
    pub fn write_attributes(&self, dst: &mut [FillAttribute], attribute_chunk: usize) {
        let chunk = &self.attribute_chunks[attribute_chunk];
        assert_eq!(dst.len(), chunk.positions.len());
        for ((d, position), windings) in dst
            .iter_mut()
            .zip(chunk.positions.iter())
            .zip(chunk.windings.iter())
        {
            let outside = self.complement_winding_rule.have_common_bit(windings);
            *d = FillAttribute {
                position: *position,
                interior: if outside { 0.0 } else { 1.0 },
            };
        }
    }
}
