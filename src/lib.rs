#![deny(bare_trait_objects)]
#![deny(unconditional_recursion)]
#![allow(clippy::float_cmp)]
#![allow(clippy::too_many_arguments)]

//! Tessellation of filled 2D vector paths into triangle meshes keyed by
//! winding number.
//!
//! ## Overview
//!
//! The input is a [`TessellatedPath`]: a polyline approximation of a vector
//! path (curves already flattened by the producer). [`FilledPath`] converts it
//! into a binary hierarchy of spatial *subsets*. Each subset owns, lazily, a
//! baked mesh in which every triangle is tagged with the winding number of the
//! region it covers, so that any fill rule (non-zero, odd-even, their
//! complements, or an arbitrary [`CustomFillRule`]) can be evaluated at draw
//! time without re-tessellating.
//!
//! A renderer culls the hierarchy against a clip region with
//! [`FilledPath::select_subsets`] (or lets [`FilledPath::compute_writer`] do
//! it) and walks the resulting [`DataWriter`] to emit vertex and index
//! buffers. Each written vertex carries a boundary flag derived from the set
//! of winding numbers incident on it, which an anti-aliasing coverage pass
//! can use to detect silhouettes.
//!
//! Robustness against overlapping, collinear and coincident edges comes from
//! remapping the path onto a large integer grid in double precision and
//! perturbing each submitted vertex by an offset that is visible in f64 but
//! not in f32 (see the crate internals for details).
//!
//! ## Example
//!
//! ```
//! use filled_path::{ClipMatrix, FilledPath, FillRule, FlattenedPath, ScratchSpace};
//! use filled_path::math::point;
//!
//! let mut builder = FlattenedPath::builder();
//! builder.begin(point(0.0, 0.0));
//! builder.line_to(point(1.0, 0.0));
//! builder.line_to(point(1.0, 1.0));
//! builder.line_to(point(0.0, 1.0));
//! builder.close();
//! let path = builder.build();
//!
//! let mut filled = FilledPath::new(&path);
//! let mut scratch = ScratchSpace::new();
//! let writer = filled.compute_writer(
//!     &mut scratch,
//!     &FillRule::NonZero,
//!     &[], // no clip planes
//!     &ClipMatrix::identity(),
//!     u32::MAX,
//!     u32::MAX,
//! );
//!
//! assert_eq!(writer.number_attribute_chunks(), 1);
//! let mut indices = vec![0u32; writer.number_indices(0)];
//! writer.write_indices(&mut indices, 0, 0);
//! assert_eq!(indices.len() % 3, 0);
//! ```

mod clip;
mod coordinate;
mod error;
mod filled_path;
mod hoard;
mod sub_path;
mod subset;
mod sweep;
mod tesser;
mod tessellated_path;
mod winding;
mod writer;

#[cfg(test)]
mod filled_path_tests;

pub use crate::clip::{ClipEquation, ClipMatrix};
pub use crate::error::InternalError;
pub use crate::filled_path::{FilledPath, ScratchSpace, Subset};
pub use crate::tessellated_path::{FlattenedPath, FlattenedPathBuilder, TessellatedPath};
pub use crate::winding::{
    chunk_from_fill_rule, chunk_from_winding_number, WindingSet, FILL_RULE_CHUNK_COUNT,
};
pub use crate::writer::{DataWriter, FillAttribute};

pub mod math {
    //! f32 euclid types used everywhere in this crate.

    /// Alias for `euclid::default::Point2D<f32>`.
    pub type Point = euclid::default::Point2D<f32>;

    /// Alias for `euclid::default::Vector2D<f32>`.
    pub type Vector = euclid::default::Vector2D<f32>;

    /// Alias for `euclid::default::Box2D<f32>`.
    pub type Box2D = euclid::default::Box2D<f32>;

    /// Alias for `euclid::default::Point2D<f64>` (the tessellator works in f64).
    pub type DoublePoint = euclid::default::Point2D<f64>;

    /// Shorthand for `Point::new`.
    #[inline]
    pub fn point(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    /// Shorthand for `Vector::new`.
    #[inline]
    pub fn vector(x: f32, y: f32) -> Vector {
        Vector::new(x, y)
    }

    /// Shorthand for `DoublePoint::new`.
    #[inline]
    pub fn double_point(x: f64, y: f64) -> DoublePoint {
        DoublePoint::new(x, y)
    }
}

use std::fmt;

/// The integer type used for index buffers.
pub type Index = u32;

/// ID of a vertex in the shared vertex table of one tessellation run.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(pub Index);

impl VertexId {
    /// The sentinel "null" vertex id.
    pub const INVALID: VertexId = VertexId(u32::MAX);

    #[inline]
    pub fn offset(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn to_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn from_usize(val: usize) -> Self {
        VertexId(val as Index)
    }
}

impl fmt::Debug for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The fill rule defines how to determine what is inside and what is outside
/// of the shape.
///
/// The discriminants double as the reserved index-chunk ids of the four
/// standard rules (see [`chunk_from_fill_rule`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub enum FillRule {
    NonZero = 0,
    OddEven = 1,
    ComplementNonZero = 2,
    ComplementOddEven = 3,
}

impl FillRule {
    #[inline]
    pub fn is_in(self, winding_number: i32) -> bool {
        match self {
            FillRule::NonZero => winding_number != 0,
            FillRule::OddEven => winding_number.abs() % 2 == 1,
            FillRule::ComplementNonZero => winding_number == 0,
            FillRule::ComplementOddEven => winding_number % 2 == 0,
        }
    }

    #[inline]
    pub fn is_out(self, winding_number: i32) -> bool {
        !self.is_in(winding_number)
    }

    /// Recovers a fill rule from its chunk index.
    ///
    /// Out-of-range values fall back to `NonZero` with a logged diagnostic.
    pub fn from_index(index: u32) -> FillRule {
        match index {
            0 => FillRule::NonZero,
            1 => FillRule::OddEven,
            2 => FillRule::ComplementNonZero,
            3 => FillRule::ComplementOddEven,
            _ => {
                log::warn!("invalid fill rule index {index}, defaulting to non-zero");
                FillRule::NonZero
            }
        }
    }
}

/// A fill rule expressed as a predicate over winding numbers.
///
/// The implementation only ever evaluates the predicate on winding numbers
/// observed in the tessellation, so it does not need to be total in any
/// meaningful sense beyond that range.
pub trait CustomFillRule {
    fn is_in(&self, winding_number: i32) -> bool;
}

impl CustomFillRule for FillRule {
    #[inline]
    fn is_in(&self, winding_number: i32) -> bool {
        FillRule::is_in(*self, winding_number)
    }
}

impl<F: Fn(i32) -> bool> CustomFillRule for F {
    #[inline]
    fn is_in(&self, winding_number: i32) -> bool {
        self(winding_number)
    }
}

/// Parameters for building a [`FilledPath`].
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize, serde::Deserialize))]
pub struct FillOptions {
    /// Insert zero-winding guide boxes around groups of source vertices to
    /// localize the triangles created by the sweep. This does not change the
    /// filled region; it trades extra edges for fewer long sliver triangles.
    pub guiding_boxes: bool,
}

impl FillOptions {
    pub const DEFAULT: FillOptions = FillOptions {
        guiding_boxes: false,
    };

    #[inline]
    pub fn with_guiding_boxes(mut self, guiding_boxes: bool) -> FillOptions {
        self.guiding_boxes = guiding_boxes;
        self
    }
}

impl Default for FillOptions {
    fn default() -> Self {
        FillOptions::DEFAULT
    }
}
