/// Describes an unexpected condition detected during the sweep.
///
/// These do not abort a tessellation run: the driver records the failure on
/// the affected subset and keeps whatever partial output was produced.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InternalError {
    /// The winding numbers accumulated across a sweep slab did not return to
    /// zero, which means the input contained an unclosed contour.
    UnbalancedSlabWinding(i32),
}

impl core::fmt::Display for InternalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InternalError::UnbalancedSlabWinding(w) => {
                write!(f, "Unbalanced winding across a sweep slab ({w})")
            }
        }
    }
}

impl std::error::Error for InternalError {}
