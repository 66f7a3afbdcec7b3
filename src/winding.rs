//! Compact winding-number sets and the index-chunk naming scheme.

use crate::{CustomFillRule, FillRule};
use std::collections::{BTreeMap, BTreeSet};

/// Per winding number: triangle vertex ids packed three at a time in
/// insertion order.
pub(crate) type WindingHoard = BTreeMap<i32, Vec<u32>>;

/// The number of index chunks reserved for the standard fill rules.
pub const FILL_RULE_CHUNK_COUNT: usize = 4;

/// Stable index-chunk id for the triangles of one winding number.
///
/// Chunks 0..3 are reserved for the standard fill rules; winding 0 reuses the
/// complement-non-zero chunk, and winding `w != 0` maps to
/// `4 + 2 * (|w| - 1) + (w < 0)`.
pub fn chunk_from_winding_number(winding: i32) -> usize {
    if winding == 0 {
        return FillRule::ComplementNonZero as usize;
    }
    let value = winding.unsigned_abs() as usize;
    let sign = usize::from(winding < 0);
    FILL_RULE_CHUNK_COUNT + sign + 2 * (value - 1)
}

/// Stable index-chunk id of a standard fill rule.
pub fn chunk_from_fill_rule(fill_rule: FillRule) -> usize {
    fill_rule as usize
}

/// A subset of the integers in `[begin, end)`, stored as a bitset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WindingSet {
    begin: i32,
    end: i32,
    bits: Vec<u64>,
}

impl WindingSet {
    pub fn new() -> WindingSet {
        WindingSet::default()
    }

    pub fn clear(&mut self) {
        self.begin = 0;
        self.end = 0;
        self.bits.clear();
    }

    #[inline]
    pub fn begin(&self) -> i32 {
        self.begin
    }

    #[inline]
    pub fn end(&self) -> i32 {
        self.end
    }

    pub(crate) fn from_set(values: &BTreeSet<i32>) -> WindingSet {
        let mut set = WindingSet::new();
        let (first, last) = match (values.iter().next(), values.iter().next_back()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return set,
        };
        set.reset_range(first, last + 1);
        for &w in values {
            set.set(w);
        }
        set
    }

    /// Encodes `fill_rule` (or its complement when `flip` is set) over the
    /// winding range `[min_value, max_value]`. The predicate is only
    /// evaluated inside that range.
    pub(crate) fn from_fill_rule<R: CustomFillRule + ?Sized>(
        min_value: i32,
        max_value: i32,
        fill_rule: &R,
        flip: bool,
    ) -> WindingSet {
        let mut set = WindingSet::new();
        debug_assert!(min_value <= max_value);
        set.reset_range(min_value, max_value + 1);
        for w in min_value..=max_value {
            if fill_rule.is_in(w) != flip {
                set.set(w);
            }
        }
        set
    }

    pub fn has(&self, winding: i32) -> bool {
        if winding < self.begin || winding >= self.end {
            return false;
        }
        let bit = (winding - self.begin) as usize;
        self.bits[bit / 64] & (1 << (bit % 64)) != 0
    }

    /// Whether the two sets share at least one member.
    pub fn have_common_bit(&self, other: &WindingSet) -> bool {
        let begin = self.begin.max(other.begin);
        let end = self.end.min(other.end);
        for w in begin..end {
            if self.has(w) && other.has(w) {
                return true;
            }
        }
        false
    }

    fn reset_range(&mut self, begin: i32, end: i32) {
        self.begin = begin;
        self.end = end;
        let len = (end - begin) as usize;
        self.bits.clear();
        self.bits.resize(len.div_ceil(64), 0);
    }

    fn set(&mut self, winding: i32) {
        debug_assert!(winding >= self.begin && winding < self.end);
        let bit = (winding - self.begin) as usize;
        self.bits[bit / 64] |= 1 << (bit % 64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_ids_follow_the_reserved_layout() {
        assert_eq!(chunk_from_fill_rule(FillRule::NonZero), 0);
        assert_eq!(chunk_from_fill_rule(FillRule::OddEven), 1);
        assert_eq!(chunk_from_fill_rule(FillRule::ComplementNonZero), 2);
        assert_eq!(chunk_from_fill_rule(FillRule::ComplementOddEven), 3);

        assert_eq!(chunk_from_winding_number(0), 2);
        assert_eq!(chunk_from_winding_number(1), 4);
        assert_eq!(chunk_from_winding_number(-1), 5);
        assert_eq!(chunk_from_winding_number(2), 6);
        assert_eq!(chunk_from_winding_number(-2), 7);
        assert_eq!(chunk_from_winding_number(3), 8);
    }

    #[test]
    fn from_set_membership() {
        let mut values = BTreeSet::new();
        values.insert(-2);
        values.insert(1);
        values.insert(5);
        let set = WindingSet::from_set(&values);
        assert_eq!(set.begin(), -2);
        assert_eq!(set.end(), 6);
        for w in -4..8 {
            assert_eq!(set.has(w), values.contains(&w), "winding {w}");
        }
    }

    #[test]
    fn empty_set_has_nothing() {
        let set = WindingSet::from_set(&BTreeSet::new());
        assert!(!set.has(0));
        assert!(!set.have_common_bit(&set));
    }

    #[test]
    fn fill_rule_encoding_and_complement() {
        let rule = WindingSet::from_fill_rule(-2, 3, &FillRule::NonZero, false);
        let complement = WindingSet::from_fill_rule(-2, 3, &FillRule::NonZero, true);
        for w in -2..=3 {
            assert_eq!(rule.has(w), w != 0);
            assert_eq!(complement.has(w), w == 0);
        }
        assert!(!rule.have_common_bit(&complement));
    }

    #[test]
    fn common_bit_across_offset_ranges() {
        let mut a = BTreeSet::new();
        a.insert(1);
        a.insert(2);
        let mut b = BTreeSet::new();
        b.insert(2);
        b.insert(64);
        let sa = WindingSet::from_set(&a);
        let sb = WindingSet::from_set(&b);
        assert!(sa.have_common_bit(&sb));
        assert!(sb.have_common_bit(&sa));

        let mut c = BTreeSet::new();
        c.insert(3);
        let sc = WindingSet::from_set(&c);
        assert!(!sa.have_common_bit(&sc));
    }

    #[test]
    fn custom_rule_evaluated_only_inside_range() {
        let rule = |w: i32| w >= 2;
        let set = WindingSet::from_fill_rule(0, 4, &rule, false);
        assert!(!set.has(1));
        assert!(set.has(2));
        assert!(set.has(4));
        assert!(!set.has(5));
    }
}
