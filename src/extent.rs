//! Half-open sample intervals, possibly unbounded on either side.
//!
//! An [`Extent`] answers "when does this stream exist". Every processing
//! element reports one, and combinators derive theirs purely from their
//! children's extents, without rendering anything.

use core::fmt;

/// A half-open interval `[start, end)` of absolute sample indices.
///
/// `None` on either side means the stream is unbounded in that direction.
/// When both bounds are present, `start <= end` always holds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Extent {
    start: Option<i64>,
    end: Option<i64>,
}

impl Extent {
    /// Create an extent. If both bounds are present and `end < start`, the
    /// result is the empty extent at `start`.
    pub fn new(start: Option<i64>, end: Option<i64>) -> Self {
        let end = match (start, end) {
            (Some(s), Some(e)) if e < s => Some(s),
            _ => end,
        };
        Self { start, end }
    }

    /// `[start, end)`, both bounds finite.
    pub fn finite(start: i64, end: i64) -> Self {
        Self::new(Some(start), Some(end))
    }

    /// `(-inf, inf)`
    pub fn unbounded() -> Self {
        Self { start: None, end: None }
    }

    /// `[start, inf)`
    pub fn starting_at(start: i64) -> Self {
        Self { start: Some(start), end: None }
    }

    /// `[0, 0)`
    pub fn empty() -> Self {
        Self::finite(0, 0)
    }

    #[inline]
    pub fn start(&self) -> Option<i64> {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Option<i64> {
        self.end
    }

    /// `end - start`, defined only when both bounds are finite.
    #[inline]
    pub fn duration(&self) -> Option<i64> {
        Some(self.end? - self.start?)
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.duration() == Some(0)
    }

    #[inline]
    pub fn contains(&self, t: i64) -> bool {
        self.start.map_or(true, |s| t >= s) && self.end.map_or(true, |e| t < e)
    }

    /// Narrow to the overlap of both extents.
    ///
    /// Disjoint extents intersect to an empty extent.
    pub fn intersection(&self, other: &Extent) -> Extent {
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Extent::new(start, end)
    }

    /// Widen to cover both extents. Empty extents are the identity.
    pub fn union(&self, other: &Extent) -> Extent {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            _ => None,
        };
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        Extent::new(start, end)
    }

    /// Shift both bounds by `n` samples.
    pub fn offset(&self, n: i64) -> Extent {
        Extent {
            start: self.start.map(|s| s + n),
            end: self.end.map(|e| e + n),
        }
    }

    /// The part of the window `[start, start + count)` covered by this
    /// extent, as `(first_frame, frames)` relative to the window.
    pub fn overlap(&self, start: i64, count: usize) -> Option<(usize, usize)> {
        let window = Extent::finite(start, start + count as i64);
        let hit = window.intersection(self);
        match (hit.start, hit.end) {
            (Some(s), Some(e)) if e > s => Some(((s - start) as usize, (e - s) as usize)),
            _ => None,
        }
    }
}

impl Default for Extent {
    fn default() -> Self {
        Extent::unbounded()
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(s) => write!(f, "[{}", s)?,
            None => write!(f, "(-inf")?,
        }
        match self.end {
            Some(e) => write!(f, ", {})", e),
            None => write!(f, ", inf)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bound() -> impl Strategy<Value = Option<i64>> {
        prop_oneof![Just(None), (-10_000i64..10_000).prop_map(Some)]
    }

    fn any_extent() -> impl Strategy<Value = Extent> {
        (bound(), bound()).prop_map(|(a, b)| Extent::new(a, b))
    }

    #[test]
    fn duration_requires_both_bounds() {
        assert_eq!(Extent::finite(10, 25).duration(), Some(15));
        assert_eq!(Extent::starting_at(3).duration(), None);
        assert_eq!(Extent::new(None, Some(3)).duration(), None);
    }

    #[test]
    fn reversed_bounds_collapse_to_empty() {
        let e = Extent::finite(10, 4);
        assert!(e.is_empty());
        assert_eq!(e.start(), Some(10));
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let a = Extent::finite(0, 10);
        let b = Extent::finite(20, 30);
        assert!(a.intersection(&b).is_empty());
    }

    #[test]
    fn union_fills_gaps_and_propagates_open_bounds() {
        let a = Extent::finite(0, 10);
        let b = Extent::finite(20, 30);
        assert_eq!(a.union(&b), Extent::finite(0, 30));
        assert_eq!(a.union(&Extent::starting_at(5)), Extent::starting_at(0));
    }

    #[test]
    fn overlap_reports_window_relative_frames() {
        let e = Extent::finite(100, 200);
        assert_eq!(e.overlap(50, 100), Some((50, 50)));
        assert_eq!(e.overlap(150, 10), Some((0, 10)));
        assert_eq!(e.overlap(190, 64), Some((0, 10)));
        assert_eq!(e.overlap(200, 64), None);
        assert_eq!(Extent::unbounded().overlap(-5, 3), Some((0, 3)));
    }

    #[test]
    fn display_marks_open_sides() {
        assert_eq!(Extent::finite(1, 2).to_string(), "[1, 2)");
        assert_eq!(Extent::unbounded().to_string(), "(-inf, inf)");
    }

    proptest! {
        #[test]
        fn intersection_is_idempotent(a in any_extent()) {
            prop_assert_eq!(a.intersection(&a), a);
        }

        #[test]
        fn union_with_zero_offset_is_identity(a in any_extent()) {
            prop_assert_eq!(a.union(&a.offset(0)), a);
        }

        #[test]
        fn bounds_stay_ordered(a in any_extent(), b in any_extent(), n in -500i64..500) {
            for e in [a.intersection(&b), a.union(&b), a.offset(n)] {
                if let (Some(s), Some(t)) = (e.start(), e.end()) {
                    prop_assert!(s <= t);
                }
            }
        }

        #[test]
        fn intersection_is_commutative(a in any_extent(), b in any_extent()) {
            let ab = a.intersection(&b);
            let ba = b.intersection(&a);
            prop_assert_eq!(ab.is_empty(), ba.is_empty());
            if !ab.is_empty() {
                prop_assert_eq!(ab, ba);
            }
        }
    }
}
