//! Closed genomic intervals and the interval arithmetic the cache is built on.

use crate::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Closed interval `[from, to]` over 1-based genomic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Range {
    from: u64,
    to: u64,
}

impl Range {
    /// Build a range, rejecting `to < from`.
    pub fn new(from: u64, to: u64) -> Result<Self> {
        if to < from {
            return Err(Error::InvalidRange(format!("{}-{}: end before start", from, to)));
        }
        Ok(Self { from, to })
    }

    /// Range covering a single position.
    pub fn point(position: u64) -> Self {
        Self {
            from: position,
            to: position,
        }
    }

    pub(crate) fn new_unchecked(from: u64, to: u64) -> Self {
        debug_assert!(from <= to);
        Self { from, to }
    }

    pub fn from(&self) -> u64 {
        self.from
    }

    pub fn to(&self) -> u64 {
        self.to
    }

    /// Number of positions covered.
    pub fn width(&self) -> u64 {
        self.to - self.from + 1
    }

    pub fn contains(&self, position: u64) -> bool {
        self.from <= position && position <= self.to
    }

    pub fn intersects(&self, other: &Range) -> bool {
        self.from <= other.to && other.from <= self.to
    }

    /// True when the ranges touch end to end with no gap and no overlap.
    pub fn abuts(&self, other: &Range) -> bool {
        other.to.checked_add(1) == Some(self.from) || self.to.checked_add(1) == Some(other.from)
    }

    pub fn intersection(&self, other: &Range) -> Option<Range> {
        if !self.intersects(other) {
            return None;
        }
        Some(Range::new_unchecked(
            self.from.max(other.from),
            self.to.min(other.to),
        ))
    }

    /// Smallest range spanning both. Callers establish overlap or abutment first.
    pub fn union(&self, other: &Range) -> Range {
        Range::new_unchecked(self.from.min(other.from), self.to.max(other.to))
    }

    /// `self` minus `other`: zero, one or two pieces, left to right.
    pub fn subtract(&self, other: &Range) -> Vec<Range> {
        if !self.intersects(other) {
            return vec![*self];
        }

        let mut pieces = Vec::with_capacity(2);
        if self.from < other.from {
            pieces.push(Range::new_unchecked(self.from, other.from - 1));
        }
        if self.to > other.to {
            pieces.push(Range::new_unchecked(other.to + 1, self.to));
        }
        pieces
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(from: u64, to: u64) -> Range {
        Range::new(from, to).unwrap()
    }

    #[test]
    fn test_new_rejects_inverted() {
        assert!(matches!(Range::new(20, 10), Err(Error::InvalidRange(_))));
        assert_eq!(r(5, 5).width(), 1);
    }

    #[test]
    fn test_subtract_right_overlap() {
        assert_eq!(r(10, 20).subtract(&r(15, 25)), vec![r(10, 14)]);
    }

    #[test]
    fn test_subtract_disjoint() {
        assert_eq!(r(10, 20).subtract(&r(5, 8)), vec![r(10, 20)]);
    }

    #[test]
    fn test_subtract_covering() {
        assert!(r(10, 20).subtract(&r(5, 25)).is_empty());
        assert!(r(10, 20).subtract(&r(10, 20)).is_empty());
    }

    #[test]
    fn test_subtract_left_overlap() {
        assert_eq!(r(10, 20).subtract(&r(5, 12)), vec![r(13, 20)]);
    }

    #[test]
    fn test_subtract_interior() {
        assert_eq!(r(10, 20).subtract(&r(12, 17)), vec![r(10, 11), r(18, 20)]);
    }

    #[test]
    fn test_subtract_reconstructs() {
        let base = r(10, 20);
        for from in 1..30 {
            for to in from..30 {
                let cut = r(from, to);
                let pieces = base.subtract(&cut);
                let mut covered: Vec<u64> = pieces
                    .iter()
                    .inspect(|p| assert!(p.from() <= p.to()))
                    .flat_map(|p| p.from()..=p.to())
                    .collect();
                if let Some(common) = base.intersection(&cut) {
                    covered.extend(common.from()..=common.to());
                }
                covered.sort_unstable();
                assert_eq!(covered, (10..=20).collect::<Vec<_>>(), "cut {}", cut);
            }
        }
    }

    #[test]
    fn test_abuts() {
        assert!(r(100, 199).abuts(&r(200, 299)));
        assert!(r(200, 299).abuts(&r(100, 199)));
        assert!(!r(100, 199).abuts(&r(201, 299)));
        assert!(!r(100, 200).abuts(&r(200, 299)));
    }

    #[test]
    fn test_union_and_intersection() {
        assert_eq!(r(100, 199).union(&r(200, 299)), r(100, 299));
        assert_eq!(r(1, 10).intersection(&r(5, 20)), Some(r(5, 10)));
        assert_eq!(r(1, 10).intersection(&r(11, 20)), None);
    }
}
