//! Coverage bookkeeping: which positions of a reference have already been fetched.

use crate::range::Range;

/// Sorted set of disjoint, non-adjacent ranges.
///
/// Inserting a range that overlaps or touches existing entries coalesces them
/// into a single entry, so two consecutive entries are always separated by a
/// gap of at least one position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<Range>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Record `range` as covered, merging with every entry it overlaps or abuts.
    pub fn mark_covered(&mut self, range: Range) {
        // First entry that ends at or after the position just before `range`.
        let lo = self
            .ranges
            .partition_point(|r| r.to().saturating_add(1) < range.from());
        // One past the last entry that starts at or before the position just after `range`.
        let hi = self
            .ranges
            .partition_point(|r| r.from() <= range.to().saturating_add(1));

        let merged = self.ranges[lo..hi]
            .iter()
            .fold(range, |acc, r| acc.union(r));

        self.ranges.splice(lo..hi, [merged]);
    }

    /// Sub-ranges of `query` not yet covered, sorted and disjoint.
    pub fn missing_from(&self, query: Range) -> Vec<Range> {
        let lo = self.ranges.partition_point(|r| r.to() < query.from());
        let hi = self.ranges.partition_point(|r| r.from() <= query.to());

        let mut missing = Vec::new();
        let mut cursor = query.from();

        for covered in &self.ranges[lo..hi] {
            if cursor < covered.from() {
                missing.push(Range::new_unchecked(cursor, covered.from() - 1));
            }
            match covered.to().checked_add(1) {
                Some(next) => cursor = cursor.max(next),
                None => return missing,
            }
        }

        if cursor <= query.to() {
            missing.push(Range::new_unchecked(cursor, query.to()));
        }

        missing
    }

    /// True when every position of `query` is covered.
    pub fn covers(&self, query: Range) -> bool {
        self.missing_from(query).is_empty()
    }

    /// True when any position of `query` is covered.
    pub fn intersects(&self, query: Range) -> bool {
        let lo = self.ranges.partition_point(|r| r.to() < query.from());
        self.ranges
            .get(lo)
            .is_some_and(|r| r.from() <= query.to())
    }
}
