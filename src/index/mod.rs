//! Per-reference interval search tree.
//!
//! The tree is a binary search tree ordered by interval start, balanced at build
//! time by always choosing the median as subtree root. It is immutable once built
//! or loaded. Each node is additionally annotated with the largest end coordinate
//! in its subtree so that a search can skip subtrees that end before the query.
//!
//! Nodes live in an arena in pre-order, which is also the persisted order (see
//! [`codec`]). Build, load and search are all iterative.

pub mod codec;

use crate::range::Range;

/// An indexed interval and the locator of its payload in the data section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub interval: Range,
    pub payload: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IntervalNode {
    pub(crate) entry: IndexEntry,
    pub(crate) left: Option<u32>,
    pub(crate) right: Option<u32>,
    /// Largest `interval.to()` in this node's subtree.
    pub(crate) max_end: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntervalSearchTree {
    nodes: Vec<IntervalNode>,
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl IntervalSearchTree {
    /// Build a balanced tree. Entries are ordered by `(start, end)`; entries that
    /// tie keep their input order.
    pub fn build(mut entries: Vec<IndexEntry>) -> Self {
        entries.sort_by_key(|e| (e.interval.from(), e.interval.to()));

        let mut nodes: Vec<IntervalNode> = Vec::with_capacity(entries.len());
        // (lo, hi, parent slot) over the sorted entries, half-open.
        let mut pending: Vec<(usize, usize, Option<(usize, Side)>)> = Vec::new();
        if !entries.is_empty() {
            pending.push((0, entries.len(), None));
        }

        while let Some((lo, hi, parent)) = pending.pop() {
            let mid = lo + (hi - lo) / 2;
            let index = nodes.len();
            let entry = entries[mid];
            nodes.push(IntervalNode {
                entry,
                left: None,
                right: None,
                max_end: entry.interval.to(),
            });
            link(&mut nodes, parent, index);

            // Right pushed first so the left subtree is laid out first: pre-order.
            if mid + 1 < hi {
                pending.push((mid + 1, hi, Some((index, Side::Right))));
            }
            if lo < mid {
                pending.push((lo, mid, Some((index, Side::Left))));
            }
        }

        let mut tree = Self { nodes };
        tree.annotate_max_end();
        tree
    }

    /// Wrap nodes decoded in pre-order. Link structure is trusted to be
    /// consistent; ordering is checked by [`IntervalSearchTree::is_ordered`].
    pub(crate) fn from_preorder(nodes: Vec<IntervalNode>) -> Self {
        let mut tree = Self { nodes };
        tree.annotate_max_end();
        tree
    }

    pub(crate) fn nodes(&self) -> &[IntervalNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth of the deepest node; zero for an empty tree.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack: Vec<(u32, usize)> = Vec::new();
        if !self.nodes.is_empty() {
            stack.push((0, 1));
        }
        while let Some((index, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            let node = &self.nodes[index as usize];
            stack.extend(node.left.map(|c| (c, depth + 1)));
            stack.extend(node.right.map(|c| (c, depth + 1)));
        }
        deepest
    }

    /// Every entry whose interval intersects `query`, in ascending start order.
    pub fn search(&self, query: Range) -> Vec<IndexEntry> {
        let mut hits = Vec::new();
        let mut stack: Vec<u32> = Vec::new();
        let mut current = if self.nodes.is_empty() { None } else { Some(0u32) };

        loop {
            while let Some(index) = current {
                let node = &self.nodes[index as usize];
                if node.max_end < query.from() {
                    // Nothing in this subtree reaches the query.
                    current = None;
                    break;
                }
                stack.push(index);
                current = node.left;
            }

            let Some(index) = stack.pop() else {
                break;
            };
            let node = &self.nodes[index as usize];
            if node.entry.interval.from() > query.to() {
                // In-order from here on, every start is at least this one.
                break;
            }
            if node.entry.interval.to() >= query.from() {
                hits.push(node.entry);
            }
            current = node.right;
        }

        hits
    }

    /// All entries in ascending start order.
    pub fn entries(&self) -> Vec<IndexEntry> {
        let mut out = Vec::with_capacity(self.nodes.len());
        self.walk_in_order(|entry| out.push(*entry));
        out
    }

    /// Whether an in-order walk yields non-decreasing starts.
    pub(crate) fn is_ordered(&self) -> bool {
        let mut previous: Option<u64> = None;
        let mut ordered = true;
        self.walk_in_order(|entry| {
            let start = entry.interval.from();
            if previous.is_some_and(|p| p > start) {
                ordered = false;
            }
            previous = Some(start);
        });
        ordered
    }

    fn walk_in_order(&self, mut visit: impl FnMut(&IndexEntry)) {
        let mut stack: Vec<u32> = Vec::new();
        let mut current = if self.nodes.is_empty() { None } else { Some(0u32) };
        loop {
            while let Some(index) = current {
                stack.push(index);
                current = self.nodes[index as usize].left;
            }
            let Some(index) = stack.pop() else {
                break;
            };
            let node = &self.nodes[index as usize];
            visit(&node.entry);
            current = node.right;
        }
    }

    fn annotate_max_end(&mut self) {
        // Pre-order puts every child after its parent, so a reverse sweep sees
        // children first.
        for index in (0..self.nodes.len()).rev() {
            let node = &self.nodes[index];
            let mut max_end = node.entry.interval.to();
            for child in [node.left, node.right].into_iter().flatten() {
                max_end = max_end.max(self.nodes[child as usize].max_end);
            }
            self.nodes[index].max_end = max_end;
        }
    }
}

fn link(nodes: &mut [IntervalNode], parent: Option<(usize, Side)>, child: usize) {
    if let Some((parent, side)) = parent {
        let child = Some(child as u32);
        match side {
            Side::Left => nodes[parent].left = child,
            Side::Right => nodes[parent].right = child,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(from: u64, to: u64, payload: u64) -> IndexEntry {
        IndexEntry {
            interval: Range::new(from, to).unwrap(),
            payload,
        }
    }

    fn brute_force(entries: &[IndexEntry], query: Range) -> Vec<u64> {
        let mut hits: Vec<u64> = entries
            .iter()
            .filter(|e| e.interval.intersects(&query))
            .map(|e| e.payload)
            .collect();
        hits.sort_unstable();
        hits
    }

    fn payloads(hits: Vec<IndexEntry>) -> Vec<u64> {
        let mut p: Vec<u64> = hits.into_iter().map(|e| e.payload).collect();
        p.sort_unstable();
        p
    }

    #[test]
    fn test_empty_tree() {
        let tree = IntervalSearchTree::build(vec![]);
        assert!(tree.is_empty());
        assert_eq!(tree.depth(), 0);
        assert!(tree.search(Range::new(1, 100).unwrap()).is_empty());
    }

    #[test]
    fn test_search_finds_long_interval_left_of_root() {
        // The long interval sorts first but reaches far to the right.
        let entries = vec![
            entry(1, 1000, 0),
            entry(10, 20, 1),
            entry(30, 40, 2),
            entry(50, 60, 3),
            entry(70, 80, 4),
        ];
        let tree = IntervalSearchTree::build(entries);
        let hits = tree.search(Range::new(75, 90).unwrap());
        assert_eq!(payloads(hits), vec![0, 4]);
    }

    #[test]
    fn test_results_in_start_order() {
        let entries = vec![
            entry(50, 60, 0),
            entry(5, 100, 1),
            entry(20, 25, 2),
            entry(20, 22, 3),
            entry(55, 56, 4),
        ];
        let tree = IntervalSearchTree::build(entries);
        let starts: Vec<u64> = tree
            .search(Range::new(1, 200).unwrap())
            .iter()
            .map(|e| e.interval.from())
            .collect();
        assert_eq!(starts, vec![5, 20, 20, 50, 55]);
    }

    #[test]
    fn test_build_is_balanced() {
        let entries: Vec<IndexEntry> = (0..1023).map(|i| entry(i * 10 + 1, i * 10 + 5, i)).collect();
        let tree = IntervalSearchTree::build(entries);
        assert_eq!(tree.len(), 1023);
        assert_eq!(tree.depth(), 10);
        assert!(tree.is_ordered());
    }

    #[test]
    fn test_search_matches_brute_force_regardless_of_order() {
        let mut seed: u64 = 42;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            seed >> 33
        };

        let mut entries: Vec<IndexEntry> = (0..400)
            .map(|i| {
                let from = 1 + next() % 5000;
                let width = next() % 300;
                entry(from, from + width, i)
            })
            .collect();

        let forward = IntervalSearchTree::build(entries.clone());
        entries.reverse();
        let reversed = IntervalSearchTree::build(entries.clone());

        for _ in 0..200 {
            let from = 1 + next() % 5500;
            let query = Range::new(from, from + next() % 400).unwrap();
            let expected = brute_force(&entries, query);
            assert_eq!(payloads(forward.search(query)), expected);
            assert_eq!(payloads(reversed.search(query)), expected);
        }
    }

    #[test]
    fn test_entries_round_trip_order() {
        let tree = IntervalSearchTree::build(vec![entry(30, 31, 0), entry(10, 11, 1), entry(20, 21, 2)]);
        let froms: Vec<u64> = tree.entries().iter().map(|e| e.interval.from()).collect();
        assert_eq!(froms, vec![10, 20, 30]);
    }
}
