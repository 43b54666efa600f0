//! Persisted tree section.
//!
//! ```text
//! node count   u32
//! node*        start u64, end u64, payload u64, flags u8   (pre-order)
//! ```
//!
//! Flag bit 0 marks a left child, bit 1 a right child. Because nodes are in
//! pre-order, the whole tree is rebuilt with one sequential pass and a stack of
//! unfilled child slots. All integers are big-endian.

use super::{IndexEntry, IntervalNode, IntervalSearchTree, Side, link};
use crate::range::Range;
use crate::{Error, Result};
use bytes::{Buf, BufMut};

pub const NODE_LEN: usize = 8 + 8 + 8 + 1;

const HAS_LEFT: u8 = 0b01;
const HAS_RIGHT: u8 = 0b10;

/// Bytes needed to encode a tree of `node_count` nodes.
pub fn encoded_len(node_count: usize) -> usize {
    4 + node_count * NODE_LEN
}

pub fn encode_tree<B: BufMut>(tree: &IntervalSearchTree, buf: &mut B) {
    buf.put_u32(tree.len() as u32);
    for node in tree.nodes() {
        buf.put_u64(node.entry.interval.from());
        buf.put_u64(node.entry.interval.to());
        buf.put_u64(node.entry.payload);
        let mut flags = 0;
        if node.left.is_some() {
            flags |= HAS_LEFT;
        }
        if node.right.is_some() {
            flags |= HAS_RIGHT;
        }
        buf.put_u8(flags);
    }
}

/// Read the node count that prefixes a tree section.
pub fn decode_node_count<B: Buf>(buf: &mut B) -> Result<usize> {
    if buf.remaining() < 4 {
        return Err(Error::Format("truncated tree header".to_string()));
    }
    Ok(buf.get_u32() as usize)
}

/// Decode `node_count` nodes following the count prefix.
///
/// `payload_limit` bounds payload offsets; anything at or past it is rejected.
pub fn decode_nodes<B: Buf>(
    buf: &mut B,
    node_count: usize,
    payload_limit: u64,
) -> Result<IntervalSearchTree> {
    if buf.remaining() < node_count * NODE_LEN {
        return Err(Error::Format(format!(
            "tree section truncated: {} nodes need {} bytes, {} available",
            node_count,
            node_count * NODE_LEN,
            buf.remaining()
        )));
    }

    let mut nodes: Vec<IntervalNode> = Vec::with_capacity(node_count);
    // Child slots still waiting for a node, most recent on top.
    let mut open: Vec<Option<(usize, Side)>> = Vec::new();
    if node_count > 0 {
        open.push(None);
    }

    for i in 0..node_count {
        let start = buf.get_u64();
        let end = buf.get_u64();
        let payload = buf.get_u64();
        let flags = buf.get_u8();

        let interval = Range::new(start, end)
            .map_err(|_| Error::Format(format!("node {} has end {} before start {}", i, end, start)))?;
        if payload >= payload_limit {
            return Err(Error::Format(format!(
                "node {} payload offset {} outside data section",
                i, payload
            )));
        }
        if flags & !(HAS_LEFT | HAS_RIGHT) != 0 {
            return Err(Error::Format(format!("node {} has unknown flags {:#04x}", i, flags)));
        }

        let parent = open
            .pop()
            .ok_or_else(|| Error::Format(format!("node {} has no parent slot", i)))?;

        let index = nodes.len();
        nodes.push(IntervalNode {
            entry: IndexEntry { interval, payload },
            left: None,
            right: None,
            max_end: end,
        });
        link(&mut nodes, parent, index);

        if flags & HAS_RIGHT != 0 {
            open.push(Some((index, Side::Right)));
        }
        if flags & HAS_LEFT != 0 {
            open.push(Some((index, Side::Left)));
        }
    }

    if !open.is_empty() {
        return Err(Error::Format(format!(
            "tree section declares {} children that never appear",
            open.len()
        )));
    }

    let tree = IntervalSearchTree::from_preorder(nodes);
    if !tree.is_ordered() {
        return Err(Error::Format("tree is not ordered by start".to_string()));
    }
    Ok(tree)
}

/// Decode a complete tree section (count prefix plus nodes).
pub fn decode_tree<B: Buf>(buf: &mut B, payload_limit: u64) -> Result<IntervalSearchTree> {
    let node_count = decode_node_count(buf)?;
    decode_nodes(buf, node_count, payload_limit)
}
