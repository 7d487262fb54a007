//! Arena node representation.

use smallvec::SmallVec;

use crate::children::Children;
use crate::error::RaxError;

/// Index into the tree's node arena.
///
/// Nodes are addressed by slab index rather than by pointer, so a named
/// type reads call sites as tree operations instead of index arithmetic.
/// A `u32` caps a single tree at ~4 billion live nodes, which halves the
/// size of every child-edge entry relative to a `usize`/pointer.
pub(crate) type NodeId = u32;

/// Inline capacity for a node's compressed edge label.
///
/// Sized so `Node` lands on a couple of cache lines next to its value and
/// child list before the label spills to the heap.
pub(crate) const COMPRESSION_INLINE: usize = 23;

/// The largest edge label a single node may carry.
///
/// Mirrors the 29-bit size field real compressed radix tree nodes pack
/// their child count and compressed-length into; we don't bit-pack the
/// struct itself (see the crate-level docs), but a chain longer than this
/// still has to be represented as a sequence of maximally sized nodes to
/// keep the field meaning stable regardless of representation.
pub(crate) const MAX_COMPRESSED_LEN: usize = (1 << 29) - 1;

/// How a node's stored compression compares against a candidate key
/// remainder during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompResult {
    /// The node's entire compression matched, and the key had more bytes
    /// left (or exactly none) — descent continues from this node.
    Full,
    /// The key ran out exactly at the end of the node's compression.
    Exact,
    /// The key and the node's compression diverge after `common` matching
    /// bytes, strictly inside the compression.
    Diverge { common: usize },
}

/// A single arena-resident node.
///
/// One unified shape serves as both a "branch" and a "compressed" node —
/// `compression` plus `children` live on the same struct rather than a
/// tagged enum of two node kinds, since no bit needs to distinguish
/// compressed-vs-branch when every node can carry both a non-empty
/// compression and a child set at once.
///
/// `value: Option<V>` collapses "is this a key" and "is a value present"
/// into one optional slot: `None` means the path to this node is not a
/// stored key, `Some(v)` means it is, with value `v`.
#[derive(Debug, Clone)]
pub(crate) struct Node<V> {
    pub(crate) compression: SmallVec<[u8; COMPRESSION_INLINE]>,
    pub(crate) value: Option<V>,
    pub(crate) children: Children,
}

impl<V> Node<V> {
    /// A node with an empty compression and no children, used for the
    /// tree's root. Never allocates: an empty label never spills past the
    /// inline capacity.
    pub(crate) fn empty_leaf(value: Option<V>) -> Self {
        Node {
            compression: SmallVec::new(),
            value,
            children: Children::default(),
        }
    }

    /// Builds a leaf node whose compression is a copy of `compression`.
    /// Fallible: `compression` may be long enough to spill past the inline
    /// capacity and need a heap allocation.
    pub(crate) fn try_new_leaf(compression: &[u8], value: Option<V>) -> Result<Self, RaxError> {
        Ok(Node {
            compression: try_compression_from_slice(compression)?,
            value,
            children: Children::default(),
        })
    }

    pub(crate) fn is_key(&self) -> bool {
        self.value.is_some()
    }

    /// A node with no children is, by definition, a leaf of the tree
    /// (descent can go no further), regardless of whether it is a key.
    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Compares our stored compression against `key_rest`, the portion of
    /// the lookup key remaining once the caller has consumed everything up
    /// to this node.
    pub(crate) fn compare_key(&self, key_rest: &[u8]) -> CompResult {
        let common = common_len(&self.compression, key_rest);
        if common < self.compression.len() {
            CompResult::Diverge { common }
        } else if common == key_rest.len() {
            CompResult::Exact
        } else {
            CompResult::Full
        }
    }
}

/// Length of the shared prefix between two byte slices.
pub(crate) fn common_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Copies `bytes` into a freshly built compression buffer, reporting
/// `RaxError::OutOfMemory` instead of aborting if growing past the inline
/// capacity fails. Every split/merge/chain-building path that constructs a
/// node's edge label from scratch goes through this rather than
/// `SmallVec::from_slice` directly, so a long edge label (anything beyond
/// `COMPRESSION_INLINE` bytes) can fail cleanly instead of aborting the
/// process.
pub(crate) fn try_compression_from_slice(
    bytes: &[u8],
) -> Result<SmallVec<[u8; COMPRESSION_INLINE]>, RaxError> {
    let mut v: SmallVec<[u8; COMPRESSION_INLINE]> = SmallVec::new();
    v.try_reserve(bytes.len()).map_err(|_| RaxError::OutOfMemory)?;
    v.extend_from_slice(bytes);
    Ok(v)
}
