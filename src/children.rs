//! Sorted child-edge storage for a single node.
//!
//! Two parallel `SmallVec`s keep radix bytes next to node handles so a
//! descent only has to scan/binary-search the short byte array. Both
//! vectors are kept sorted by radix byte at all times, which is what lets
//! a branch node support binary-search descent and in-order iteration.

use smallvec::SmallVec;

use crate::error::RaxError;
use crate::node::NodeId;

/// Inline capacity for a node's child list before it spills to the heap.
///
/// Byte strings in practice rarely branch into more than a handful of
/// children at once, so a `SmallVec` with a small inline width captures the
/// common case while still spilling cleanly to the heap for wide branches.
pub(crate) const CHILDREN_INLINE: usize = 10;

/// The sorted set of outgoing edges from a branch node.
///
/// Both vectors are always the same length and sorted in parallel by the
/// first vector's radix byte, so `radixes[k]` is the edge byte leading to
/// `children[k]`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Children {
    radixes: SmallVec<[u8; CHILDREN_INLINE]>,
    children: SmallVec<[NodeId; CHILDREN_INLINE]>,
}

impl Children {
    pub(crate) fn is_empty(&self) -> bool {
        self.radixes.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.radixes.len()
    }

    /// Finds the child reached by `radix`, if any.
    pub(crate) fn find(&self, radix: u8) -> Option<NodeId> {
        self.radixes
            .binary_search(&radix)
            .ok()
            .map(|i| self.children[i])
    }

    /// Inserts or overwrites the edge for `radix`, keeping both vectors
    /// sorted. Returns `RaxError::OutOfMemory` if growing the backing
    /// storage fails.
    pub(crate) fn insert(&mut self, radix: u8, child: NodeId) -> Result<(), RaxError> {
        match self.radixes.binary_search(&radix) {
            Ok(i) => {
                self.children[i] = child;
                Ok(())
            }
            Err(i) => {
                // `try_reserve` is a no-op when inline capacity still covers
                // the next push, so this is cheap in the common case.
                self.radixes
                    .try_reserve(1)
                    .map_err(|_| RaxError::OutOfMemory)?;
                self.children
                    .try_reserve(1)
                    .map_err(|_| RaxError::OutOfMemory)?;
                self.radixes.insert(i, radix);
                self.children.insert(i, child);
                Ok(())
            }
        }
    }

    /// Removes the edge for `radix`, if present, preserving order of the
    /// remainder.
    pub(crate) fn remove(&mut self, radix: u8) -> Option<NodeId> {
        let i = self.radixes.binary_search(&radix).ok()?;
        self.radixes.remove(i);
        Some(self.children.remove(i))
    }

    /// If exactly one edge exists, returns it.
    pub(crate) fn single(&self) -> Option<(u8, NodeId)> {
        if self.radixes.len() == 1 {
            Some((self.radixes[0], self.children[0]))
        } else {
            None
        }
    }

    pub(crate) fn first(&self) -> Option<(u8, NodeId)> {
        self.radixes.first().copied().zip(self.children.first().copied())
    }

    pub(crate) fn last(&self) -> Option<(u8, NodeId)> {
        self.radixes.last().copied().zip(self.children.last().copied())
    }

    /// The smallest edge strictly greater than `radix`, for ascending
    /// sibling steps during iteration.
    pub(crate) fn next_after(&self, radix: u8) -> Option<(u8, NodeId)> {
        let start = match self.radixes.binary_search(&radix) {
            Ok(i) => i + 1,
            Err(i) => i,
        };
        self.radixes
            .get(start)
            .copied()
            .zip(self.children.get(start).copied())
    }

    /// The largest edge strictly less than `radix`, for descending sibling
    /// steps during iteration.
    pub(crate) fn prev_before(&self, radix: u8) -> Option<(u8, NodeId)> {
        let idx = match self.radixes.binary_search(&radix) {
            Ok(i) => i,
            Err(i) => i,
        };
        if idx == 0 {
            return None;
        }
        let i = idx - 1;
        Some((self.radixes[i], self.children[i]))
    }

    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = (u8, NodeId)> + '_ {
        self.radixes.iter().copied().zip(self.children.iter().copied())
    }

    /// The edge byte leading to `target`, if `target` is one of our
    /// children. Used by removal to find the byte to unlink without the
    /// caller having to track it separately.
    pub(crate) fn edge_to(&self, target: NodeId) -> Option<u8> {
        self.children
            .iter()
            .position(|&c| c == target)
            .map(|i| self.radixes[i])
    }
}
