//! A path-compressed radix tree (a "rax") mapping byte strings to values.
//!
//! Keys are arbitrary `&[u8]` byte strings with no duplicates; values are
//! caller-chosen `V`. Common runs of bytes along a single child chain are
//! stored once on the chain's first node instead of one byte per node, the
//! same compression real compressed radix trees use to keep long shared
//! prefixes cheap. Lookup, insertion and removal are all O(key length)
//! regardless of how many keys the tree holds.
//!
//! The engine ([`RadixTree`]) is generic over the stored value. A
//! [`BytesRadixTree`] convenience wrapper around `RadixTree<bytes::Bytes>`
//! is also provided for callers who, like most users of this kind of
//! structure, are storing byte-string values too.
//!
//! # Example
//!
//! ```
//! use raxide::RadixTree;
//!
//! let mut tree = RadixTree::new();
//! tree.insert(b"foo", 1).unwrap();
//! tree.insert(b"foobar", 2).unwrap();
//! tree.insert(b"footer", 3).unwrap();
//!
//! assert_eq!(tree.get(b"foo"), Some(&1));
//! assert_eq!(tree.get(b"missing"), None);
//!
//! let mut it = tree.iter();
//! assert!(it.next(&tree).unwrap());
//! assert_eq!(it.current(&tree), Some((b"foo".as_slice(), &1)));
//! ```

mod children;
mod error;
mod insert;
mod iter;
mod node;
mod remove;
mod walk;

pub use error::RaxError;
pub use insert::InsertOutcome;
pub use iter::{RaxIterator, SeekOp};

use bytes::Bytes;
use node::{Node, NodeId};
use slab::Slab;

/// A path-compressed radix tree mapping byte-string keys to values of type
/// `V`.
///
/// Nodes live in a `Slab<Node<V>>` arena and are addressed by index rather
/// than by pointer, so a node never has to patch the address another node
/// holds for it when it grows or shrinks (see `DESIGN.md` for the fuller
/// rationale).
pub struct RadixTree<V> {
    pub(crate) nodes: Slab<Node<V>>,
    pub(crate) root: NodeId,
    num_keys: usize,
}

impl<V> Default for RadixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RadixTree<V> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        let mut nodes = Slab::new();
        let root = nodes.insert(Node::empty_leaf(None)) as NodeId;
        RadixTree {
            nodes,
            root,
            num_keys: 0,
        }
    }

    /// Number of keys stored.
    pub fn len(&self) -> usize {
        self.num_keys
    }

    /// Alias for [`RadixTree::len`] returning a `u64`, for callers that
    /// want a fixed-width count regardless of the host's `usize`.
    pub fn size(&self) -> u64 {
        self.num_keys as u64
    }

    pub fn is_empty(&self) -> bool {
        self.num_keys == 0
    }

    /// Number of arena nodes backing the tree (always `>= 1`, for the
    /// root). Mostly useful for tests and capacity introspection.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Looks up `key`, returning its value if present.
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        let w = walk::walk(&self.nodes, self.root, key, None).ok()?;
        let node = &self.nodes[w.node as usize];
        if w.j == key.len() && w.i == node.compression.len() {
            node.value.as_ref()
        } else {
            None
        }
    }

    /// Alias for [`RadixTree::get`].
    pub fn find(&self, key: &[u8]) -> Option<&V> {
        self.get(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Inserts `key` with `value`, overwriting any existing value and
    /// returning it.
    ///
    /// # Errors
    ///
    /// Returns `RaxError::OutOfMemory` if growing a node's children, edge
    /// label, or an internal traversal stack fails.
    pub fn insert(&mut self, key: &[u8], value: V) -> Result<InsertOutcome<'_, V>, RaxError> {
        insert::insert(&mut self.nodes, self.root, &mut self.num_keys, key, value, true)
    }

    /// Like [`RadixTree::insert`], but leaves an existing value in place
    /// and reports it via `InsertOutcome::AlreadyExists` instead of
    /// overwriting it.
    pub fn try_insert(&mut self, key: &[u8], value: V) -> Result<InsertOutcome<'_, V>, RaxError> {
        insert::insert(&mut self.nodes, self.root, &mut self.num_keys, key, value, false)
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &[u8]) -> Option<V> {
        remove::remove(&mut self.nodes, self.root, &mut self.num_keys, key)
    }

    /// Removes every key starting with `prefix`, returning how many were
    /// removed. Excises the whole matching subtree in one pass rather than
    /// walking and deleting each key individually.
    pub fn remove_prefix(&mut self, prefix: &[u8]) -> usize {
        remove::remove_prefix(&mut self.nodes, self.root, &mut self.num_keys, prefix)
    }

    /// An unsafe-mode (cached-path) cursor positioned before the first
    /// key. Call [`RaxIterator::next`]/[`RaxIterator::prev`] or a `seek`,
    /// passing `self` to each call, to position it.
    ///
    /// The returned cursor does not borrow `self`: nothing stops the tree
    /// from being mutated while a cursor exists, which is what lets the
    /// safe-mode cursor (see [`RadixTree::iter_safe`]) actually honor the
    /// "mutate between steps" contract `spec.md` describes. An unsafe-mode
    /// cursor simply documents that doing so invalidates its cached path
    /// (see [`RaxIterator`]'s docs) rather than having the type system
    /// refuse to compile the interleaving outright.
    pub fn iter(&self) -> RaxIterator {
        RaxIterator::new(self.root)
    }

    /// A safe-mode cursor: see [`RaxIterator`]'s documentation for the
    /// tradeoff against [`RadixTree::iter`].
    pub fn iter_safe(&self) -> RaxIterator {
        let mut it = RaxIterator::new(self.root);
        it.make_safe();
        it
    }

    /// Removes every key, freeing all nodes but the root.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = self.nodes.insert(Node::empty_leaf(None)) as NodeId;
        self.num_keys = 0;
    }

    /// Walks every live node once, folding a derived value (its arena
    /// index plus its compressed edge length) into a running sum.
    ///
    /// Exists purely to force a full traversal of every node's memory for
    /// profiling (cache-miss counting, `perf`, flamegraphs), not as part of
    /// the semantic contract. The return value is deliberately derived from
    /// both the index and the edge length so the optimizer cannot fold the
    /// traversal away.
    pub fn touch(&self) -> u64 {
        let mut sum = 0u64;
        let mut stack = vec![self.root];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx as usize];
            sum = sum
                .wrapping_add(idx as u64)
                .wrapping_add(node.compression.len() as u64);
            stack.extend(node.children.iter().map(|(_, child)| child));
        }
        sum
    }

    /// Consumes the tree, calling `callback` once for each stored value.
    /// Useful when `V` needs explicit cleanup beyond `Drop` (closing
    /// handles, releasing pooled buffers, and so on).
    pub fn free_with_callback(self, mut callback: impl FnMut(V)) {
        for (_, node) in self.nodes {
            if let Some(value) = node.value {
                callback(value);
            }
        }
    }
}

/// A convenience wrapper around `RadixTree<Bytes>` exposing a
/// `get`/`set`/`del`/`getn`/`deln` surface for callers storing byte-string
/// values who don't need a generic `V`.
#[derive(Default)]
pub struct BytesRadixTree {
    inner: RadixTree<Bytes>,
}

impl BytesRadixTree {
    pub fn new() -> Self {
        BytesRadixTree {
            inner: RadixTree::new(),
        }
    }

    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.inner.get(key).cloned()
    }

    pub fn set(&mut self, key: &[u8], val: Bytes) -> Result<(), RaxError> {
        self.inner.insert(key, val).map(|_| ())
    }

    pub fn del(&mut self, key: &[u8]) -> Option<Bytes> {
        self.inner.remove(key)
    }

    /// Every key/value pair whose key starts with `prefix`, in ascending
    /// order.
    pub fn getn(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Bytes)> {
        let mut out = Vec::new();
        let mut it = self.inner.iter();
        if !it.seek(&self.inner, SeekOp::Ge, prefix).unwrap_or(false) {
            return out;
        }
        loop {
            match it.current(&self.inner) {
                Some((key, value)) if key.starts_with(prefix) => {
                    out.push((key.to_vec(), value.clone()));
                }
                _ => break,
            }
            if !it.next(&self.inner).unwrap_or(false) {
                break;
            }
        }
        out
    }

    /// Removes every key starting with `prefix`, returning how many were
    /// removed.
    pub fn deln(&mut self, prefix: &[u8]) -> usize {
        self.inner.remove_prefix(prefix)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod test;

#[cfg(test)]
mod proptest_model;
