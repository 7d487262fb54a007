//! The shared traversal core used by lookup, insertion and removal.

use smallvec::SmallVec;

use crate::error::RaxError;
use crate::node::{CompResult, Node, NodeId};
use slab::Slab;

/// Ancestor chain recorded while descending the tree, for operations that
/// need to walk back up afterwards (removal and the iterator).
///
/// Nodes carry no parent pointer, so any upward walk needs this recorded
/// separately. A fixed-size inline buffer of 32 slots covers the common
/// case before spilling to the heap, and a sticky out-of-memory latch:
/// once growing the stack fails, `oom` stays set so the caller can abort
/// the walk instead of silently truncating the ancestor chain.
#[derive(Debug, Default)]
pub(crate) struct ParentStack {
    items: SmallVec<[NodeId; 32]>,
    oom: bool,
}

impl ParentStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, node: NodeId) -> Result<(), RaxError> {
        if self.oom {
            return Err(RaxError::OutOfMemory);
        }
        if self.items.try_reserve(1).is_err() {
            self.oom = true;
            return Err(RaxError::OutOfMemory);
        }
        self.items.push(node);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Option<NodeId> {
        self.items.pop()
    }

    pub(crate) fn last(&self) -> Option<NodeId> {
        self.items.last().copied()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn iter(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.items.iter().copied()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.items.truncate(len);
    }

    /// `true` once a growth attempt has failed; the ancestor chain below
    /// this point is no longer trustworthy and the walk should be aborted.
    pub(crate) fn is_oom(&self) -> bool {
        self.oom
    }
}

/// The outcome of walking as far down the tree as `key` allows.
///
/// `node` is the last node reached. `i` is how many bytes of `node`'s own
/// compression matched along the way; `j` is the total number of key bytes
/// consumed to get there (across every node on the path, including `i`).
/// Comparing `i` against `node`'s compression length and `j` against
/// `key.len()` tells a caller which of the three outcomes occurred:
///
/// - `j == key.len() && i == node.compression.len()`: the key is fully
///   accounted for and lands exactly on a node boundary (present iff
///   `node` holds a value).
/// - `i < node.compression.len()`: the key diverges partway through
///   `node`'s own compressed label.
/// - otherwise (`i == node.compression.len() && j < key.len()`): the key
///   diverges because no child edge continues it from `node`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Walk {
    pub(crate) node: NodeId,
    pub(crate) i: usize,
    pub(crate) j: usize,
}

/// Descends from `root` toward `key`, stopping at the first point where
/// the key is exhausted, the node's compression diverges from the key, or
/// no outgoing edge continues the key.
///
/// This single routine replaces the teacher's separate lookahead-then-
/// compare-child steps in `get`/`set`/`del` with one loop that treats every
/// node — including the root — uniformly: a node's own compression is
/// always compared against the remaining key before its children are
/// considered. The teacher skips that comparison for the root specifically
/// (its `get`/`set`/`del` index straight into `root.childs` on the first
/// key byte), which is only safe as long as the root never itself holds a
/// compressed label — an invariant the teacher's own recompression code can
/// quietly violate (see its `// except root since get doesn't handle root
/// with compression` comment). Treating the root like any other node here
/// avoids that latent inconsistency.
pub(crate) fn walk<V>(
    nodes: &Slab<Node<V>>,
    root: NodeId,
    key: &[u8],
    mut stack: Option<&mut ParentStack>,
) -> Result<Walk, RaxError> {
    let mut idx = root;
    let mut consumed = 0usize;
    loop {
        let node = &nodes[idx as usize];
        let key_rest = &key[consumed..];
        match node.compare_key(key_rest) {
            CompResult::Diverge { common } => {
                return Ok(Walk {
                    node: idx,
                    i: common,
                    j: consumed + common,
                });
            }
            CompResult::Exact => {
                return Ok(Walk {
                    node: idx,
                    i: node.compression.len(),
                    j: key.len(),
                });
            }
            CompResult::Full => {
                consumed += node.compression.len();
                match node.children.find(key[consumed]) {
                    Some(child) => {
                        if let Some(stack) = stack.as_deref_mut() {
                            stack.push(idx)?;
                        }
                        idx = child;
                        consumed += 1;
                    }
                    None => {
                        return Ok(Walk {
                            node: idx,
                            i: node.compression.len(),
                            j: consumed,
                        });
                    }
                }
            }
        }
    }
}
