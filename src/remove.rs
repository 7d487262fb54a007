//! Removal logic: unlinking a key and recompressing the nodes left behind.

use smallvec::SmallVec;

use crate::error::RaxError;
use crate::node::{try_compression_from_slice, Node, NodeId, COMPRESSION_INLINE, MAX_COMPRESSED_LEN};
use crate::walk::{walk, ParentStack};
use slab::Slab;

/// Removes `key`, returning its value if it was present.
///
/// Clears the stored value, frees the node if it was a leaf with no other
/// purpose, then recompresses whatever is left. Recompression is attempted
/// unconditionally, including when it reaches the root, since `walk`
/// treats a compressed root the same as any other node.
pub(crate) fn remove<V>(
    nodes: &mut Slab<Node<V>>,
    root: NodeId,
    num_keys: &mut usize,
    key: &[u8],
) -> Option<V> {
    let mut stack = ParentStack::new();
    let w = walk(nodes, root, key, Some(&mut stack)).ok()?;
    let comp_len = nodes[w.node as usize].compression.len();
    if w.j != key.len() || w.i != comp_len {
        return None;
    }

    let target = w.node;
    let old_value = nodes[target as usize].value.take()?;
    *num_keys -= 1;

    let is_leaf = nodes[target as usize].is_leaf();
    if is_leaf && target != root {
        let parent = stack.last().expect("a non-root leaf always has a parent");
        let edge = nodes[parent as usize]
            .children
            .edge_to(target)
            .expect("parent must record an edge to its child");
        nodes.remove(target as usize);
        nodes[parent as usize].children.remove(edge);
        try_recompress(nodes, parent);
    } else {
        try_recompress(nodes, target);
    }

    Some(old_value)
}

/// Absorbs a node's single remaining non-key child into itself, repeating
/// as long as the result still has exactly one non-key child. Splits the
/// merged label back into two nodes if it would exceed
/// `MAX_COMPRESSED_LEN`.
///
/// `spec.md` §5 says delete never allocates except to shrink, and doesn't
/// list `remove` among the operations that report `RaxError` (§7); this is
/// the shrink-only allocation that falls out of that rule. If growing the
/// merged label fails, the merge is simply skipped: the two nodes are left
/// unmerged, which is still a structurally valid (if less compact) tree, so
/// `remove` itself stays infallible rather than surfacing an error its
/// public signature has nowhere to put.
pub(crate) fn try_recompress<V>(nodes: &mut Slab<Node<V>>, node_idx: NodeId) {
    loop {
        let (child_radix, child_id) = {
            let node = &nodes[node_idx as usize];
            if node.value.is_some() {
                return;
            }
            match node.children.single() {
                Some(pair) => pair,
                None => return,
            }
        };

        if let Err(e) = try_recompress_step(nodes, node_idx, child_radix, child_id) {
            log::trace!(
                "recompress: skipping merge of node {node_idx} with child {child_id} ({e})"
            );
            return;
        }
        // Loop again: the absorbed child's own children might now collapse
        // to a single non-key edge too.
    }
}

/// One merge step of [`try_recompress`]: absorbs `child_id` (reached via
/// `child_radix`) into `node_idx`, or reports `RaxError::OutOfMemory`
/// without touching `node_idx` if growing the merged label fails.
fn try_recompress_step<V>(
    nodes: &mut Slab<Node<V>>,
    node_idx: NodeId,
    child_radix: u8,
    child_id: NodeId,
) -> Result<(), RaxError> {
    let node_compression_len = nodes[node_idx as usize].compression.len();
    let child_compression_len = nodes[child_id as usize].compression.len();
    let mut combined: SmallVec<[u8; COMPRESSION_INLINE]> = SmallVec::new();
    combined
        .try_reserve(node_compression_len + 1 + child_compression_len)
        .map_err(|_| RaxError::OutOfMemory)?;
    combined.extend_from_slice(&nodes[node_idx as usize].compression);
    combined.push(child_radix);
    combined.extend_from_slice(&nodes[child_id as usize].compression);

    // `child_id` is only actually removed from the arena once every
    // fallible step below has already succeeded, so a failure here leaves
    // both `node_idx` and `child_id` untouched rather than losing the
    // child's value mid-merge.
    if combined.len() <= MAX_COMPRESSED_LEN {
        let child = nodes.remove(child_id as usize);
        let node = &mut nodes[node_idx as usize];
        node.compression = combined;
        node.value = child.value;
        node.children = child.children;
        log::trace!("recompress: merged node {node_idx} with former child {child_id}");
        Ok(())
    } else {
        let head = try_compression_from_slice(&combined[..MAX_COMPRESSED_LEN])?;
        let rest = try_compression_from_slice(&combined[MAX_COMPRESSED_LEN + 1..])?;
        let edge = combined[MAX_COMPRESSED_LEN];
        let child = nodes.remove(child_id as usize);
        let remainder = Node {
            compression: rest,
            value: child.value,
            children: child.children,
        };
        let remainder_id = nodes.insert(remainder) as NodeId;
        let node = &mut nodes[node_idx as usize];
        node.compression = head;
        node.children = Default::default();
        let _ = node.children.insert(edge, remainder_id);
        log::debug!(
            "recompress: merged label exceeded max compressed length, \
             split node {node_idx} and new node {remainder_id}"
        );
        Ok(())
    }
}

/// Frees every node in the subtree rooted at `idx`, iteratively to avoid
/// recursion depth tracking the key length, returning how many held a
/// value.
fn free_subtree<V>(nodes: &mut Slab<Node<V>>, idx: NodeId) -> usize {
    let mut removed = 0usize;
    let mut stack = vec![idx];
    while let Some(i) = stack.pop() {
        let node = nodes.remove(i as usize);
        if node.value.is_some() {
            removed += 1;
        }
        stack.extend(node.children.iter().map(|(_, child)| child));
    }
    log::trace!("freed subtree rooted at node {idx}: {removed} keys released");
    removed
}

/// Removes every key starting with `prefix`, returning how many were
/// removed. Excises the whole matching subtree in one pass instead of
/// finding and deleting each key one at a time.
pub(crate) fn remove_prefix<V>(
    nodes: &mut Slab<Node<V>>,
    root: NodeId,
    num_keys: &mut usize,
    prefix: &[u8],
) -> usize {
    let mut stack = ParentStack::new();
    let w = match walk(nodes, root, prefix, Some(&mut stack)) {
        Ok(w) => w,
        Err(_) => return 0,
    };
    if w.j != prefix.len() {
        return 0;
    }
    let target = w.node;

    let removed = if target == root {
        let children: Vec<NodeId> = nodes[root as usize]
            .children
            .iter()
            .map(|(_, c)| c)
            .collect();
        let mut removed = usize::from(nodes[root as usize].value.take().is_some());
        for child in children {
            removed += free_subtree(nodes, child);
        }
        let node = &mut nodes[root as usize];
        node.compression.clear();
        node.children = Default::default();
        removed
    } else {
        let parent = stack.last().expect("a non-root subtree always has a parent");
        let edge = nodes[parent as usize]
            .children
            .edge_to(target)
            .expect("parent must record an edge to its child");
        nodes[parent as usize].children.remove(edge);
        let removed = free_subtree(nodes, target);
        try_recompress(nodes, parent);
        removed
    };

    *num_keys -= removed;
    log::trace!("removed prefix subtree: {removed} keys freed");
    removed
}
