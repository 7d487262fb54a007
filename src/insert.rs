//! Insertion logic: the four-way split on where a key's walk stops.

use smallvec::SmallVec;

use crate::children::Children;
use crate::error::RaxError;
use crate::node::{try_compression_from_slice, Node, NodeId, COMPRESSION_INLINE, MAX_COMPRESSED_LEN};
use crate::walk::walk;
use slab::Slab;

/// What happened when inserting a key.
pub enum InsertOutcome<'a, V> {
    /// The key was new; the value was stored.
    Inserted,
    /// The key already existed; its old value is returned and the new one
    /// is now stored.
    Replaced(V),
    /// The key already existed and the caller asked not to overwrite it
    /// (`try_insert`); a reference to the existing value is returned.
    AlreadyExists(&'a V),
}

/// Frees a chain of nodes this module just built and is abandoning because
/// a later step in the same insert failed. These nodes were never reachable
/// from the tree's root, so removing them can't disturb any stored key.
fn free_unlinked_chain<V>(nodes: &mut Slab<Node<V>>, idx: NodeId) {
    let mut stack = vec![idx];
    while let Some(i) = stack.pop() {
        let node = nodes.remove(i as usize);
        stack.extend(node.children.iter().map(|(_, child)| child));
    }
}

/// Builds a fresh chain of nodes holding `tail` as a compressed path,
/// terminating in a node that stores `value`.
///
/// Splits the tail across several maximal-size nodes when it exceeds
/// `MAX_COMPRESSED_LEN`, exactly as the comment in `Node`'s docs promises.
pub(crate) fn build_leaf_chain<V>(
    nodes: &mut Slab<Node<V>>,
    tail: &[u8],
    value: Option<V>,
) -> Result<NodeId, RaxError> {
    if tail.len() <= MAX_COMPRESSED_LEN {
        let node = Node::try_new_leaf(tail, value)?;
        return Ok(nodes.insert(node) as NodeId);
    }
    log::debug!(
        "key tail of {} bytes exceeds max compressed length {MAX_COMPRESSED_LEN}, chaining",
        tail.len()
    );
    let head = &tail[..MAX_COMPRESSED_LEN];
    let edge = tail[MAX_COMPRESSED_LEN];
    let rest = &tail[MAX_COMPRESSED_LEN + 1..];
    let child_id = build_leaf_chain(nodes, rest, value)?;
    let head_compression = match try_compression_from_slice(head) {
        Ok(c) => c,
        Err(e) => {
            free_unlinked_chain(nodes, child_id);
            return Err(e);
        }
    };
    let mut children = Children::default();
    if let Err(e) = children.insert(edge, child_id) {
        free_unlinked_chain(nodes, child_id);
        return Err(e);
    }
    let node = Node {
        compression: head_compression,
        value: None,
        children,
    };
    Ok(nodes.insert(node) as NodeId)
}

/// Inserts `key` with `value`. If `replace` is false and the key already
/// exists, the existing value is left untouched and returned via
/// `AlreadyExists` (this is what `RadixTree::try_insert` exposes).
pub(crate) fn insert<V>(
    nodes: &mut Slab<Node<V>>,
    root: NodeId,
    num_keys: &mut usize,
    key: &[u8],
    value: V,
    replace: bool,
) -> Result<InsertOutcome<'_, V>, RaxError> {
    let w = walk(nodes, root, key, None)?;
    let comp_len = nodes[w.node as usize].compression.len();

    if w.j == key.len() && w.i == comp_len {
        if nodes[w.node as usize].value.is_some() {
            return if replace {
                let old = nodes[w.node as usize].value.replace(value).unwrap();
                Ok(InsertOutcome::Replaced(old))
            } else {
                Ok(InsertOutcome::AlreadyExists(
                    nodes[w.node as usize].value.as_ref().unwrap(),
                ))
            };
        }
        nodes[w.node as usize].value = Some(value);
        *num_keys += 1;
        return Ok(InsertOutcome::Inserted);
    }

    if w.i < comp_len {
        split(nodes, w.node, w.i, &key[w.j..], value, num_keys)?;
        return Ok(InsertOutcome::Inserted);
    }

    // w.i == comp_len and w.j < key.len(): the node's own compression
    // matched fully but no outgoing edge continues the key.
    let radix = key[w.j];
    let tail = &key[w.j + 1..];
    let child_id = build_leaf_chain(nodes, tail, Some(value))?;
    if let Err(e) = nodes[w.node as usize].children.insert(radix, child_id) {
        free_unlinked_chain(nodes, child_id);
        return Err(e);
    }
    *num_keys += 1;
    Ok(InsertOutcome::Inserted)
}

/// Restores `node_idx` to its pre-`split` state and reports `err`.
///
/// `old_child_id` still owns the node's original value/children (moved
/// there earlier in `split`), so reclaiming it from the arena and putting
/// `old_compression` (the node's original, unsplit edge label) back is
/// enough to undo everything `split` had done up to the failure point.
fn rollback_split<V>(
    nodes: &mut Slab<Node<V>>,
    node_idx: NodeId,
    old_child_id: NodeId,
    old_compression: SmallVec<[u8; COMPRESSION_INLINE]>,
    err: RaxError,
) -> Result<(), RaxError> {
    let reclaimed = nodes.remove(old_child_id as usize);
    nodes[node_idx as usize].compression = old_compression;
    nodes[node_idx as usize].value = reclaimed.value;
    nodes[node_idx as usize].children = reclaimed.children;
    Err(err)
}

/// Splits `node_idx`'s compression at offset `common`, peeling off the
/// unmatched remainder into a new sibling child, and attaches `key_tail`
/// (the key bytes from the divergence point onward) as either the node's
/// own new value (if nothing is left of the key) or another new child.
///
/// Every fallible step after the initial `old_compression`/`old_value`/
/// `old_children` snapshot is paired with a rollback path so that a failed
/// allocation anywhere in the split leaves `node_idx` exactly as it was
/// found, per `spec.md` §5's "a failed allocation during insert leaves the
/// tree unchanged" contract.
fn split<V>(
    nodes: &mut Slab<Node<V>>,
    node_idx: NodeId,
    common: usize,
    key_tail: &[u8],
    value: V,
    num_keys: &mut usize,
) -> Result<(), RaxError> {
    let val_on_intermediate = key_tail.is_empty();

    let old_compression: SmallVec<[u8; COMPRESSION_INLINE]> =
        std::mem::take(&mut nodes[node_idx as usize].compression);
    let old_value = nodes[node_idx as usize].value.take();
    let old_children = std::mem::take(&mut nodes[node_idx as usize].children);
    let old_radix = old_compression[common];

    let peeled_compression = match try_compression_from_slice(&old_compression[common + 1..]) {
        Ok(c) => c,
        Err(e) => {
            // Nothing has been linked into the tree yet: put node_idx back
            // exactly as it was before propagating the failure.
            nodes[node_idx as usize].compression = old_compression;
            nodes[node_idx as usize].value = old_value;
            nodes[node_idx as usize].children = old_children;
            return Err(e);
        }
    };

    let old_child_id = nodes.insert(Node {
        compression: peeled_compression,
        value: old_value,
        children: old_children,
    }) as NodeId;
    log::trace!("split node {node_idx} at offset {common}, peeling a new child {old_child_id}");

    let head_compression = match try_compression_from_slice(&old_compression[..common]) {
        Ok(c) => c,
        Err(e) => return rollback_split(nodes, node_idx, old_child_id, old_compression, e),
    };
    nodes[node_idx as usize].compression = head_compression;

    if let Err(e) = nodes[node_idx as usize].children.insert(old_radix, old_child_id) {
        return rollback_split(nodes, node_idx, old_child_id, old_compression, e);
    }

    if val_on_intermediate {
        nodes[node_idx as usize].value = Some(value);
    } else {
        let new_radix = key_tail[0];
        let new_tail = &key_tail[1..];
        let new_child_id = match build_leaf_chain(nodes, new_tail, Some(value)) {
            Ok(id) => id,
            Err(e) => return rollback_split(nodes, node_idx, old_child_id, old_compression, e),
        };
        if let Err(e) = nodes[node_idx as usize].children.insert(new_radix, new_child_id) {
            free_unlinked_chain(nodes, new_child_id);
            return rollback_split(nodes, node_idx, old_child_id, old_compression, e);
        }
    }
    *num_keys += 1;
    Ok(())
}
