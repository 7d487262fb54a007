//! Ordered, bidirectional, seekable iteration over a tree's keys.
//!
//! A cursor holds only a key buffer, a parent-node stack and a small flags
//! word — it does not borrow the tree. Every step (`next`/`prev`/`seek`/
//! `current`/`random_walk`) takes the tree as an explicit argument instead,
//! so nothing about the cursor's type ties up a borrow of the tree between
//! calls. That is what makes the safe-iterator protocol (`spec.md` §4.5,
//! §5: "the caller may mutate the tree between `next`/`prev` calls") an
//! actual usable Rust API rather than a documented contract the borrow
//! checker would refuse to let anyone exercise: a `RaxIterator` that held
//! `&'a Slab<Node<V>>` for its lifetime would make `tree.insert(..)` a
//! compile error for as long as the cursor was still in scope, no matter
//! how carefully the "safe" bookkeeping inside it was implemented.

use smallvec::SmallVec;

use crate::error::RaxError;
use crate::node::NodeId;
use crate::RadixTree;

/// Inline capacity for the iterator's key buffer before it spills to the
/// heap, mirroring the original iterator's `RAX_ITER_STATIC_LEN` fixed-size
/// inline area (`spec.md` §4.5: "a growable key buffer (with a fixed-size
/// inline area as an optimization)").
const ITER_KEY_INLINE: usize = 128;

/// The comparison a seek positions the iterator relative to.
///
/// Named after the operator strings the original iterator accepts
/// (`"^"`, `"$"`, `"="`, `">"`, `">="`, `"<"`, `"<="`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOp {
    /// Position on the smallest key in the tree.
    First,
    /// Position on the largest key in the tree.
    Last,
    /// Position exactly on `target`.
    Eq,
    /// Position on the smallest key strictly greater than `target`.
    Gt,
    /// Position on the smallest key greater than or equal to `target`.
    Ge,
    /// Position on the largest key strictly less than `target`.
    Lt,
    /// Position on the largest key less than or equal to `target`.
    Le,
}

/// A cursor over a tree's keys in lexicographic byte order.
///
/// Every method that needs to read the tree takes it as a `&RadixTree<V>`
/// argument, rather than the cursor holding a stored reference. Two
/// traversal modes, mirroring the original `RAX_ITER_SAFE` flag, differ in
/// what they assume about the tree *between* calls:
///
/// - **Unsafe** (default, cheaper): the path from root to the current key
///   is cached as a stack of node indices and trusted as-is on the next
///   call. Valid only if the tree passed to the next call is the same tree,
///   structurally unchanged, as the one passed to the last — the caller
///   may still *read* it freely, or even pass the same handle after
///   dropping and reopening it, as long as no insert/remove happened.
///   Violating this cannot corrupt memory (`NodeId`s are arena indices, not
///   pointers), but it can silently resolve to a different, reused node, or
///   panic on a since-vacated slab slot — a caller bug, per `spec.md` §7,
///   not a safety hole the type system closes.
/// - **Safe** (`make_safe`): before every step, the cursor re-walks from
///   the root using the last returned key to rebuild that stack, so it
///   tolerates any insert/remove applied to the tree between steps, at the
///   cost of an O(key length) re-walk per step.
///
/// Every method that can grow the cursor's internal stack or key buffer
/// returns `Result<bool, RaxError>` rather than a plain `bool`, so a
/// failure to grow past the inline capacity (`spec.md` §7) is reported to
/// the caller instead of being silently folded into "not found".
pub struct RaxIterator {
    root: NodeId,
    safe: bool,
    eof: bool,
    just_seeked: bool,
    key: SmallVec<[u8; ITER_KEY_INLINE]>,
    stack: Vec<NodeId>,
    edges: Vec<u8>,
    lens: Vec<usize>,
}

impl RaxIterator {
    pub(crate) fn new(root: NodeId) -> Self {
        RaxIterator {
            root,
            safe: false,
            eof: true,
            just_seeked: false,
            key: SmallVec::new(),
            stack: Vec::new(),
            edges: Vec::new(),
            lens: Vec::new(),
        }
    }

    /// Switches this cursor into safe mode (see the type docs).
    pub fn make_safe(&mut self) {
        self.safe = true;
    }

    /// The key/value pair the cursor currently rests on, if any.
    pub fn current<'t, V>(&self, tree: &'t RadixTree<V>) -> Option<(&[u8], &'t V)> {
        if self.eof {
            return None;
        }
        let node_idx = *self.stack.last()?;
        let node = &tree.nodes[node_idx as usize];
        node.value.as_ref().map(|v| (self.key.as_slice(), v))
    }

    /// `true` once a step has moved past either end of the key space.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Grows `key` by `additional` bytes worth of headroom, reporting
    /// `RaxError::OutOfMemory` instead of aborting if that fails.
    fn try_reserve_key(&mut self, additional: usize) -> Result<(), RaxError> {
        self.key.try_reserve(additional).map_err(|_| RaxError::OutOfMemory)
    }

    fn try_extend_key(&mut self, bytes: &[u8]) -> Result<(), RaxError> {
        self.try_reserve_key(bytes.len())?;
        self.key.extend_from_slice(bytes);
        Ok(())
    }

    /// Pushes a new frame onto `stack`/`edges`/`lens`/`key`, reporting
    /// `RaxError::OutOfMemory` instead of aborting if any of the four grows
    /// past its current capacity. Mirrors `ParentStack::push` in `walk.rs`,
    /// which models the same `try_reserve`-before-grow discipline for the
    /// insert/lookup walk's own stack.
    fn push_frame<V>(&mut self, tree: &RadixTree<V>, edge: u8, node_idx: NodeId) -> Result<(), RaxError> {
        let comp_len = tree.nodes[node_idx as usize].compression.len();
        self.stack.try_reserve(1).map_err(|_| RaxError::OutOfMemory)?;
        self.edges.try_reserve(1).map_err(|_| RaxError::OutOfMemory)?;
        self.lens.try_reserve(1).map_err(|_| RaxError::OutOfMemory)?;
        self.try_reserve_key(1 + comp_len)?;

        self.stack.push(node_idx);
        self.edges.push(edge);
        self.key.push(edge);
        self.key
            .extend_from_slice(&tree.nodes[node_idx as usize].compression);
        self.lens.push(self.key.len());
        Ok(())
    }

    fn pop_frame(&mut self) {
        self.stack.pop();
        self.edges.pop();
        self.lens.pop();
        let new_len = self.lens.last().copied().unwrap_or(0);
        self.key.truncate(new_len);
    }

    /// Clears the cursor and seeds it with a single frame for the root,
    /// whose compression is already folded into `key`/`lens` (used by
    /// `SeekOp::First`/`SeekOp::Last`, which descend from the root rather
    /// than walking it byte-by-byte against a target).
    fn reset_to_root<V>(&mut self, tree: &RadixTree<V>) -> Result<(), RaxError> {
        self.stack.clear();
        self.edges.clear();
        self.lens.clear();
        self.key.clear();

        let comp_len = tree.nodes[self.root as usize].compression.len();
        self.stack.try_reserve(1).map_err(|_| RaxError::OutOfMemory)?;
        self.edges.try_reserve(1).map_err(|_| RaxError::OutOfMemory)?;
        self.lens.try_reserve(1).map_err(|_| RaxError::OutOfMemory)?;
        self.try_reserve_key(comp_len)?;

        self.stack.push(self.root);
        self.edges.push(0);
        self.lens.push(comp_len);
        self.key
            .extend_from_slice(&tree.nodes[self.root as usize].compression);
        Ok(())
    }

    /// Clears the cursor and seeds it with a single, still-empty frame for
    /// the root, used by the target-comparing walks (`seek_eq`/`seek_ge`/
    /// `seek_le`/`rewalk_exact`), which fill in the root's own compression
    /// and `lens` entry as the first step of their loop.
    fn reset_search(&mut self) -> Result<(), RaxError> {
        self.key.clear();
        self.stack.clear();
        self.edges.clear();
        self.lens.clear();
        self.stack.try_reserve(1).map_err(|_| RaxError::OutOfMemory)?;
        self.edges.try_reserve(1).map_err(|_| RaxError::OutOfMemory)?;
        self.lens.try_reserve(1).map_err(|_| RaxError::OutOfMemory)?;
        self.stack.push(self.root);
        self.edges.push(0);
        self.lens.push(0);
        Ok(())
    }

    /// Descends to the smallest key in the subtree rooted at the current
    /// top-of-stack node (inclusive of that node itself).
    fn descend_first<V>(&mut self, tree: &RadixTree<V>) -> Result<bool, RaxError> {
        loop {
            let idx = *self.stack.last().unwrap();
            let node = &tree.nodes[idx as usize];
            if node.is_key() {
                return Ok(true);
            }
            match node.children.first() {
                Some((radix, child)) => self.push_frame(tree, radix, child)?,
                None => return Ok(false),
            }
        }
    }

    /// Descends to the largest key in the subtree rooted at the current
    /// top-of-stack node.
    fn descend_last<V>(&mut self, tree: &RadixTree<V>) -> Result<bool, RaxError> {
        loop {
            let idx = *self.stack.last().unwrap();
            let node = &tree.nodes[idx as usize];
            match node.children.last() {
                Some((radix, child)) => self.push_frame(tree, radix, child)?,
                None => return Ok(node.is_key()),
            }
        }
    }

    /// Ascends until a sibling strictly greater than the edge we arrived
    /// by is found, then descends to the smallest key past it. Returns
    /// `Ok(false)` (EOF) if no such key exists.
    fn ascend_to_next<V>(&mut self, tree: &RadixTree<V>) -> Result<bool, RaxError> {
        loop {
            if self.stack.len() <= 1 {
                return Ok(false); // nothing above the root to ascend to
            }
            let arrived_by = *self.edges.last().unwrap();
            self.pop_frame();
            let parent_idx = *self.stack.last().unwrap();
            if let Some((radix, child)) =
                tree.nodes[parent_idx as usize].children.next_after(arrived_by)
            {
                self.push_frame(tree, radix, child)?;
                return self.descend_first(tree);
            }
        }
    }

    /// Mirror of `ascend_to_next`, walking toward smaller keys.
    fn ascend_to_prev<V>(&mut self, tree: &RadixTree<V>) -> Result<bool, RaxError> {
        loop {
            if self.stack.len() <= 1 {
                let root = tree.nodes[self.root as usize].is_key();
                return Ok(root && self.stack.len() == 1);
            }
            let arrived_by = *self.edges.last().unwrap();
            self.pop_frame();
            let parent_idx = *self.stack.last().unwrap();
            if let Some((radix, child)) =
                tree.nodes[parent_idx as usize].children.prev_before(arrived_by)
            {
                self.push_frame(tree, radix, child)?;
                return self.descend_last(tree);
            }
            if tree.nodes[parent_idx as usize].is_key() {
                return Ok(true);
            }
        }
    }

    /// Rebuilds `stack`/`edges`/`lens` from scratch by re-walking from the
    /// root along `key`, exactly as `seek_eq` would. Used by safe-mode
    /// steps to recover from structural changes (splits, merges, node
    /// reuse in the arena) made to the tree between iterator calls.
    ///
    /// Returns `Ok(false)` if `key` is no longer an exact key in the tree —
    /// the caller must not trust `self.stack` in that case and should
    /// reposition with a fresh `>`/`<` seek instead of stepping from it.
    fn rewalk_exact<V>(&mut self, tree: &RadixTree<V>, key: &[u8]) -> Result<bool, RaxError> {
        self.reset_search()?;

        let mut consumed = 0usize;
        loop {
            let idx = *self.stack.last().unwrap();
            let node = &tree.nodes[idx as usize];
            let rest = &key[consumed..];
            let common = crate::node::common_len(&node.compression, rest);
            if common < node.compression.len() {
                return Ok(false);
            }
            self.try_extend_key(&node.compression)?;
            *self.lens.last_mut().unwrap() = self.key.len();
            consumed += node.compression.len();
            if consumed == key.len() {
                return Ok(node.is_key());
            }
            match node.children.find(key[consumed]) {
                Some(child) => {
                    self.push_frame(tree, key[consumed], child)?;
                    consumed += 1;
                }
                None => return Ok(false),
            }
        }
    }

    /// Advances to the next key in ascending order.
    ///
    /// In safe mode, per `spec.md` §4.5, this first re-walks from the root
    /// along the last returned key. If that key is still present exactly,
    /// the step proceeds as normal from the (freshly rebuilt) stack. If it
    /// vanished — removed, or merged away into a different arena slot by a
    /// split/recompression — stepping from a cached stack would read a
    /// stale or since-reused node, so instead this repositions with a
    /// strict `>` seek on the same key, which both recovers and performs
    /// the step in one move.
    pub fn next<V>(&mut self, tree: &RadixTree<V>) -> Result<bool, RaxError> {
        if self.eof {
            return Ok(false);
        }
        if self.just_seeked {
            self.just_seeked = false;
            return Ok(self.current_is_valid());
        }
        if self.safe {
            let key: SmallVec<[u8; ITER_KEY_INLINE]> = self.key.clone();
            if self.rewalk_exact(tree, &key)? {
                return self.step_next_from_current(tree);
            }
            let found = self.seek_ge(tree, &key, true)?;
            if !found {
                self.eof = true;
            }
            return Ok(found);
        }
        self.step_next_from_current(tree)
    }

    /// Steps to the previous key in descending order. See [`Self::next`]
    /// for the safe-mode recovery protocol (mirrored here with a strict
    /// `<` seek).
    pub fn prev<V>(&mut self, tree: &RadixTree<V>) -> Result<bool, RaxError> {
        if self.eof {
            return Ok(false);
        }
        if self.just_seeked {
            self.just_seeked = false;
            return Ok(self.current_is_valid());
        }
        if self.safe {
            let key: SmallVec<[u8; ITER_KEY_INLINE]> = self.key.clone();
            if self.rewalk_exact(tree, &key)? {
                return self.step_prev_from_current(tree);
            }
            let found = self.seek_le(tree, &key, true)?;
            if !found {
                self.eof = true;
            }
            return Ok(found);
        }
        self.step_prev_from_current(tree)
    }

    fn step_next_from_current<V>(&mut self, tree: &RadixTree<V>) -> Result<bool, RaxError> {
        let idx = *self.stack.last().unwrap();
        let has_children = !tree.nodes[idx as usize].children.is_empty();
        let advanced = if has_children {
            let (radix, child) = tree.nodes[idx as usize].children.first().unwrap();
            self.push_frame(tree, radix, child)?;
            self.descend_first(tree)?
        } else {
            self.ascend_to_next(tree)?
        };
        if !advanced {
            self.eof = true;
        }
        Ok(advanced)
    }

    fn step_prev_from_current<V>(&mut self, tree: &RadixTree<V>) -> Result<bool, RaxError> {
        let advanced = self.ascend_to_prev(tree)?;
        if !advanced {
            self.eof = true;
        }
        Ok(advanced)
    }

    fn current_is_valid(&self) -> bool {
        !self.eof && self.stack.last().is_some()
    }

    /// Positions the cursor according to `op` (and `target`, ignored for
    /// `SeekOp::First`/`SeekOp::Last`). Returns `Ok(true)` if a matching
    /// element exists.
    pub fn seek<V>(&mut self, tree: &RadixTree<V>, op: SeekOp, target: &[u8]) -> Result<bool, RaxError> {
        self.eof = false;
        self.just_seeked = true;

        let found = match op {
            SeekOp::First => {
                self.reset_to_root(tree)?;
                self.descend_first(tree)?
            }
            SeekOp::Last => {
                self.reset_to_root(tree)?;
                self.descend_last(tree)?
            }
            SeekOp::Eq => self.seek_eq(tree, target)?,
            SeekOp::Ge | SeekOp::Gt => self.seek_ge(tree, target, op == SeekOp::Gt)?,
            SeekOp::Le | SeekOp::Lt => self.seek_le(tree, target, op == SeekOp::Lt)?,
        };

        if !found {
            self.eof = true;
            self.just_seeked = false;
        }
        Ok(found)
    }

    fn seek_eq<V>(&mut self, tree: &RadixTree<V>, target: &[u8]) -> Result<bool, RaxError> {
        self.reset_search()?;

        let mut consumed = 0usize;
        loop {
            let idx = *self.stack.last().unwrap();
            let node = &tree.nodes[idx as usize];
            let rest = &target[consumed..];
            let common = crate::node::common_len(&node.compression, rest);
            if common < node.compression.len() {
                return Ok(false);
            }
            self.try_extend_key(&node.compression)?;
            *self.lens.last_mut().unwrap() = self.key.len();
            consumed += node.compression.len();
            if consumed == target.len() {
                return Ok(node.is_key());
            }
            match node.children.find(target[consumed]) {
                Some(child) => {
                    self.push_frame(tree, target[consumed], child)?;
                    consumed += 1;
                }
                None => return Ok(false),
            }
        }
    }

    /// Positions on the smallest key `>= target` (or `> target` if
    /// `strict`). Walks down comparing each node's compression against the
    /// remaining target bytes; at the first point of divergence, either
    /// the whole subtree here is already `> target` (take its first key)
    /// or it is `< target` (ascend and take the next sibling's first key).
    fn seek_ge<V>(&mut self, tree: &RadixTree<V>, target: &[u8], strict: bool) -> Result<bool, RaxError> {
        self.reset_search()?;

        let mut consumed = 0usize;
        loop {
            let idx = *self.stack.last().unwrap();
            let node = &tree.nodes[idx as usize];
            let rest = &target[consumed..];
            let common = crate::node::common_len(&node.compression, rest);

            if common < node.compression.len() {
                self.try_extend_key(&node.compression[..common])?;
                if common == rest.len() {
                    // target is a strict prefix of this node's path: the
                    // whole subtree here is > target.
                    *self.lens.last_mut().unwrap() = self.key.len() + (node.compression.len() - common);
                    self.try_extend_key(&node.compression[common..])?;
                    return self.descend_first(tree);
                }
                if node.compression[common] > rest[common] {
                    self.try_extend_key(&node.compression[common..])?;
                    *self.lens.last_mut().unwrap() = self.key.len();
                    return self.descend_first(tree);
                }
                return self.ascend_to_next(tree);
            }

            self.try_extend_key(&node.compression)?;
            *self.lens.last_mut().unwrap() = self.key.len();
            consumed += node.compression.len();

            if consumed == target.len() {
                if !strict && node.is_key() {
                    return Ok(true);
                }
                return self.descend_first_excluding_self(tree);
            }

            match node.children.find(target[consumed]) {
                Some(child) => {
                    self.push_frame(tree, target[consumed], child)?;
                    consumed += 1;
                }
                None => {
                    if let Some((radix, child)) = node.children.next_after(target[consumed]) {
                        self.push_frame(tree, radix, child)?;
                        return self.descend_first(tree);
                    }
                    return self.ascend_to_next(tree);
                }
            }
        }
    }

    /// Like `descend_first`, but skips a value on the current top node
    /// (used when an exact match must be excluded for `Gt`).
    fn descend_first_excluding_self<V>(&mut self, tree: &RadixTree<V>) -> Result<bool, RaxError> {
        let idx = *self.stack.last().unwrap();
        match tree.nodes[idx as usize].children.first() {
            Some((radix, child)) => {
                self.push_frame(tree, radix, child)?;
                self.descend_first(tree)
            }
            None => self.ascend_to_next(tree),
        }
    }

    /// Mirror of `seek_ge` toward smaller keys.
    fn seek_le<V>(&mut self, tree: &RadixTree<V>, target: &[u8], strict: bool) -> Result<bool, RaxError> {
        self.reset_search()?;

        let mut consumed = 0usize;
        loop {
            let idx = *self.stack.last().unwrap();
            let node = &tree.nodes[idx as usize];
            let rest = &target[consumed..];
            let common = crate::node::common_len(&node.compression, rest);

            if common < node.compression.len() {
                self.try_extend_key(&node.compression[..common])?;
                *self.lens.last_mut().unwrap() = self.key.len();
                if common == rest.len() {
                    // target is a strict prefix of this node's path: the
                    // whole subtree here is > target, so the answer lies
                    // strictly before this node.
                    return self.ascend_to_prev(tree);
                }
                if node.compression[common] < rest[common] {
                    self.try_extend_key(&node.compression[common..])?;
                    return self.descend_last(tree);
                }
                return self.ascend_to_prev(tree);
            }

            self.try_extend_key(&node.compression)?;
            *self.lens.last_mut().unwrap() = self.key.len();
            consumed += node.compression.len();

            if consumed == target.len() {
                if !strict && node.is_key() {
                    return Ok(true);
                }
                return self.ascend_to_prev(tree);
            }

            match node.children.find(target[consumed]) {
                Some(child) => {
                    self.push_frame(tree, target[consumed], child)?;
                    consumed += 1;
                }
                None => {
                    if let Some((radix, child)) = node.children.prev_before(target[consumed]) {
                        self.push_frame(tree, radix, child)?;
                        return self.descend_last(tree);
                    }
                    return self.ascend_to_prev(tree);
                }
            }
        }
    }

    /// Takes one step of a random walk: from the current node, picks a
    /// uniformly random child (or stops here) via `choose`, which is
    /// handed the number of available choices (children count, plus one
    /// more if the current node is itself a key) and returns an index into
    /// `0..n`; index `0` means "stop here and return the current key" when
    /// the current node is a key, otherwise it means "take child 0".
    ///
    /// This plugs in wherever a caller wants randomness from: the `rand`
    /// feature's helper uses `rand::Rng::gen_range`, but the core walk
    /// itself stays deterministic and dependency-free so it can be driven
    /// from a seeded test.
    pub fn random_walk<V>(
        &mut self,
        tree: &RadixTree<V>,
        mut choose: impl FnMut(usize) -> usize,
    ) -> Result<bool, RaxError> {
        self.reset_to_root(tree)?;
        self.eof = false;
        loop {
            let idx = *self.stack.last().unwrap();
            let node = &tree.nodes[idx as usize];
            let n_children = node.children.len();
            let is_key = node.is_key();
            let choices = n_children + usize::from(is_key);
            if choices == 0 {
                self.eof = true;
                return Ok(false);
            }
            let pick = choose(choices) % choices;
            if is_key && pick == 0 {
                self.just_seeked = false;
                return Ok(true);
            }
            let child_pick = if is_key { pick - 1 } else { pick };
            let (radix, child) = node.children.iter().nth(child_pick).unwrap();
            self.push_frame(tree, radix, child)?;
        }
    }

    /// Compares the cursor's current key against `target` using `op`,
    /// without moving the cursor or touching the tree.
    ///
    /// Mirrors the original `raxCompare`: a pure byte-lexicographic
    /// comparison between the iterator's already-positioned key and an
    /// arbitrary key, for callers that have a cursor in hand and want to
    /// know where it stands relative to a bound without issuing a fresh
    /// `seek`. `SeekOp::First`/`SeekOp::Last` (which name a position, not a
    /// relation) always compare false, matching the original's relational
    /// operator set (`=`, `>`, `>=`, `<`, `<=`).
    pub fn compare(&self, op: SeekOp, target: &[u8]) -> bool {
        if self.eof {
            return false;
        }
        let ord = self.key.as_slice().cmp(target);
        match op {
            SeekOp::Eq => ord.is_eq(),
            SeekOp::Gt => ord.is_gt(),
            SeekOp::Ge => ord.is_ge(),
            SeekOp::Lt => ord.is_lt(),
            SeekOp::Le => ord.is_le(),
            SeekOp::First | SeekOp::Last => false,
        }
    }
}

#[cfg(feature = "rand")]
impl RaxIterator {
    /// Convenience wrapper over [`RaxIterator::random_walk`] using the
    /// thread-local RNG from the `rand` crate.
    pub fn random_walk_rng<V>(&mut self, tree: &RadixTree<V>) -> Result<bool, RaxError> {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        self.random_walk(tree, |n| rng.gen_range(0..n))
    }
}
