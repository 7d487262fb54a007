//! Error types returned by fallible tree operations.

/// Errors returned by operations that may need to grow the tree's internal
/// storage.
///
/// Node allocation itself is treated as infallible (as every crate in this
/// corpus treats `Vec`/`Slab` growth — the global allocator aborts on a
/// genuine OOM). The fallible surface modeled here is the variable-length
/// vectors a mutation may need to grow: a branch node's child list, a
/// node's compressed edge label, and the iterator's parent stack. Each of
/// those goes through `try_reserve` before growing, so a caller that wires
/// up a fallible allocator underneath still gets a clean rollback instead
/// of an abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RaxError {
    /// A `try_reserve` call failed while growing a node's children, edge
    /// label, or the iterator's parent stack.
    #[error("allocation failed while growing tree storage")]
    OutOfMemory,
}
