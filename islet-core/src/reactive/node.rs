//! Node identity and computation state.
//!
//! Every participant in the reactive graph - signal, effect, or computed -
//! is identified by a [`NodeId`]. Cross-references between cells and
//! computations go through these handles and the central graph table,
//! never through direct shared pointers. This keeps the bipartite
//! observer graph free of reference cycles.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a node in the reactive graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state of a computation (effect or computed).
///
/// Transitions:
///
/// - `Idle -> Running -> Idle` is the normal run cycle.
/// - A run requested while `Running` is a no-op (self-reentrancy guard).
/// - `dispose()` while `Idle` goes straight to `Disposed`.
/// - `dispose()` while `Running` moves to `PendingDispose`; the disposal
///   is carried out as the run exits.
/// - `Disposed` is terminal. Runs and reads become no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Not currently executing; may run.
    Idle,

    /// Body is executing on the current stack. Reentrant runs are ignored.
    Running,

    /// Body is executing and disposal was requested mid-run. The node
    /// finishes its current run, then tears down.
    PendingDispose,

    /// Torn down. Terminal.
    Disposed,
}

impl NodeState {
    /// Whether the node has been (or is about to be) torn down.
    pub fn is_disposed(&self) -> bool {
        matches!(self, NodeState::Disposed)
    }

    /// Whether a run may begin from this state.
    pub fn can_run(&self) -> bool {
        matches!(self, NodeState::Idle)
    }
}
