//! Active-computation stack.
//!
//! The stack records which computation, if any, is currently executing.
//! When a signal or computed is read, the top frame is consulted so the
//! read can be linked back to the reading computation. This is what makes
//! dependency tracking automatic.
//!
//! # Implementation
//!
//! A thread-local LIFO of frames, one per running computation. Entering a
//! frame returns an RAII guard; the frame is popped when the guard drops,
//! even if the computation body returns early. Each frame accumulates the
//! insertion-ordered set of sources read during the run, which the owning
//! computation diffs against its previous read-set on the way out.
//!
//! The stack is the only piece of ambient state in the graph and must
//! never be touched by more than one logical thread of control at a time;
//! thread-local storage enforces that by construction.

use std::cell::RefCell;

use indexmap::IndexSet;

use super::node::NodeId;

thread_local! {
    static TRACKING_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// One stack entry: the computation that is executing and the sources it
/// has read so far during this run.
struct Frame {
    observer: NodeId,
    reads: IndexSet<NodeId>,
}

/// Guard for one tracked run. Pops the frame when dropped.
pub struct ReactiveContext {
    observer: NodeId,
}

impl ReactiveContext {
    /// Push a frame for the given computation.
    ///
    /// While the frame is on top of the stack, every signal/computed read
    /// records itself into it.
    pub fn enter(observer: NodeId) -> Self {
        TRACKING_STACK.with(|stack| {
            stack.borrow_mut().push(Frame {
                observer,
                reads: IndexSet::new(),
            });
        });

        Self { observer }
    }

    /// Whether any computation is currently executing on this thread.
    pub fn is_active() -> bool {
        TRACKING_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The computation currently on top of the stack, if any.
    pub fn current_observer() -> Option<NodeId> {
        TRACKING_STACK.with(|stack| stack.borrow().last().map(|frame| frame.observer))
    }

    /// Record a read of `source` into the top frame.
    ///
    /// No-op when nothing is executing. Idempotent within one run.
    pub fn track_read(source: NodeId) {
        TRACKING_STACK.with(|stack| {
            if let Some(frame) = stack.borrow_mut().last_mut() {
                frame.reads.insert(source);
            }
        });
    }

    /// Snapshot the sources read so far in the top frame, in read order.
    pub fn collected_reads() -> IndexSet<NodeId> {
        TRACKING_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|frame| frame.reads.clone())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        TRACKING_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Catch mismatched enter/exit pairs early in debug builds.
            if let Some(frame) = popped {
                debug_assert_eq!(
                    frame.observer, self.observer,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.observer, frame.observer
                );
            }
        });
    }
}
