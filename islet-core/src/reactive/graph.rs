//! Central graph table and propagation.
//!
//! The graph is the single place where the bipartite cell/computation
//! relationships live:
//!
//! - a subscriber table mapping each source (signal or computed) to the
//!   insertion-ordered set of computations that read it during their most
//!   recent run, and
//! - an observer registry mapping computation IDs to weak handles, used to
//!   dispatch notifications without keeping computations alive.
//!
//! # Propagation
//!
//! A write to a source synchronously walks its subscriber set, in
//! insertion order (first-subscribed, first-notified), and invokes each
//! subscriber on the calling stack. There is no batching and no scheduler:
//! a write that triggers ten dependent computations runs all ten before
//! control returns to the writer.
//!
//! A failing subscriber does not stop the wave. Every subscriber is
//! attempted, failures are collected, and the writer receives one
//! aggregate [`ReactiveError::Propagation`] after the wave completes.
//!
//! # Cycle guard
//!
//! Self-reentrancy of a single computation is a silent no-op (handled by
//! the computation's own state machine). Mutual cycles spanning two or
//! more computations are bounded by a propagation depth counter: once a
//! notification wave nests deeper than [`MAX_PROPAGATION_DEPTH`], the
//! wave fails with [`ReactiveError::DepthExceeded`] instead of recursing
//! without limit.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{OnceLock, Weak};

use indexmap::IndexSet;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::trace;

use super::node::NodeId;

/// Maximum nesting depth of synchronous notification waves.
///
/// A wave nests when a notified computation writes to another source
/// during its run. Exceeding this bound almost always means two or more
/// computations are re-triggering each other.
pub const MAX_PROPAGATION_DEPTH: usize = 256;

/// Error type for computation bodies.
///
/// Bodies may fail with any error; the graph carries it opaquely to the
/// caller that triggered the run.
pub type BodyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One failed subscriber within a propagation wave.
#[derive(Debug, Error)]
#[error("subscriber {observer:?} failed: {error}")]
pub struct SubscriberFailure {
    /// The computation that failed.
    pub observer: NodeId,
    /// What its body reported.
    pub error: BodyError,
}

/// Errors surfaced by the reactive graph.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// One or more subscribers failed during a notification wave. All
    /// other subscribers in the wave still ran.
    #[error("{} subscriber(s) failed during propagation", failures.len())]
    Propagation {
        /// Every failure in the wave, in notification order.
        failures: Vec<SubscriberFailure>,
    },

    /// A notification wave nested deeper than [`MAX_PROPAGATION_DEPTH`].
    #[error("propagation exceeded {max} nested waves; suspected cycle between computations")]
    DepthExceeded {
        /// The configured bound.
        max: usize,
    },
}

/// A computation that can be re-invoked when one of its sources changes.
///
/// Implemented by the inner state of effects and computeds. The registry
/// holds these behind `Weak` so that dropping every public handle to a
/// computation lets it die.
pub(crate) trait Observer: Send + Sync {
    /// The computation's node ID.
    fn node_id(&self) -> NodeId;

    /// React to a source change. For an effect this re-runs the body; for
    /// a computed it recomputes and cascades to its own subscribers.
    fn notify(&self) -> Result<(), BodyError>;
}

static SUBSCRIBERS: OnceLock<RwLock<HashMap<NodeId, IndexSet<NodeId>>>> = OnceLock::new();
static OBSERVERS: OnceLock<RwLock<HashMap<NodeId, Weak<dyn Observer>>>> = OnceLock::new();

thread_local! {
    static WAVE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

fn subscriber_table() -> &'static RwLock<HashMap<NodeId, IndexSet<NodeId>>> {
    SUBSCRIBERS.get_or_init(|| RwLock::new(HashMap::new()))
}

fn observer_registry() -> &'static RwLock<HashMap<NodeId, Weak<dyn Observer>>> {
    OBSERVERS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Accounts for one nesting level of a notification wave. The counter
/// must come back down even when a subscriber panics out of the wave,
/// so the decrement lives in `Drop`.
struct WaveGuard;

impl WaveGuard {
    fn enter() -> Result<Self, ReactiveError> {
        let depth = WAVE_DEPTH.with(|d| {
            let next = d.get() + 1;
            d.set(next);
            next
        });

        let guard = Self;
        if depth > MAX_PROPAGATION_DEPTH {
            return Err(ReactiveError::DepthExceeded {
                max: MAX_PROPAGATION_DEPTH,
            });
        }
        Ok(guard)
    }
}

impl Drop for WaveGuard {
    fn drop(&mut self) {
        WAVE_DEPTH.with(|d| d.set(d.get() - 1));
    }
}

/// Register a computation for notification dispatch.
pub(crate) fn register(id: NodeId, observer: Weak<dyn Observer>) {
    observer_registry().write().insert(id, observer);
}

/// Remove a computation from the registry and from every subscriber set.
pub(crate) fn unregister(id: NodeId) {
    observer_registry().write().remove(&id);

    // Entries exist only while non-empty; a long-lived process churns
    // through many short-lived sources and the table must not grow with
    // them.
    let mut table = subscriber_table().write();
    table.retain(|_, set| {
        set.shift_remove(&id);
        !set.is_empty()
    });
}

/// Link `observer` as a subscriber of `source`.
///
/// Idempotent; a subscriber that is already present keeps its original
/// insertion position, preserving notification order across re-runs.
pub(crate) fn subscribe(source: NodeId, observer: NodeId) {
    subscriber_table()
        .write()
        .entry(source)
        .or_default()
        .insert(observer);
}

/// Unlink `observer` from `source`, dropping the table entry when the
/// last subscriber goes.
pub(crate) fn unsubscribe(source: NodeId, observer: NodeId) {
    let mut table = subscriber_table().write();
    if let Some(set) = table.get_mut(&source) {
        set.shift_remove(&observer);
        if set.is_empty() {
            table.remove(&source);
        }
    }
}

/// Drop every subscriber of `source`. Used when a computed is disposed:
/// nothing should keep observing a disposed derived value.
pub(crate) fn clear_subscribers(source: NodeId) {
    subscriber_table().write().remove(&source);
}

/// Number of current subscribers of `source`.
pub(crate) fn subscriber_count(source: NodeId) -> usize {
    subscriber_table()
        .read()
        .get(&source)
        .map(|set| set.len())
        .unwrap_or(0)
}

/// Whether `observer` is currently subscribed to `source`. Test hook.
pub(crate) fn is_subscribed(source: NodeId, observer: NodeId) -> bool {
    subscriber_table()
        .read()
        .get(&source)
        .map(|set| set.contains(&observer))
        .unwrap_or(false)
}

/// Synchronously notify every current subscriber of `source`.
///
/// The subscriber set is snapshotted at wave start; subscribers disposed
/// by an earlier sibling in the same wave turn their own invocation into
/// a no-op. All locks are released before any subscriber runs, since a
/// subscriber may re-enter the graph arbitrarily.
pub(crate) fn notify_subscribers(source: NodeId) -> Result<(), ReactiveError> {
    let wave: Vec<NodeId> = {
        let table = subscriber_table().read();
        match table.get(&source) {
            Some(set) if !set.is_empty() => set.iter().copied().collect(),
            _ => return Ok(()),
        }
    };

    let _wave = WaveGuard::enter()?;

    let mut failures = Vec::new();
    for observer_id in wave {
        let observer = {
            let registry = observer_registry().read();
            registry.get(&observer_id).and_then(Weak::upgrade)
        };

        let Some(observer) = observer else {
            // Every public handle was dropped; the subscription is stale.
            continue;
        };

        trace!(source = source.raw(), observer = observer.node_id().raw(), "notify");
        if let Err(error) = observer.notify() {
            failures.push(SubscriberFailure {
                observer: observer_id,
                error,
            });
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(ReactiveError::Propagation { failures })
    }
}
