//! Computed implementation.
//!
//! A Computed is a derived cell: it is a subscriber of the sources its
//! body reads, and a publisher to whatever reads it in turn.
//!
//! # How computeds work
//!
//! 1. Every read recomputes the value. The cache exists to prevent
//!    redundant *notification*, not redundant *computation*: subscribers
//!    are only notified when the freshly computed value differs from the
//!    previous one. This trades recompute avoidance for simplicity.
//!
//! 2. Reading inside a running computation links the reader as a
//!    subscriber of this computed; reading outside any computation just
//!    recomputes and returns the value without linking anyone.
//!
//! 3. When a source changes, the computed recomputes immediately and, if
//!    its value changed, cascades to its own subscribers on the same
//!    stack, with the same partial-failure aggregation as a signal write.
//!
//! Run discipline (reentrancy guard, rebuild-per-run source diffing,
//! deferred disposal) is identical to an effect's. Disposal additionally
//! clears the computed's own subscriber set, since nothing should keep
//! observing a disposed derived value.

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::context::ReactiveContext;
use super::graph::{self, BodyError, Observer, ReactiveError};
use super::node::{NodeId, NodeState};

/// A cached, derived reactive value.
///
/// Cloning produces a second handle to the same cell.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(3);
/// let doubled = Computed::new(move || count.get() * 2);
///
/// assert_eq!(doubled.get()?, 6);
/// ```
pub struct Computed<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    inner: Arc<ComputedInner<T>>,
}

struct ComputedInner<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    id: NodeId,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    value: RwLock<Option<T>>,
    state: Mutex<NodeState>,
    sources: Mutex<indexmap::IndexSet<NodeId>>,
}

impl<T> Computed<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Create a new computed and evaluate it once.
    ///
    /// The initial evaluation runs under the computed's own tracking
    /// frame, so a computation that happens to be constructing this
    /// computed is never linked as a subscriber. It also guarantees the
    /// cache is populated from the start.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let inner = Arc::new(ComputedInner {
            id: NodeId::new(),
            compute: Box::new(compute),
            value: RwLock::new(None),
            state: Mutex::new(NodeState::Idle),
            sources: Mutex::new(indexmap::IndexSet::new()),
        });

        graph::register(inner.id, Arc::downgrade(&inner) as Weak<dyn Observer>);
        inner.prime();

        Self { inner }
    }

    /// Get the computed's node ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Recompute and return the value, linking the calling computation.
    ///
    /// Recomputation is skipped only while this computed is already
    /// running (reentrant read) or after disposal; both return the cached
    /// value. If the fresh value differs from the cached one, the
    /// computed's own subscribers are notified before this returns, and
    /// any failures among them surface here as an aggregate error.
    pub fn get(&self) -> Result<T, ReactiveError> {
        let result = self.inner.refresh();

        if ReactiveContext::is_active() {
            ReactiveContext::track_read(self.inner.id);
        }

        result.map(|_| self.inner.cached())
    }

    /// Recompute and return the value without linking anyone.
    pub fn get_untracked(&self) -> Result<T, ReactiveError> {
        self.inner.refresh().map(|_| self.inner.cached())
    }

    /// Return the cached value without recomputing or linking.
    pub fn peek(&self) -> T {
        self.inner.cached()
    }

    /// Dispose of the computed.
    ///
    /// Unsubscribes from every source, drops its own subscriber set, and
    /// makes further reads return the last cached value without
    /// recomputing. Deferred when called from the computed's own body.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Whether the computed has been fully torn down.
    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().is_disposed()
    }

    /// Number of computations currently subscribed to this computed.
    pub fn subscriber_count(&self) -> usize {
        graph::subscriber_count(self.inner.id)
    }
}

/// Restores the state machine when a recompute exits, including by
/// panic, so a compute function that unwinds never leaves the cell
/// wedged at `Running`. Carries out a disposal requested mid-run.
struct RefreshExit<'a, T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    inner: &'a ComputedInner<T>,
}

impl<T> Drop for RefreshExit<'_, T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn drop(&mut self) {
        let deferred = {
            let mut state = self.inner.state.lock();
            if *state == NodeState::PendingDispose {
                *state = NodeState::Disposed;
                true
            } else {
                *state = NodeState::Idle;
                false
            }
        };
        if deferred {
            self.inner.teardown();
        }
    }
}

impl<T> ComputedInner<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// First evaluation: compute, record sources, fill the cache. No
    /// notification, since nothing can be subscribed yet.
    fn prime(&self) {
        {
            let mut state = self.state.lock();
            debug_assert!(state.can_run());
            *state = NodeState::Running;
        }
        let _exit = RefreshExit { inner: self };

        let ctx = ReactiveContext::enter(self.id);
        let value = (self.compute)();
        let new_sources = ReactiveContext::collected_reads();
        drop(ctx);

        self.retarget_sources(new_sources);
        *self.value.write() = Some(value);
    }

    /// Recompute, update the cache, and notify subscribers on change.
    ///
    /// No-op unless the state is `Idle`.
    fn refresh(&self) -> Result<(), ReactiveError> {
        {
            let mut state = self.state.lock();
            if !state.can_run() {
                return Ok(());
            }
            *state = NodeState::Running;
        }

        let changed = {
            let _exit = RefreshExit { inner: self };

            let ctx = ReactiveContext::enter(self.id);
            let fresh = (self.compute)();
            let new_sources = ReactiveContext::collected_reads();
            drop(ctx);

            self.retarget_sources(new_sources);

            let changed = {
                let current = self.value.read();
                current.as_ref() != Some(&fresh)
            };
            if changed {
                *self.value.write() = Some(fresh);
            }
            changed
        };

        // A disposal requested mid-run has been carried out by now;
        // nothing may observe a disposed derived value.
        if changed && !self.state.lock().is_disposed() {
            graph::notify_subscribers(self.id)
        } else {
            Ok(())
        }
    }

    fn cached(&self) -> T {
        self.value
            .read()
            .clone()
            .expect("computed is evaluated at construction")
    }

    fn retarget_sources(&self, new_sources: indexmap::IndexSet<NodeId>) {
        let mut sources = self.sources.lock();

        for old in sources.iter() {
            if !new_sources.contains(old) {
                graph::unsubscribe(*old, self.id);
            }
        }
        for source in new_sources.iter() {
            if !sources.contains(source) {
                graph::subscribe(*source, self.id);
            }
        }

        *sources = new_sources;
    }

    fn dispose(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                NodeState::Disposed | NodeState::PendingDispose => return,
                NodeState::Running => {
                    *state = NodeState::PendingDispose;
                    return;
                }
                NodeState::Idle => *state = NodeState::Disposed,
            }
        }
        self.teardown();
    }

    /// Unsubscribe from every source and drop the computed's own
    /// subscriber set.
    fn teardown(&self) {
        let sources = std::mem::take(&mut *self.sources.lock());
        for source in sources {
            graph::unsubscribe(source, self.id);
        }
        graph::clear_subscribers(self.id);
        graph::unregister(self.id);
    }
}

impl<T> Observer for ComputedInner<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn notify(&self) -> Result<(), BodyError> {
        self.refresh().map_err(BodyError::from)
    }
}

impl<T> Drop for ComputedInner<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn drop(&mut self) {
        graph::unregister(self.id);
    }
}

impl<T> Clone for Computed<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + Send + Sync + PartialEq + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("value", &self.peek())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
