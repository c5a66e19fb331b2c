//! Effect implementation.
//!
//! An Effect is a side-effecting computation that re-runs whenever any
//! cell it read during its last run changes.
//!
//! # How effects work
//!
//! 1. When created, the effect runs its body immediately to establish
//!    its initial source set.
//!
//! 2. The source set is rebuilt on every run: reads are collected during
//!    execution, and on the way out the effect subscribes/unsubscribes
//!    for exactly the difference against the previous run. Sources that
//!    are no longer read are dropped; sources that survive keep their
//!    position in each subscriber set.
//!
//! 3. While the body is executing, a reentrant run of the same effect is
//!    a no-op. This guards self-referential write-during-run cycles.
//!
//! 4. Disposal requested from within the running body is deferred: the
//!    current run finishes, then the effect unsubscribes from everything.
//!
//! # Failure
//!
//! Bodies created with [`Effect::try_new`] may fail; the error is carried
//! to whoever triggered the run (for a propagation wave, that is the
//! writer, as part of the wave's aggregate error). There is no retry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::Mutex;

use super::context::ReactiveContext;
use super::graph::{self, BodyError, Observer};
use super::node::{NodeId, NodeState};

type EffectBody = Box<dyn Fn() -> Result<(), BodyError> + Send + Sync>;

/// A side-effecting computation that runs when its sources change.
///
/// Cloning produces a second handle to the same effect. The effect stays
/// alive as long as at least one handle does; dropping the last handle
/// removes it from the graph.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// let effect = Effect::new(move || {
///     println!("count is {}", count.get());
/// });
///
/// // prints "count is 5" before set() returns
/// count.set(5)?;
/// ```
pub struct Effect {
    inner: Arc<EffectInner>,
}

struct EffectInner {
    id: NodeId,
    body: EffectBody,
    state: Mutex<NodeState>,
    sources: Mutex<IndexSet<NodeId>>,
    run_count: AtomicUsize,
}

impl Effect {
    /// Create an effect with an infallible body and run it once.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (effect, result) = Self::build(Box::new(move || {
            f();
            Ok(())
        }));
        debug_assert!(result.is_ok(), "infallible body cannot fail");
        effect
    }

    /// Create an effect with a fallible body and run it once.
    ///
    /// An error from the initial run is returned to the constructor's
    /// caller; the half-built effect is discarded.
    pub fn try_new<F>(f: F) -> Result<Self, BodyError>
    where
        F: Fn() -> Result<(), BodyError> + Send + Sync + 'static,
    {
        let (effect, result) = Self::build(Box::new(f));
        result.map(|_| effect)
    }

    fn build(body: EffectBody) -> (Self, Result<(), BodyError>) {
        let inner = Arc::new(EffectInner {
            id: NodeId::new(),
            body,
            state: Mutex::new(NodeState::Idle),
            sources: Mutex::new(IndexSet::new()),
            run_count: AtomicUsize::new(0),
        });

        graph::register(inner.id, Arc::downgrade(&inner) as Weak<dyn Observer>);

        let result = inner.run();
        (Self { inner }, result)
    }

    /// Get the effect's node ID.
    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Re-run the effect body.
    ///
    /// No-op while the effect is already running or after disposal.
    pub fn run(&self) -> Result<(), BodyError> {
        self.inner.run()
    }

    /// Dispose of the effect.
    ///
    /// From inside the effect's own running body this defers: the current
    /// run completes first, and only then is the effect removed from
    /// every subscriber set. Disposing twice is a no-op.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    /// Whether the effect has been fully torn down.
    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().is_disposed()
    }

    /// Number of completed runs.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Number of sources read during the last run.
    pub fn source_count(&self) -> usize {
        self.inner.sources.lock().len()
    }
}

/// Restores the state machine when a run exits, including by panic, so
/// a body that unwinds never leaves the effect wedged at `Running`.
/// Carries out a disposal requested mid-run.
struct RunExit<'a> {
    inner: &'a EffectInner,
}

impl Drop for RunExit<'_> {
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

impl EffectInner {
    fn run(&self) -> Result<(), BodyError> {
        {
            let mut state = self.state.lock();
            if !state.can_run() {
                return Ok(());
            }
            *state = NodeState::Running;
        }
        let _exit = RunExit { inner: self };

        let ctx = ReactiveContext::enter(self.id);
        let result = (self.body)();
        let new_sources = ReactiveContext::collected_reads();
        drop(ctx);

        self.retarget_sources(new_sources);
        self.run_count.fetch_add(1, Ordering::SeqCst);

        result
    }

    /// Apply the difference between the previous and the fresh read-set:
    /// unsubscribe from sources no longer read, subscribe to new ones.
    fn retarget_sources(&self, new_sources: IndexSet<NodeId>) {
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

    /// Remove self from every source's subscriber set and from the
    /// dispatch registry. Called only after the state is `Disposed`.
    fn teardown(&self) {
        let sources = std::mem::take(&mut *self.sources.lock());
        for source in sources {
            graph::unsubscribe(source, self.id);
        }
        graph::unregister(self.id);
    }
}

impl Observer for EffectInner {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn notify(&self) -> Result<(), BodyError> {
        self.run()
    }
}

impl Drop for EffectInner {
    fn drop(&mut self) {
        graph::unregister(self.id);
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("state", &*self.inner.state.lock())
            .field("run_count", &self.run_count())
            .field("source_count", &self.source_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::signal::Signal;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_on_creation() {
        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();

        let _effect = Effect::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_reruns_when_source_changes() {
        let signal = Signal::new(0);
        let seen = Arc::new(Mutex::new(Vec::new()));

        let signal_clone = signal.clone();
        let seen_clone = seen.clone();
        let _effect = Effect::new(move || {
            seen_clone.lock().push(signal_clone.get());
        });

        assert_eq!(*seen.lock(), vec![0]);

        signal.set(0).unwrap();
        assert_eq!(*seen.lock(), vec![0]);

        signal.set(2).unwrap();
        assert_eq!(*seen.lock(), vec![0, 2]);
    }

    #[test]
    fn stale_sources_are_pruned() {
        let toggle = Signal::new(true);
        let a = Signal::new(1);
        let b = Signal::new(2);

        let t = toggle.clone();
        let (a2, b2) = (a.clone(), b.clone());
        let effect = Effect::new(move || {
            if t.get() {
                a2.get();
            } else {
                b2.get();
            }
        });

        assert!(graph::is_subscribed(a.id(), effect.id()));
        assert!(!graph::is_subscribed(b.id(), effect.id()));

        toggle.set(false).unwrap();

        assert!(!graph::is_subscribed(a.id(), effect.id()));
        assert!(graph::is_subscribed(b.id(), effect.id()));

        // Writing the dropped source no longer reruns the effect.
        let before = effect.run_count();
        a.set(10).unwrap();
        assert_eq!(effect.run_count(), before);
    }

    #[test]
    fn self_write_does_not_recurse() {
        let signal = Signal::new(0);
        let runs = Arc::new(AtomicI32::new(0));

        let s = signal.clone();
        let runs_clone = runs.clone();
        let _effect = Effect::try_new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            let v = s.get();
            if v < 100 {
                // Reentrant trigger: ignored while this body is running.
                s.set(v + 1)?;
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 1);

        signal.set(50).unwrap();
        // One external trigger, exactly one additional run.
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(signal.get(), 51);
    }

    #[test]
    fn dispose_from_own_body_is_deferred() {
        let signal = Signal::new(0);
        let slot: Arc<Mutex<Option<Effect>>> = Arc::new(Mutex::new(None));

        let s = signal.clone();
        let slot_clone = slot.clone();
        let effect = Effect::new(move || {
            let v = s.get();
            if v == 1 {
                if let Some(me) = slot_clone.lock().as_ref() {
                    me.dispose();
                    // Still mid-run: teardown has not happened yet.
                    assert!(!me.is_disposed());
                }
            }
        });
        *slot.lock() = Some(effect.clone());

        assert!(graph::is_subscribed(signal.id(), effect.id()));

        signal.set(1).unwrap();

        assert!(effect.is_disposed());
        assert!(!graph::is_subscribed(signal.id(), effect.id()));
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn panicking_body_releases_the_running_state() {
        let signal = Signal::new(0);
        let runs = Arc::new(AtomicI32::new(0));

        let s = signal.clone();
        let runs_clone = runs.clone();
        let effect = Effect::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            if s.get() == 1 {
                panic!("body blew up");
            }
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| signal.set(1)));
        assert!(unwound.is_err());
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        // Not wedged at Running: the next write reruns the body.
        signal.set(2).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert!(!effect.is_disposed());
    }

    #[test]
    fn disposed_effect_ignores_runs() {
        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();

        let effect = Effect::new(move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        effect.dispose();
        assert!(effect.is_disposed());

        effect.run().unwrap();
        effect.dispose();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_clone_shares_state() {
        let effect1 = Effect::new(|| {});
        let effect2 = effect1.clone();

        assert_eq!(effect1.id(), effect2.id());
        assert_eq!(effect1.run_count(), 1);

        effect1.run().unwrap();
        assert_eq!(effect2.run_count(), 2);

        effect1.dispose();
        assert!(effect2.is_disposed());
    }
}
