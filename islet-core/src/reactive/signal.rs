//! Signal implementation.
//!
//! A Signal is the fundamental reactive primitive: a mutable holder of a
//! value with a set of subscribers.
//!
//! # How signals work
//!
//! 1. When a signal is read while a computation is executing, the read is
//!    recorded so the computation ends up subscribed to the signal.
//!
//! 2. When a signal's value changes, every current subscriber is invoked
//!    synchronously, in subscription order, on the writer's stack.
//!
//! 3. Writing a value equal to the current one is a complete no-op: zero
//!    notifications are issued.
//!
//! The subscriber set is held by the central graph table, not by the
//! signal itself; subscribers register and unregister themselves, so a
//! signal never keeps a computation alive.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::RwLock;

use super::context::ReactiveContext;
use super::graph::{self, ReactiveError};
use super::node::NodeId;

/// A reactive cell holding a value of type `T`.
///
/// Cloning a signal produces a second handle to the same cell.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// let value = count.get();
/// count.set(5)?; // notifies subscribers
/// ```
pub struct Signal<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Graph identity of this cell.
    id: NodeId,

    /// The current value.
    value: Arc<RwLock<T>>,
}

impl<T> Signal<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            id: NodeId::new(),
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// Get the signal's node ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the current value.
    ///
    /// If a computation is currently executing, it is linked as a
    /// subscriber of this signal for its current run.
    pub fn get(&self) -> T {
        if ReactiveContext::is_active() {
            ReactiveContext::track_read(self.id);
        }

        self.value.read().clone()
    }

    /// Get the current value without linking anyone.
    pub fn get_untracked(&self) -> T {
        self.value.read().clone()
    }

    /// Set a new value and notify subscribers.
    ///
    /// Writing the currently-held value is a no-op with zero
    /// notifications. Otherwise the value is stored first, then every
    /// subscriber is invoked in insertion order; failures are collected
    /// and returned as one aggregate error after the whole wave has been
    /// attempted.
    pub fn set(&self, value: T) -> Result<(), ReactiveError> {
        {
            let current = self.value.read();
            if *current == value {
                return Ok(());
            }
        }

        *self.value.write() = value;
        graph::notify_subscribers(self.id)
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F) -> Result<(), ReactiveError>
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let guard = self.value.read();
            f(&guard)
        };
        self.set(next)
    }

    /// Number of computations currently subscribed to this signal.
    pub fn subscriber_count(&self) -> usize {
        graph::subscriber_count(self.id)
    }
}

impl<T> Clone for Signal<T>
where
    T: Clone + Send + Sync + PartialEq + 'static,
{
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + Send + Sync + PartialEq + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
