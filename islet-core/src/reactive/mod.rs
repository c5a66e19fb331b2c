//! Reactive value graph.
//!
//! This module implements fine-grained, automatic dependency tracking
//! between mutable cells and computations.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] is a mutable holder of a value. When read while a
//! computation is executing, the signal links that computation as a
//! subscriber; when written with a different value, every subscriber
//! re-runs synchronously, in subscription order, before the write
//! returns.
//!
//! ## Effects
//!
//! An [`Effect`] is a side-effecting computation. Its source set is
//! rebuilt on every run, so dependencies follow whatever the body
//! actually read last time. Effects guard against self-reentrancy and
//! support disposal from within their own body (deferred to run exit).
//!
//! ## Computeds
//!
//! A [`Computed`] is a derived cell: subscriber of its sources, publisher
//! to its own subscribers. It recomputes on every read and notifies only
//! when the freshly computed value differs from the cached one.
//!
//! # Implementation notes
//!
//! Who-reads-whom is discovered through a thread-local active-computation
//! stack ([`ReactiveContext`]): running a computation pushes a frame,
//! reads record themselves into the top frame, and the computation diffs
//! the collected read-set against its previous one on the way out.
//!
//! All cross-references between cells and computations are by [`NodeId`]
//! through the central graph table, which keeps the bipartite observer
//! graph free of ownership cycles. Propagation is synchronous and
//! unbatched; a failing subscriber never prevents its siblings from
//! observing an update (see [`ReactiveError::Propagation`]).

mod computed;
mod context;
mod effect;
mod graph;
mod node;
mod signal;

pub use computed::Computed;
pub use context::ReactiveContext;
pub use effect::Effect;
pub use graph::{BodyError, ReactiveError, SubscriberFailure, MAX_PROPAGATION_DEPTH};
pub use node::{NodeId, NodeState};
pub use signal::Signal;
