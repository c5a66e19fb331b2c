//! Islet Core
//!
//! This crate provides the core runtime for the Islet island-hydration
//! framework. It implements:
//!
//! - Reactive primitives (signals, computeds, effects) with automatic
//!   dependency tracking and synchronous propagation
//! - An island hydration engine that activates components declared in
//!   pre-rendered markup and wires them to the reactive graph
//!
//! # Architecture
//!
//! The crate is organized into two modules:
//!
//! - `reactive`: Reactive cells, computations, and the dependency graph
//! - `hydrate`: Component discovery, descriptors, and binding dispatch
//!
//! # Example
//!
//! ```rust,ignore
//! use islet_core::reactive::{Signal, Computed, Effect};
//!
//! // Create a signal
//! let count = Signal::new(0);
//!
//! // Create a derived value
//! let doubled = Computed::new(move || count.get() * 2);
//!
//! // Create an effect
//! Effect::new(move || {
//!     println!("Doubled: {}", doubled.get().unwrap());
//! });
//!
//! // Update the signal; the effect re-runs before set() returns
//! count.set(5)?;
//! ```

pub mod hydrate;
pub mod reactive;
