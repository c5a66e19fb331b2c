//! Island hydration.
//!
//! A server renders a page as plain markup; interactive regions
//! ("islands") are declared inline through three attributes and an
//! out-of-band descriptor payload. This module turns those declarations
//! into live [`Component`] instances wired to the reactive graph.
//!
//! # Concepts
//!
//! ## Host tree
//!
//! [`Element`] is the engine's view of the pre-rendered tree: attribute
//! access for the declared encodings, text/markup/attribute mutation,
//! listener registration, and structural walking. Inert subtrees
//! (templates) are invisible to hydration until stamped out.
//!
//! ## Descriptors
//!
//! Each declared component id maps to a [`ComponentDescriptor`]: name,
//! optional setup module, initial arguments, cross-references. The whole
//! payload parses up front into a [`DescriptorSet`].
//!
//! ## Hydration
//!
//! [`hydrate`] walks the subtree in ordered passes: discover components,
//! merge caller arguments, patch foreign embeds, resolve refs, then per
//! component run its registered setup routine and dispatch the binding
//! tokens in its region. Callbacks deferred with [`Component::ready`]
//! run once the whole scope is bound.
//!
//! Setup routines hold the application logic: they read the component's
//! arguments and publish an indexed list of [`Embed`]s for the binding
//! pass to connect.

mod binding;
mod component;
mod descriptor;
mod engine;
mod markup;

pub use binding::{render_value, BindingKind, BindingToken};
pub use component::{ArgValue, Component, Embed, RefValue, TemplateHandle, WeakComponent};
pub use descriptor::{
    is_array_name, is_template_ref, strip_ref_name, ComponentDescriptor, DescriptorSet, RefTarget,
    ARRAY_NAME_SUFFIX, TEMPLATE_REF_PREFIX,
};
pub use engine::{
    enqueue_ready, hydrate, register_setup, HydrateError, HydrationScope, SetupFn,
};
pub use markup::{Element, Event, EventHandler, ARG_ATTR, COMPONENT_ATTR, EMBED_ATTR};
