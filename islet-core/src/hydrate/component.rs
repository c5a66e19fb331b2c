//! Component instances and template handles.
//!
//! A [`Component`] is one hydrated instance living on a host element:
//! its id and name, an argument map, resolved refs, the indexed embed
//! list its bindings draw from, and the binding effects it owns.
//!
//! Ancestry between components is not stored; it is derived from the
//! host tree on demand (nearest strict ancestor element that hosts
//! components) and memoized until the subtree moves.
//!
//! A [`TemplateHandle`] pairs inert template content with the
//! descriptors needed to hydrate a fresh copy of it.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tracing::debug;

use super::descriptor::DescriptorSet;
use super::engine::{self, HydrateError};
use super::markup::{Element, EventHandler};
use crate::reactive::{Computed, Effect, Signal};

/// One entry in a component's indexed embed list.
///
/// Binding tokens address embeds by position; the embed's variant
/// decides how the binding behaves (live subscription, one-shot write,
/// or listener registration).
#[derive(Clone)]
pub enum Embed {
    /// A mutable reactive value; bindings subscribe to it.
    Signal(Signal<Value>),
    /// A derived reactive value; bindings subscribe to it.
    Computed(Computed<Value>),
    /// An event callback; event bindings register it as a listener.
    Handler(EventHandler),
    /// A plain value; bindings write it once.
    Static(Value),
}

impl std::fmt::Debug for Embed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Embed::Signal(signal) => f.debug_tuple("Signal").field(&signal.id()).finish(),
            Embed::Computed(computed) => f.debug_tuple("Computed").field(&computed.id()).finish(),
            Embed::Handler(_) => f.write_str("Handler"),
            Embed::Static(value) => f.debug_tuple("Static").field(value).finish(),
        }
    }
}

/// A value held in a component's argument map.
#[derive(Debug, Clone)]
pub enum ArgValue {
    /// Plain JSON data from the descriptor or the hydrate call.
    Json(Value),
    /// A resolved single-component ref.
    Component(Component),
    /// A resolved multi-component ref, in declaration order.
    Components(Vec<Component>),
    /// An element donated by a foreign embed.
    Element(Element),
    /// Elements accumulated by an append-mode foreign embed.
    Elements(Vec<Element>),
    /// A resolved template ref.
    Template(TemplateHandle),
}

/// A resolved cross-reference.
#[derive(Debug, Clone)]
pub enum RefValue {
    /// One target component.
    Component(Component),
    /// Several target components, in declaration order.
    Components(Vec<Component>),
    /// A template, addressed by element id.
    Template(TemplateHandle),
}

/// A hydrated component instance.
///
/// Cloning produces another handle to the same instance.
#[derive(Clone)]
pub struct Component {
    inner: Arc<ComponentInner>,
}

/// Weak handle used where components reference each other through the
/// host tree, so the tree never keeps an instance alive on its own.
#[derive(Clone)]
pub struct WeakComponent {
    inner: Weak<ComponentInner>,
}

struct ComponentInner {
    id: String,
    name: String,
    host: Element,
    args: RwLock<HashMap<String, ArgValue>>,
    refs: RwLock<HashMap<String, RefValue>>,
    embeds: RwLock<Vec<Embed>>,
    effects: Mutex<Vec<Effect>>,
    // Memoized parent lookup: None = not derived yet.
    ancestry: Mutex<Option<Option<WeakComponent>>>,
}

impl Component {
    pub(crate) fn new(id: impl Into<String>, name: impl Into<String>, host: &Element) -> Self {
        Self {
            inner: Arc::new(ComponentInner {
                id: id.into(),
                name: name.into(),
                host: host.clone(),
                args: RwLock::new(HashMap::new()),
                refs: RwLock::new(HashMap::new()),
                embeds: RwLock::new(Vec::new()),
                effects: Mutex::new(Vec::new()),
                ancestry: Mutex::new(None),
            }),
        }
    }

    /// The component id it was declared under.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The namespace-qualified component name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The element hosting this component.
    pub fn host(&self) -> Element {
        self.inner.host.clone()
    }

    /// Look up an argument.
    pub fn arg(&self, name: &str) -> Option<ArgValue> {
        self.inner.args.read().get(name).cloned()
    }

    /// Set or replace an argument.
    pub fn set_arg(&self, name: impl Into<String>, value: ArgValue) {
        self.inner.args.write().insert(name.into(), value);
    }

    /// Append an element to a list-valued argument, creating the list
    /// if absent. A non-list value under the same name is replaced.
    pub fn append_element_arg(&self, name: &str, element: Element) {
        let mut args = self.inner.args.write();
        match args.get_mut(name) {
            Some(ArgValue::Elements(elements)) => elements.push(element),
            _ => {
                args.insert(name.to_string(), ArgValue::Elements(vec![element]));
            }
        }
    }

    /// Look up a resolved ref.
    pub fn ref_value(&self, name: &str) -> Option<RefValue> {
        self.inner.refs.read().get(name).cloned()
    }

    /// Record a resolved ref and mirror it into the argument map, so
    /// setup code finds refs and plain arguments in one place.
    pub(crate) fn set_ref(&self, name: impl Into<String>, value: RefValue) {
        let name = name.into();
        let arg = match &value {
            RefValue::Component(component) => ArgValue::Component(component.clone()),
            RefValue::Components(components) => ArgValue::Components(components.clone()),
            RefValue::Template(template) => ArgValue::Template(template.clone()),
        };
        self.inner.refs.write().insert(name.clone(), value);
        self.inner.args.write().insert(name, arg);
    }

    /// Replace the component's indexed embed list. Called by setup code
    /// before bindings are dispatched.
    pub fn set_embeds(&self, embeds: Vec<Embed>) {
        *self.inner.embeds.write() = embeds;
    }

    /// Look up an embed by binding index.
    pub fn embed(&self, index: usize) -> Option<Embed> {
        self.inner.embeds.read().get(index).cloned()
    }

    /// Number of embeds the component exposes.
    pub fn embed_count(&self) -> usize {
        self.inner.embeds.read().len()
    }

    /// Take ownership of a binding effect; it is disposed with the
    /// component.
    pub(crate) fn push_effect(&self, effect: Effect) {
        self.inner.effects.lock().push(effect);
    }

    /// Number of live binding effects owned by the component.
    pub fn binding_count(&self) -> usize {
        self.inner.effects.lock().len()
    }

    /// Tear down the component's bindings: every owned effect is
    /// disposed and the list is cleared. The component itself remains
    /// usable as inert data.
    pub fn dispose_bindings(&self) {
        let effects = std::mem::take(&mut *self.inner.effects.lock());
        debug!(id = %self.inner.id, count = effects.len(), "disposing bindings");
        for effect in effects {
            effect.dispose();
        }
    }

    /// Defer `f` until the current hydration call completes. Outside a
    /// hydration call, `f` runs immediately.
    pub fn ready<F>(&self, f: F)
    where
        F: FnOnce() + 'static,
    {
        engine::enqueue_ready(f);
    }

    /// The nearest enclosing component, derived from host-tree position
    /// and memoized. [`Element::detach`] invalidates the memo for every
    /// component in the moved subtree.
    pub fn parent(&self) -> Option<Component> {
        if let Some(memo) = self.inner.ancestry.lock().as_ref() {
            return memo.as_ref().and_then(WeakComponent::upgrade);
        }

        let derived = self.derive_parent();
        *self.inner.ancestry.lock() = Some(derived.as_ref().map(Component::downgrade));
        derived
    }

    fn derive_parent(&self) -> Option<Component> {
        let mut cursor = self.inner.host.parent();
        while let Some(element) = cursor {
            if element.hosts_components() {
                if let Some(component) = element.components().into_iter().next() {
                    return Some(component);
                }
            }
            cursor = element.parent();
        }
        None
    }

    /// The outermost enclosing component (self if none).
    pub fn root(&self) -> Component {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Drop the memoized ancestry so the next [`Component::parent`] call
    /// re-derives it from the tree.
    pub fn invalidate_ancestry(&self) {
        *self.inner.ancestry.lock() = None;
    }

    /// Weak handle to this instance.
    pub fn downgrade(&self) -> WeakComponent {
        WeakComponent {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether two handles point at the same instance.
    pub fn ptr_eq(&self, other: &Component) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl WeakComponent {
    /// Recover a strong handle if the instance is still alive.
    pub fn upgrade(&self) -> Option<Component> {
        self.inner.upgrade().map(|inner| Component { inner })
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("embeds", &self.embed_count())
            .field("bindings", &self.binding_count())
            .finish()
    }
}

/// Inert template content plus the descriptors to hydrate a copy of it.
#[derive(Clone)]
pub struct TemplateHandle {
    content: Element,
    descriptors: DescriptorSet,
}

impl TemplateHandle {
    pub(crate) fn new(content: &Element, descriptors: DescriptorSet) -> Self {
        Self {
            content: content.clone(),
            descriptors,
        }
    }

    /// The template element itself (still inert).
    pub fn content(&self) -> Element {
        self.content.clone()
    }

    /// Stamp out and hydrate one instance of the template.
    ///
    /// The content is deep-copied, activated, and hydrated with `args`
    /// merged into its first component. The caller inserts the returned
    /// component's host element wherever the instance should live.
    pub fn create(&self, args: Map<String, Value>) -> Result<Component, HydrateError> {
        let copy = self.content.clone_subtree();
        copy.set_inert(false);

        let scope = engine::hydrate(&copy, &self.descriptors, args)?;
        scope.first().cloned().ok_or(HydrateError::EmptyTemplate)
    }
}

impl std::fmt::Debug for TemplateHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateHandle")
            .field("content", &self.content)
            .field("descriptors", &self.descriptors.len())
            .finish()
    }
}
