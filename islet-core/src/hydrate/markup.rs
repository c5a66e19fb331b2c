//! Host-tree stand-in.
//!
//! The real pre-rendered page tree belongs to the embedding application;
//! the hydration engine only needs a small surface of it: attribute
//! lookup for the declared encodings, text/markup/attribute mutation for
//! bindings, event listener registration, a private data bag, and
//! structural walking. [`Element`] provides exactly that surface.
//!
//! Elements are cheap-clone handles sharing one node; parents are held
//! weakly so subtrees own their children and nothing cycles.
//!
//! # Encoding attributes
//!
//! - [`COMPONENT_ATTR`]: space-separated component ids hosted by the
//!   element.
//! - [`EMBED_ATTR`]: space-separated binding tokens
//!   (`[componentId/]<index>-<kind>[-<arg>]`).
//! - [`ARG_ATTR`]: space-separated foreign-embed tokens
//!   (`name-componentId`, a `:a` name suffix appends to a list).
//!
//! Inert elements (template content) are skipped by every hydration
//! walk; only id lookup sees through them.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;
use smallvec::SmallVec;

use super::component::{Component, Embed, WeakComponent};

/// Attribute carrying the element's hosted component ids.
pub const COMPONENT_ATTR: &str = "islet";

/// Attribute carrying the element's binding tokens.
pub const EMBED_ATTR: &str = "islet-embed";

/// Attribute carrying the element's foreign-embed tokens.
pub const ARG_ATTR: &str = "islet-arg";

/// An event delivered to listeners registered by event bindings.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event name, e.g. `"click"`.
    pub name: String,
    /// Arbitrary payload.
    pub detail: Value,
}

impl Event {
    /// Create an event with no payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail: Value::Null,
        }
    }

    /// Attach a payload.
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }
}

/// Callback registered for an event binding.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle to one node of the host tree.
#[derive(Clone)]
pub struct Element {
    inner: Arc<RwLock<ElementData>>,
}

struct ElementData {
    tag: String,
    id: Option<String>,
    attributes: BTreeMap<String, String>,
    text: String,
    markup: String,
    inert: bool,
    children: Vec<Element>,
    parent: Weak<RwLock<ElementData>>,
    listeners: HashMap<String, Vec<EventHandler>>,
    data: HashMap<String, Embed>,
    components: SmallVec<[WeakComponent; 1]>,
}

impl Element {
    /// Create a detached element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ElementData {
                tag: tag.into(),
                id: None,
                attributes: BTreeMap::new(),
                text: String::new(),
                markup: String::new(),
                inert: false,
                children: Vec::new(),
                parent: Weak::new(),
                listeners: HashMap::new(),
                data: HashMap::new(),
                components: SmallVec::new(),
            })),
        }
    }

    /// Create a template element. Templates are inert: hydration walks
    /// skip them entirely until their content is cloned and activated.
    pub fn template() -> Self {
        let element = Self::new("template");
        element.set_inert(true);
        element
    }

    /// Builder: set the element id.
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.inner.write().id = Some(id.into());
        self
    }

    /// Builder: set an attribute.
    pub fn with_attr(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Builder: set the text content.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.inner.write().text = text.into();
        self
    }

    /// Builder: append a child.
    pub fn with_child(self, child: &Element) -> Self {
        self.append_child(child);
        self
    }

    /// The element's tag name.
    pub fn tag(&self) -> String {
        self.inner.read().tag.clone()
    }

    /// The element's id, if any.
    pub fn element_id(&self) -> Option<String> {
        self.inner.read().id.clone()
    }

    /// Look up an attribute value.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.read().attributes.get(name).cloned()
    }

    /// Set an attribute value.
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.write().attributes.insert(name.into(), value.into());
    }

    /// Split an attribute into whitespace-separated tokens.
    pub fn attr_tokens(&self, name: &str) -> Vec<String> {
        self.attribute(name)
            .map(|value| value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// The element's text content.
    pub fn text(&self) -> String {
        self.inner.read().text.clone()
    }

    /// Replace the element's text content.
    pub fn set_text(&self, text: impl Into<String>) {
        self.inner.write().text = text.into();
    }

    /// The element's inner markup.
    pub fn markup(&self) -> String {
        self.inner.read().markup.clone()
    }

    /// Replace the element's inner markup.
    pub fn set_markup(&self, markup: impl Into<String>) {
        self.inner.write().markup = markup.into();
    }

    /// Whether hydration walks skip this element.
    pub fn is_inert(&self) -> bool {
        self.inner.read().inert
    }

    /// Mark the element (non-)hydratable.
    pub fn set_inert(&self, inert: bool) {
        self.inner.write().inert = inert;
    }

    /// Append `child`, reparenting it onto this element.
    pub fn append_child(&self, child: &Element) {
        child.inner.write().parent = Arc::downgrade(&self.inner);
        self.inner.write().children.push(child.clone());
    }

    /// Snapshot of the element's children.
    pub fn children(&self) -> Vec<Element> {
        self.inner.read().children.clone()
    }

    /// The element's parent, if attached.
    pub fn parent(&self) -> Option<Element> {
        self.inner
            .read()
            .parent
            .upgrade()
            .map(|inner| Element { inner })
    }

    /// Detach this element from its parent.
    ///
    /// Memoized ancestry of every component hosted in the detached
    /// subtree is invalidated, since subtree position is what those
    /// caches are derived from.
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent
                .inner
                .write()
                .children
                .retain(|child| !child.ptr_eq(self));
        }
        self.inner.write().parent = Weak::new();

        self.invalidate_subtree_ancestry();
    }

    fn invalidate_subtree_ancestry(&self) {
        for component in self.components() {
            component.invalidate_ancestry();
        }
        for child in self.children() {
            child.invalidate_subtree_ancestry();
        }
    }

    /// Register an event listener.
    pub fn add_listener(&self, event: impl Into<String>, handler: EventHandler) {
        self.inner
            .write()
            .listeners
            .entry(event.into())
            .or_default()
            .push(handler);
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .read()
            .listeners
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Deliver an event to every listener registered for its name.
    pub fn fire(&self, event: &Event) {
        let handlers: Vec<EventHandler> = self
            .inner
            .read()
            .listeners
            .get(&event.name)
            .cloned()
            .unwrap_or_default();
        for handler in handlers {
            handler(event);
        }
    }

    /// Store a value in the element's private data bag.
    pub fn set_data(&self, key: impl Into<String>, value: Embed) {
        self.inner.write().data.insert(key.into(), value);
    }

    /// Retrieve a value from the element's private data bag.
    pub fn data(&self, key: &str) -> Option<Embed> {
        self.inner.read().data.get(key).cloned()
    }

    /// Whether the element declares hosted component ids.
    pub fn hosts_components(&self) -> bool {
        self.attribute(COMPONENT_ATTR)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    }

    /// Components hosted by this element, in hosting order.
    pub fn components(&self) -> Vec<Component> {
        self.inner
            .read()
            .components
            .iter()
            .filter_map(WeakComponent::upgrade)
            .collect()
    }

    pub(crate) fn attach_component(&self, component: &Component) {
        self.inner.write().components.push(component.downgrade());
    }

    /// Deep-copy the element's structure: tag, id, attributes, text,
    /// markup, inert flag, and children. Listeners, data bags, and
    /// hosted components are not copied; a clone starts unhydrated.
    pub fn clone_subtree(&self) -> Element {
        let (copy, children) = {
            let data = self.inner.read();
            let copy = Element::new(data.tag.clone());
            {
                let mut inner = copy.inner.write();
                inner.id = data.id.clone();
                inner.attributes = data.attributes.clone();
                inner.text = data.text.clone();
                inner.markup = data.markup.clone();
                inner.inert = data.inert;
            }
            (copy, data.children.clone())
        };

        for child in children {
            copy.append_child(&child.clone_subtree());
        }
        copy
    }

    /// Depth-first search for an element id, seeing through inert
    /// subtrees (templates must stay addressable).
    pub fn find_by_id(&self, id: &str) -> Option<Element> {
        if self.element_id().as_deref() == Some(id) {
            return Some(self.clone());
        }
        for child in self.children() {
            if let Some(found) = child.find_by_id(id) {
                return Some(found);
            }
        }
        None
    }

    /// Whether two handles point at the same node.
    pub fn ptr_eq(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.inner.read();
        f.debug_struct("Element")
            .field("tag", &data.tag)
            .field("id", &data.id)
            .field("children", &data.children.len())
            .field("inert", &data.inert)
            .finish()
    }
}
