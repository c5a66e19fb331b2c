//! Hydration engine.
//!
//! [`hydrate`] activates a pre-rendered subtree in six ordered passes:
//!
//! 1. **Discover**: depth-first walk collecting every component id
//!    declared on a non-inert element, instantiating a [`Component`]
//!    per id from its descriptor. Duplicate ids and ids without a
//!    descriptor abort hydration.
//! 2. **Merge**: caller-supplied arguments merge into the first
//!    discovered component.
//! 3. **Foreign embeds**: elements donating themselves into another
//!    component's arguments are patched in.
//! 4. **Refs**: declared cross-references resolve to live components or
//!    template handles and land in each component's argument map.
//! 5. **Setup + bind**: per component in discovery order, its setup
//!    routine runs (populating the embed list), then binding tokens in
//!    its region are dispatched.
//! 6. **Ready**: callbacks deferred during the call run once everything
//!    is bound.
//!
//! Setup routines are looked up in a process-wide registry keyed by
//! module path; the import indirection a browser runtime would do is
//! collapsed into that synchronous lookup.
//!
//! The ready queue is thread-local. Hydration is a single-threaded
//! affair per tree; a nested [`hydrate`] (a template stamped from a
//! setup routine) shares the queue but only the outermost call drains
//! it.

use std::cell::Cell;
use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::binding::{self, BindingToken};
use super::component::{ArgValue, Component, RefValue, TemplateHandle};
use super::descriptor::{
    is_array_name, is_template_ref, strip_ref_name, DescriptorSet, RefTarget, ARRAY_NAME_SUFFIX,
};
use super::markup::{Element, ARG_ATTR, COMPONENT_ATTR, EMBED_ATTR};
use crate::reactive::BodyError;

/// Error from a [`hydrate`] call.
#[derive(Debug, Error)]
pub enum HydrateError {
    /// The same component id is declared on more than one element.
    #[error("component id `{0}` is declared more than once")]
    DuplicateId(String),

    /// An element declares a component id with no descriptor.
    #[error("no descriptor for component id `{0}`")]
    UnknownId(String),

    /// A declared ref targets an id that does not resolve.
    #[error("ref `{name}` on component `{component}` targets unknown `{target}`")]
    UnknownRef {
        component: String,
        name: String,
        target: String,
    },

    /// A descriptor names a setup module that was never registered.
    #[error("no setup routine registered for module `{0}`")]
    UnknownModule(String),

    /// A setup routine failed.
    #[error("setup for component `{id}` failed: {error}")]
    Setup { id: String, error: BodyError },

    /// Template content hydrated to zero components.
    #[error("template content declares no components")]
    EmptyTemplate,

    /// The descriptor payload did not parse.
    #[error("malformed descriptor payload: {0}")]
    Descriptor(#[from] serde_json::Error),
}

/// A component setup routine: receives the freshly discovered component
/// with its arguments and refs resolved, and populates its embed list.
pub type SetupFn = Arc<dyn Fn(&Component) -> Result<(), BodyError> + Send + Sync>;

static SETUP_REGISTRY: OnceLock<DashMap<String, SetupFn>> = OnceLock::new();

fn setup_registry() -> &'static DashMap<String, SetupFn> {
    SETUP_REGISTRY.get_or_init(DashMap::new)
}

/// Register the setup routine for a module path. Replaces any previous
/// registration under the same path.
pub fn register_setup<F>(module: impl Into<String>, setup: F)
where
    F: Fn(&Component) -> Result<(), BodyError> + Send + Sync + 'static,
{
    setup_registry().insert(module.into(), Arc::new(setup));
}

thread_local! {
    static READY_QUEUE: RefCell<Vec<Box<dyn FnOnce()>>> = RefCell::new(Vec::new());
    static HYDRATE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Defer `f` until the outermost in-flight [`hydrate`] call finishes.
/// With no hydration in flight, `f` runs immediately.
pub fn enqueue_ready<F>(f: F)
where
    F: FnOnce() + 'static,
{
    if HYDRATE_DEPTH.with(Cell::get) == 0 {
        f();
    } else {
        READY_QUEUE.with(|queue| queue.borrow_mut().push(Box::new(f)));
    }
}

fn drain_ready() {
    // Callbacks may enqueue further callbacks; keep going until quiet.
    loop {
        let batch = READY_QUEUE.with(|queue| std::mem::take(&mut *queue.borrow_mut()));
        if batch.is_empty() {
            break;
        }
        for callback in batch {
            callback();
        }
    }
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        HYDRATE_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }

    fn is_outermost(&self) -> bool {
        HYDRATE_DEPTH.with(Cell::get) == 1
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        HYDRATE_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

/// The components produced by one [`hydrate`] call, in discovery order.
#[derive(Debug, Default)]
pub struct HydrationScope {
    components: IndexMap<String, Component>,
    ready: bool,
}

impl HydrationScope {
    /// The first component in document order, if any.
    pub fn first(&self) -> Option<&Component> {
        self.components.values().next()
    }

    /// Look up a component by id.
    pub fn get(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    /// Components in discovery order.
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Number of components in the scope.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the scope is empty.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Whether deferred ready callbacks have run. False for a scope
    /// produced by a nested hydration; its callbacks run when the
    /// outermost call finishes.
    pub fn is_ready(&self) -> bool {
        self.ready
    }
}

/// Activate the subtree under `root`.
///
/// `top_args` merge into the first discovered component, taking
/// precedence over its descriptor arguments. Inert subtrees are
/// skipped. On error, nothing is rolled back; the caller discards the
/// partially hydrated tree.
pub fn hydrate(
    root: &Element,
    descriptors: &DescriptorSet,
    top_args: Map<String, Value>,
) -> Result<HydrationScope, HydrateError> {
    let guard = DepthGuard::enter();

    let mut scope = HydrationScope::default();
    discover(root, descriptors, &mut scope)?;
    debug!(components = scope.len(), "discovered components");

    if let Some(first) = scope.first() {
        for (name, value) in top_args {
            first.set_arg(name, ArgValue::Json(value));
        }
    }

    patch_foreign_embeds(root, &scope);
    resolve_refs(root, descriptors, &scope)?;

    for component in scope.components() {
        run_setup(descriptors, component)?;
        bind_component(component);
    }

    if guard.is_outermost() {
        drop(guard);
        drain_ready();
        scope.ready = true;
    }

    Ok(scope)
}

/// Pass 1: collect declared components, document order, skipping inert
/// subtrees.
fn discover(
    element: &Element,
    descriptors: &DescriptorSet,
    scope: &mut HydrationScope,
) -> Result<(), HydrateError> {
    if element.is_inert() {
        return Ok(());
    }

    for id in element.attr_tokens(COMPONENT_ATTR) {
        if scope.components.contains_key(&id) {
            return Err(HydrateError::DuplicateId(id));
        }
        let descriptor = descriptors
            .get(&id)
            .ok_or_else(|| HydrateError::UnknownId(id.clone()))?;

        let component = Component::new(&id, &descriptor.name, element);
        for (name, value) in &descriptor.args {
            component.set_arg(name.clone(), ArgValue::Json(value.clone()));
        }
        element.attach_component(&component);
        scope.components.insert(id, component);
    }

    for child in element.children() {
        discover(&child, descriptors, scope)?;
    }
    Ok(())
}

/// Pass 3: elements carrying `name-componentId` tokens donate themselves
/// into the named component's arguments. Unknown targets are logged and
/// skipped, since the target may belong to an enclosing scope.
fn patch_foreign_embeds(element: &Element, scope: &HydrationScope) {
    if element.is_inert() {
        return;
    }

    for token in element.attr_tokens(ARG_ATTR) {
        let Some((name, target)) = token.rsplit_once('-') else {
            warn!(%token, "malformed foreign-embed token, skipping");
            continue;
        };
        let Some(component) = scope.get(target) else {
            warn!(%token, target, "foreign embed targets unknown component, skipping");
            continue;
        };
        if is_array_name(name) {
            let name = name.trim_end_matches(ARRAY_NAME_SUFFIX);
            component.append_element_arg(name, element.clone());
        } else {
            component.set_arg(name, ArgValue::Element(element.clone()));
        }
    }

    for child in element.children() {
        patch_foreign_embeds(&child, scope);
    }
}

/// Pass 4: resolve declared refs to components or templates and record
/// them on their owners.
fn resolve_refs(
    root: &Element,
    descriptors: &DescriptorSet,
    scope: &HydrationScope,
) -> Result<(), HydrateError> {
    for (id, component) in &scope.components {
        let Some(descriptor) = descriptors.get(id) else {
            continue;
        };

        for (raw_name, target) in &descriptor.refs {
            let name = strip_ref_name(raw_name);

            let value = if is_template_ref(raw_name) {
                match target {
                    RefTarget::Id(element_id) => {
                        let content = root.find_by_id(element_id).ok_or_else(|| {
                            HydrateError::UnknownRef {
                                component: id.clone(),
                                name: raw_name.clone(),
                                target: element_id.clone(),
                            }
                        })?;
                        RefValue::Template(TemplateHandle::new(&content, descriptors.clone()))
                    }
                    RefTarget::Ids(_) => {
                        warn!(
                            component = %id,
                            name = %raw_name,
                            "template ref cannot be a list, skipping"
                        );
                        continue;
                    }
                }
            } else {
                match target {
                    RefTarget::Id(target_id) => {
                        let target = scope.get(target_id).ok_or_else(|| {
                            HydrateError::UnknownRef {
                                component: id.clone(),
                                name: raw_name.clone(),
                                target: target_id.clone(),
                            }
                        })?;
                        RefValue::Component(target.clone())
                    }
                    RefTarget::Ids(target_ids) => {
                        let mut targets = Vec::with_capacity(target_ids.len());
                        for target_id in target_ids {
                            let target = scope.get(target_id).ok_or_else(|| {
                                HydrateError::UnknownRef {
                                    component: id.clone(),
                                    name: raw_name.clone(),
                                    target: target_id.clone(),
                                }
                            })?;
                            targets.push(target.clone());
                        }
                        RefValue::Components(targets)
                    }
                }
            };

            component.set_ref(name, value);
        }
    }
    Ok(())
}

/// Pass 5a: run the component's setup routine, if its descriptor names
/// one.
fn run_setup(descriptors: &DescriptorSet, component: &Component) -> Result<(), HydrateError> {
    let Some(descriptor) = descriptors.get(component.id()) else {
        return Ok(());
    };
    let Some(module) = descriptor.url.as_deref() else {
        return Ok(());
    };

    let setup = setup_registry()
        .get(module)
        .map(|entry| Arc::clone(entry.value()))
        .ok_or_else(|| HydrateError::UnknownModule(module.to_string()))?;

    debug!(id = component.id(), module, "running setup");
    setup(component).map_err(|error| HydrateError::Setup {
        id: component.id().to_string(),
        error,
    })
}

/// Pass 5b: dispatch binding tokens in the component's region.
///
/// The walk descends from the component's host but stops at elements
/// hosting other components; such boundary elements still get their
/// tokens examined so explicitly scoped tokens can reach across.
/// Unscoped tokens apply only where the region's owner is this
/// component.
fn bind_component(component: &Component) {
    visit_region(&component.host(), component, true);
}

fn visit_region(element: &Element, component: &Component, is_region_root: bool) {
    if element.is_inert() {
        return;
    }

    let hosted_ids = element.attr_tokens(COMPONENT_ATTR);
    let owns_unscoped =
        hosted_ids.is_empty() || hosted_ids.first().map(String::as_str) == Some(component.id());

    for raw in element.attr_tokens(EMBED_ATTR) {
        let Some(token) = BindingToken::parse(&raw) else {
            warn!(token = %raw, "malformed binding token, skipping");
            continue;
        };
        let applies = match &token.scope {
            Some(scope) => scope == component.id(),
            None => owns_unscoped,
        };
        if applies {
            binding::apply(component, element, &token);
        }
    }

    // Elements hosting components delimit a nested region; its interior
    // belongs to the nested component's own binding pass.
    if is_region_root || hosted_ids.is_empty() {
        for child in element.children() {
            visit_region(&child, component, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrate::component::Embed;
    use crate::hydrate::markup::Event;
    use crate::reactive::Signal;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn descriptor(name: &str, url: Option<&str>) -> crate::hydrate::descriptor::ComponentDescriptor {
        crate::hydrate::descriptor::ComponentDescriptor {
            name: name.to_string(),
            url: url.map(str::to_string),
            args: Map::new(),
            refs: std::collections::HashMap::new(),
        }
    }

    #[test]
    fn discovery_is_document_order_and_skips_inert() {
        let root = Element::new("div").with_attr(COMPONENT_ATTR, "a");
        let mid = Element::new("div").with_attr(COMPONENT_ATTR, "b");
        let leaf = Element::new("span").with_attr(COMPONENT_ATTR, "c");
        let hidden = Element::new("template").with_attr(COMPONENT_ATTR, "d");
        hidden.set_inert(true);
        root.append_child(&mid);
        mid.append_child(&leaf);
        root.append_child(&hidden);

        let mut descriptors = DescriptorSet::new();
        for id in ["a", "b", "c", "d"] {
            descriptors.insert(id, descriptor("test:stub", None));
        }

        let scope = hydrate(&root, &descriptors, Map::new()).unwrap();
        let ids: Vec<&str> = scope.components().map(Component::id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(scope.is_ready());
    }

    #[test]
    fn duplicate_and_unknown_ids_are_fatal() {
        let root = Element::new("div").with_attr(COMPONENT_ATTR, "a a");
        let mut descriptors = DescriptorSet::new();
        descriptors.insert("a", descriptor("test:stub", None));
        assert!(matches!(
            hydrate(&root, &descriptors, Map::new()),
            Err(HydrateError::DuplicateId(id)) if id == "a"
        ));

        let root = Element::new("div").with_attr(COMPONENT_ATTR, "ghost");
        assert!(matches!(
            hydrate(&root, &DescriptorSet::new(), Map::new()),
            Err(HydrateError::UnknownId(id)) if id == "ghost"
        ));
    }

    #[test]
    fn top_args_override_descriptor_args() {
        let root = Element::new("div").with_attr(COMPONENT_ATTR, "a");
        let mut descriptors = DescriptorSet::new();
        let mut desc = descriptor("test:stub", None);
        desc.args.insert("start".into(), json!(1));
        desc.args.insert("label".into(), json!("kept"));
        descriptors.insert("a", desc);

        let mut top = Map::new();
        top.insert("start".into(), json!(9));

        let scope = hydrate(&root, &descriptors, top).unwrap();
        let component = scope.get("a").unwrap();
        match component.arg("start") {
            Some(ArgValue::Json(v)) => assert_eq!(v, json!(9)),
            other => panic!("expected json arg, got {other:?}"),
        }
        match component.arg("label") {
            Some(ArgValue::Json(v)) => assert_eq!(v, json!("kept")),
            other => panic!("expected json arg, got {other:?}"),
        }
    }

    #[test]
    fn foreign_embeds_patch_and_append() {
        let root = Element::new("div").with_attr(COMPONENT_ATTR, "a");
        let slot = Element::new("div").with_attr(ARG_ATTR, "panel-a");
        let row1 = Element::new("li").with_attr(ARG_ATTR, "rows:a-a");
        let row2 = Element::new("li").with_attr(ARG_ATTR, "rows:a-a");
        let stray = Element::new("li").with_attr(ARG_ATTR, "x-nobody");
        root.append_child(&slot);
        root.append_child(&row1);
        root.append_child(&row2);
        root.append_child(&stray);

        let mut descriptors = DescriptorSet::new();
        descriptors.insert("a", descriptor("test:stub", None));

        let scope = hydrate(&root, &descriptors, Map::new()).unwrap();
        let component = scope.get("a").unwrap();

        match component.arg("panel") {
            Some(ArgValue::Element(element)) => assert!(element.ptr_eq(&slot)),
            other => panic!("expected element arg, got {other:?}"),
        }
        match component.arg("rows") {
            Some(ArgValue::Elements(elements)) => {
                assert_eq!(elements.len(), 2);
                assert!(elements[0].ptr_eq(&row1));
                assert!(elements[1].ptr_eq(&row2));
            }
            other => panic!("expected element list, got {other:?}"),
        }
        assert!(component.arg("x").is_none());
    }

    #[test]
    fn refs_resolve_to_components_and_templates() {
        let root = Element::new("div").with_attr(COMPONENT_ATTR, "a");
        let other = Element::new("div").with_attr(COMPONENT_ATTR, "b");
        let template = Element::template().with_id("row-tpl");
        root.append_child(&other);
        root.append_child(&template);

        let mut descriptors = DescriptorSet::new();
        let mut desc = descriptor("test:outer", None);
        desc.refs
            .insert("display".into(), RefTarget::Id("b".into()));
        desc.refs
            .insert("t:row".into(), RefTarget::Id("row-tpl".into()));
        descriptors.insert("a", desc);
        descriptors.insert("b", descriptor("test:inner", None));

        let scope = hydrate(&root, &descriptors, Map::new()).unwrap();
        let component = scope.get("a").unwrap();

        match component.ref_value("display") {
            Some(RefValue::Component(target)) => {
                assert!(target.ptr_eq(scope.get("b").unwrap()));
            }
            other => panic!("expected component ref, got {other:?}"),
        }
        assert!(matches!(
            component.ref_value("row"),
            Some(RefValue::Template(_))
        ));
        // Mirrored into args under the stripped name.
        assert!(matches!(component.arg("row"), Some(ArgValue::Template(_))));
    }

    #[test]
    fn unresolved_ref_is_fatal() {
        let root = Element::new("div").with_attr(COMPONENT_ATTR, "a");
        let mut descriptors = DescriptorSet::new();
        let mut desc = descriptor("test:stub", None);
        desc.refs.insert("peer".into(), RefTarget::Id("zz".into()));
        descriptors.insert("a", desc);

        assert!(matches!(
            hydrate(&root, &descriptors, Map::new()),
            Err(HydrateError::UnknownRef { target, .. }) if target == "zz"
        ));
    }

    #[test]
    fn setup_runs_and_bindings_dispatch() {
        let root = Element::new("div").with_attr(COMPONENT_ATTR, "a");
        let label = Element::new("span").with_attr(EMBED_ATTR, "0-text");
        let button = Element::new("button").with_attr(EMBED_ATTR, "1-event-click");
        root.append_child(&label);
        root.append_child(&button);

        let clicks = Arc::new(AtomicUsize::new(0));
        let clicks_setup = clicks.clone();
        register_setup("test/engine/counter", move |component| {
            let count = Signal::new(Value::from(0));
            let clicks = clicks_setup.clone();
            let count_for_handler = count.clone();
            component.set_embeds(vec![
                Embed::Signal(count.clone()),
                Embed::Handler(Arc::new(move |_event| {
                    clicks.fetch_add(1, Ordering::SeqCst);
                    let next = count_for_handler
                        .get_untracked()
                        .as_i64()
                        .unwrap_or_default()
                        + 1;
                    let _ = count_for_handler.set(Value::from(next));
                })),
            ]);
            Ok(())
        });

        let mut descriptors = DescriptorSet::new();
        descriptors.insert("a", descriptor("test:counter", Some("test/engine/counter")));

        let scope = hydrate(&root, &descriptors, Map::new()).unwrap();
        assert_eq!(label.text(), "0");

        button.fire(&Event::new("click"));
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
        assert_eq!(label.text(), "1");
        assert_eq!(scope.get("a").unwrap().binding_count(), 1);
    }

    #[test]
    fn missing_setup_module_is_fatal() {
        let root = Element::new("div").with_attr(COMPONENT_ATTR, "a");
        let mut descriptors = DescriptorSet::new();
        descriptors.insert("a", descriptor("test:stub", Some("test/engine/never-registered")));

        assert!(matches!(
            hydrate(&root, &descriptors, Map::new()),
            Err(HydrateError::UnknownModule(module))
                if module == "test/engine/never-registered"
        ));
    }

    #[test]
    fn setup_failure_names_the_component() {
        register_setup("test/engine/broken", |_component| {
            Err("no backing store".into())
        });

        let root = Element::new("div").with_attr(COMPONENT_ATTR, "a");
        let mut descriptors = DescriptorSet::new();
        descriptors.insert("a", descriptor("test:stub", Some("test/engine/broken")));

        match hydrate(&root, &descriptors, Map::new()) {
            Err(HydrateError::Setup { id, error }) => {
                assert_eq!(id, "a");
                assert_eq!(error.to_string(), "no backing store");
            }
            other => panic!("expected setup error, got {other:?}"),
        }
    }

    #[test]
    fn nested_regions_do_not_leak_unscoped_tokens() {
        // Outer region contains an inner component whose subtree has its
        // own unscoped token; the outer pass must not touch it.
        let root = Element::new("div").with_attr(COMPONENT_ATTR, "outer");
        let inner = Element::new("div").with_attr(COMPONENT_ATTR, "inner");
        let inner_label = Element::new("span").with_attr(EMBED_ATTR, "0-text");
        let outer_label = Element::new("span").with_attr(EMBED_ATTR, "0-text");
        // Scoped token on the boundary element reaches across.
        inner.set_attribute(EMBED_ATTR, "outer/1-attr-class");
        root.append_child(&outer_label);
        root.append_child(&inner);
        inner.append_child(&inner_label);

        register_setup("test/engine/outer", |component| {
            component.set_embeds(vec![
                Embed::Static(Value::from("outer-text")),
                Embed::Static(Value::from("outer-class")),
            ]);
            Ok(())
        });
        register_setup("test/engine/inner", |component| {
            component.set_embeds(vec![Embed::Static(Value::from("inner-text"))]);
            Ok(())
        });

        let mut descriptors = DescriptorSet::new();
        descriptors.insert("outer", descriptor("test:outer", Some("test/engine/outer")));
        descriptors.insert("inner", descriptor("test:inner", Some("test/engine/inner")));

        hydrate(&root, &descriptors, Map::new()).unwrap();

        assert_eq!(outer_label.text(), "outer-text");
        assert_eq!(inner_label.text(), "inner-text");
        assert_eq!(inner.attribute("class").as_deref(), Some("outer-class"));
    }

    #[test]
    fn ready_callbacks_run_after_every_component_is_bound() {
        let order: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let order_a = order.clone();
        register_setup("test/engine/ready-a", move |component| {
            let order = order_a.clone();
            order.lock().push("setup-a".into());
            let order_cb = order.clone();
            component.ready(move || order_cb.lock().push("ready-a".into()));
            Ok(())
        });
        let order_b = order.clone();
        register_setup("test/engine/ready-b", move |component| {
            let order = order_b.clone();
            order.lock().push("setup-b".into());
            let order_cb = order.clone();
            component.ready(move || order_cb.lock().push("ready-b".into()));
            Ok(())
        });

        let root = Element::new("div").with_attr(COMPONENT_ATTR, "a");
        let child = Element::new("div").with_attr(COMPONENT_ATTR, "b");
        root.append_child(&child);

        let mut descriptors = DescriptorSet::new();
        descriptors.insert("a", descriptor("test:a", Some("test/engine/ready-a")));
        descriptors.insert("b", descriptor("test:b", Some("test/engine/ready-b")));

        hydrate(&root, &descriptors, Map::new()).unwrap();

        assert_eq!(
            *order.lock(),
            vec!["setup-a", "setup-b", "ready-a", "ready-b"]
        );
    }

    #[test]
    fn ready_outside_hydration_runs_immediately() {
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        enqueue_ready(move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
