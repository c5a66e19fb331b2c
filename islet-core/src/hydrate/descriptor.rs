//! Sidecar component descriptors.
//!
//! Each component declared in a subtree is described out-of-band by a
//! descriptor keyed on its component id: the namespace-qualified name,
//! an optional setup module path, initial arguments, and cross-references
//! to other components by id.
//!
//! Descriptors arrive as JSON and are parsed into typed structs up
//! front, so a malformed payload surfaces as a structured parse error
//! before any component is instantiated.
//!
//! # Ref-name conventions
//!
//! - A leading `t:` marks a ref as a template reference: it resolves to a
//!   template handle instead of a component.
//! - A trailing `:a` marks an argument or ref as array-valued
//!   (append-to-list semantics).
//!
//! Both markers are stripped before the resolved value is assigned into
//! the component's arguments.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Marks a ref name as a template reference.
pub const TEMPLATE_REF_PREFIX: &str = "t:";

/// Marks an argument or ref name as array-valued.
pub const ARRAY_NAME_SUFFIX: &str = ":a";

/// Descriptor for one declared component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Namespace-qualified component name, e.g. `"app:counter"`.
    pub name: String,

    /// Module path of the component's setup routine, if any.
    #[serde(default)]
    pub url: Option<String>,

    /// Initial arguments.
    #[serde(default)]
    pub args: Map<String, Value>,

    /// Declared cross-references: ref name to target component id(s).
    #[serde(default)]
    pub refs: HashMap<String, RefTarget>,
}

/// Target of a declared ref: a single component id or a list of ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefTarget {
    /// One target component.
    Id(String),
    /// Several target components, in declaration order.
    Ids(Vec<String>),
}

/// The full set of descriptors for one hydration call, keyed by
/// component id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DescriptorSet {
    descriptors: HashMap<String, ComponentDescriptor>,
}

impl DescriptorSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a descriptor set from a JSON object keyed by component id.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Add or replace the descriptor for `id`.
    pub fn insert(&mut self, id: impl Into<String>, descriptor: ComponentDescriptor) {
        self.descriptors.insert(id.into(), descriptor);
    }

    /// Look up the descriptor for `id`.
    pub fn get(&self, id: &str) -> Option<&ComponentDescriptor> {
        self.descriptors.get(id)
    }

    /// Whether a descriptor exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.descriptors.contains_key(id)
    }

    /// Number of descriptors in the set.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Whether a ref name declares a template reference.
pub fn is_template_ref(name: &str) -> bool {
    name.starts_with(TEMPLATE_REF_PREFIX)
}

/// Whether an argument or ref name declares append-to-list semantics.
pub fn is_array_name(name: &str) -> bool {
    name.ends_with(ARRAY_NAME_SUFFIX)
}

/// Strip the `t:` prefix and `:a` suffix from a ref name.
pub fn strip_ref_name(name: &str) -> &str {
    let name = name.strip_prefix(TEMPLATE_REF_PREFIX).unwrap_or(name);
    name.strip_suffix(ARRAY_NAME_SUFFIX).unwrap_or(name)
}
