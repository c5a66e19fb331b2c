//! Binding tokens and dispatch.
//!
//! A binding token names one connection between an element and an embed:
//!
//! ```text
//! [componentId/]<index>-<kind>[-<argument>]
//! ```
//!
//! `index` addresses the owning component's embed list; `kind` selects
//! the output surface (`text`, `html`, `attr`, `event`, `data`); the
//! optional `argument` carries the attribute name, event name, or data
//! key. A leading `componentId/` scopes the token to a component other
//! than the one whose region the element sits in.
//!
//! Dispatch pairs the embed's variant with the kind: reactive embeds
//! produce a live effect owned by the component, static values write
//! once, handlers register as listeners. Mismatches and out-of-range
//! indexes are logged and skipped; a single bad token never aborts
//! hydration.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use super::component::{Component, Embed};
use super::markup::Element;
use crate::reactive::Effect;

/// Output surface a binding token targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Element text content.
    Text,
    /// Element inner markup.
    Markup,
    /// A named attribute; the token argument is the attribute name.
    Attribute,
    /// A listener registration; the token argument is the event name.
    Event,
    /// The element's data bag; the token argument is the key.
    OpaqueData,
}

impl BindingKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "html" => Some(Self::Markup),
            "attr" => Some(Self::Attribute),
            "event" => Some(Self::Event),
            "data" => Some(Self::OpaqueData),
            _ => None,
        }
    }
}

/// One parsed binding token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingToken {
    /// Explicit owning component id, if the token is scoped.
    pub scope: Option<String>,
    /// Position in the owning component's embed list.
    pub index: usize,
    /// Output surface.
    pub kind: BindingKind,
    /// Attribute name, event name, or data key.
    pub argument: Option<String>,
}

impl BindingToken {
    /// Parse one whitespace-delimited token. Returns `None` for any
    /// malformed shape; callers log and skip.
    pub fn parse(token: &str) -> Option<Self> {
        let (scope, rest) = match token.split_once('/') {
            Some((scope, rest)) if !scope.is_empty() => (Some(scope.to_string()), rest),
            Some(_) => return None,
            None => (None, token),
        };

        let mut parts = rest.splitn(3, '-');
        let index = parts.next()?.parse().ok()?;
        let kind = BindingKind::parse(parts.next()?)?;
        let argument = parts.next().map(str::to_string);

        Some(Self {
            scope,
            index,
            kind,
            argument,
        })
    }
}

/// Render a JSON value for a text, markup, or attribute surface.
///
/// Strings render bare, null renders empty, everything else renders as
/// its JSON serialization.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

type ValueWriter = Arc<dyn Fn(&Element, &Value) + Send + Sync>;

fn value_writer(kind: BindingKind, argument: Option<&str>) -> Option<ValueWriter> {
    match kind {
        BindingKind::Text => Some(Arc::new(|element, value| {
            element.set_text(render_value(value));
        })),
        BindingKind::Markup => Some(Arc::new(|element, value| {
            element.set_markup(render_value(value));
        })),
        BindingKind::Attribute => {
            let name = argument?.to_string();
            Some(Arc::new(move |element, value| {
                element.set_attribute(name.clone(), render_value(value));
            }))
        }
        BindingKind::Event | BindingKind::OpaqueData => None,
    }
}

/// Connect one embed to one element per the token's kind.
///
/// Live value bindings push their effect onto `component`, tying their
/// lifetime to the component's.
pub(crate) fn apply(component: &Component, element: &Element, token: &BindingToken) {
    let Some(embed) = component.embed(token.index) else {
        warn!(
            component = component.id(),
            index = token.index,
            count = component.embed_count(),
            "binding index out of range, skipping"
        );
        return;
    };

    match token.kind {
        BindingKind::Text | BindingKind::Markup | BindingKind::Attribute => {
            let Some(writer) = value_writer(token.kind, token.argument.as_deref()) else {
                warn!(
                    component = component.id(),
                    index = token.index,
                    "attribute binding is missing its attribute name, skipping"
                );
                return;
            };
            apply_value(component, element, &embed, writer, token);
        }
        BindingKind::Event => {
            let Some(event) = token.argument.as_deref() else {
                warn!(
                    component = component.id(),
                    index = token.index,
                    "event binding is missing its event name, skipping"
                );
                return;
            };
            match embed {
                Embed::Handler(handler) => element.add_listener(event, handler),
                other => warn!(
                    component = component.id(),
                    index = token.index,
                    embed = ?other,
                    "event binding needs a handler embed, skipping"
                ),
            }
        }
        BindingKind::OpaqueData => {
            let Some(key) = token.argument.as_deref() else {
                warn!(
                    component = component.id(),
                    index = token.index,
                    "data binding is missing its key, skipping"
                );
                return;
            };
            element.set_data(key, embed);
        }
    }
}

fn apply_value(
    component: &Component,
    element: &Element,
    embed: &Embed,
    writer: ValueWriter,
    token: &BindingToken,
) {
    match embed {
        Embed::Signal(signal) => {
            let signal = signal.clone();
            let element = element.clone();
            component.push_effect(Effect::new(move || {
                writer(&element, &signal.get());
            }));
        }
        Embed::Computed(computed) => {
            let computed = computed.clone();
            let element = element.clone();
            let effect = Effect::try_new(move || {
                writer(&element, &computed.get()?);
                Ok(())
            });
            match effect {
                Ok(effect) => component.push_effect(effect),
                Err(error) => warn!(
                    component = component.id(),
                    index = token.index,
                    %error,
                    "derived binding failed its initial run, skipping"
                ),
            }
        }
        Embed::Static(value) => writer(element, value),
        Embed::Handler(_) => warn!(
            component = component.id(),
            index = token.index,
            "value binding cannot target a handler embed, skipping"
        ),
    }
}
