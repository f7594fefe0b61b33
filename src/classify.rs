//! Classification of story return values
//!
//! The upstream compile step tags server-renderable components with a factory
//! marker and a module identity; everything else a story returns is markup, a
//! DOM node, or an opaque value the host framework understands. The variants
//! carry that discriminant explicitly so dispatch is a plain match.

use crate::dom::NodeRef;
use std::fmt;

/// A callable story value produced by the compile step.
///
/// `is_factory` is the marker distinguishing a deferred server-renderable
/// component from an ordinary function; `module_id` is the module identity
/// the server resolves. A marked factory without a module id is a compile
/// step defect and fails fast downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableValue {
    pub is_factory: bool,
    pub module_id: Option<String>,
    pub name: String,
}

impl CallableValue {
    /// A correctly tagged component factory
    pub fn factory(name: impl Into<String>, module_id: impl Into<String>) -> Self {
        Self {
            is_factory: true,
            module_id: Some(module_id.into()),
            name: name.into(),
        }
    }

    /// An ordinary callable without the factory marker
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            is_factory: false,
            module_id: None,
            name: name.into(),
        }
    }
}

/// A value returned by a story function
#[derive(Clone)]
pub enum StoryValue {
    /// Plain string markup
    Markup(String),
    /// A node belonging to the document's node hierarchy
    Node(NodeRef),
    /// A callable, possibly carrying the factory marker
    Callable(CallableValue),
    /// Anything else the host framework may pass through
    Other(serde_json::Value),
}

// Nodes carry mutexed internals, so Debug goes through their serialized form
impl fmt::Debug for StoryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoryValue::Markup(markup) => f.debug_tuple("Markup").field(markup).finish(),
            StoryValue::Node(node) => f.debug_tuple("Node").field(&node.outer_html()).finish(),
            StoryValue::Callable(callable) => f.debug_tuple("Callable").field(callable).finish(),
            StoryValue::Other(value) => f.debug_tuple("Other").field(value).finish(),
        }
    }
}

/// Dispatch target for the canvas reconciler
pub enum Classified<'a> {
    /// Render server-side through the request correlator
    Deferred(&'a CallableValue),
    /// Assign as canvas markup
    Markup(&'a str),
    /// Reuse or replace the existing canvas subtree
    Node(&'a NodeRef),
    /// Surface a host-level authoring error
    Unrecognized,
}

/// Classify a story value into exactly one dispatch target.
///
/// The factory-marker check precedes generic callable handling: a tagged
/// factory is also callable, and untagged callables are opaque passthrough
/// values rather than errors (host frameworks vary here).
pub fn classify(value: &StoryValue) -> Classified<'_> {
    match value {
        StoryValue::Callable(callable) if callable.is_factory => Classified::Deferred(callable),
        StoryValue::Markup(markup) => Classified::Markup(markup),
        StoryValue::Node(node) => Classified::Node(node),
        StoryValue::Callable(_) | StoryValue::Other(_) => Classified::Unrecognized,
    }
}
