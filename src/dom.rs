//! Minimal mutable document model for the preview canvas
//!
//! Just enough DOM for the reconciler: element/text nodes with referential
//! identity (`Arc::ptr_eq`), fragment parsing backed by scraper, and markup
//! serialization. One browser invariant is modelled explicitly because the
//! reconciler depends on it: assigning markup never executes scripts; only a
//! freshly created script element run through [`Document::run_script`] counts
//! as executed.

use scraper::{Html, Node};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Shared handle to a node; identity comparisons use `Arc::ptr_eq`
pub type NodeRef = Arc<NodeData>;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum NodeKind {
    Element {
        tag: String,
        attrs: Mutex<Vec<(String, String)>>,
        children: Mutex<Vec<NodeRef>>,
    },
    Text(Mutex<String>),
}

/// A single element or text node
pub struct NodeData {
    kind: NodeKind,
}

/// Create a new element node with the given attributes
pub fn new_element(tag: &str, attrs: &[(&str, &str)]) -> NodeRef {
    Arc::new(NodeData {
        kind: NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Mutex::new(
                attrs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            children: Mutex::new(Vec::new()),
        },
    })
}

/// Create a new text node
pub fn new_text(text: &str) -> NodeRef {
    Arc::new(NodeData {
        kind: NodeKind::Text(Mutex::new(text.to_string())),
    })
}

// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

// Elements whose text children are raw (never entity-escaped)
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl NodeData {
    /// Element tag name, or `None` for text nodes
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn is_element(&self, tag: &str) -> bool {
        self.tag() == Some(tag)
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        match &self.kind {
            NodeKind::Element { attrs, .. } => guard(attrs)
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn set_attr(&self, name: &str, value: &str) {
        if let NodeKind::Element { attrs, .. } = &self.kind {
            let mut attrs = guard(attrs);
            match attrs.iter_mut().find(|(k, _)| k == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    pub fn attrs(&self) -> Vec<(String, String)> {
        match &self.kind {
            NodeKind::Element { attrs, .. } => guard(attrs).clone(),
            NodeKind::Text(_) => Vec::new(),
        }
    }

    pub fn children(&self) -> Vec<NodeRef> {
        match &self.kind {
            NodeKind::Element { children, .. } => guard(children).clone(),
            NodeKind::Text(_) => Vec::new(),
        }
    }

    pub fn append_child(&self, child: NodeRef) {
        if let NodeKind::Element { children, .. } = &self.kind {
            guard(children).push(child);
        }
    }

    /// Concatenated text of this node and its descendants
    pub fn text_content(&self) -> String {
        match &self.kind {
            NodeKind::Text(text) => guard(text).clone(),
            NodeKind::Element { children, .. } => guard(children)
                .iter()
                .map(|child| child.text_content())
                .collect(),
        }
    }

    /// Replace this node's content with a single run of text
    pub fn set_text(&self, text: &str) {
        match &self.kind {
            NodeKind::Text(current) => *guard(current) = text.to_string(),
            NodeKind::Element { children, .. } => {
                *guard(children) = vec![new_text(text)];
            }
        }
    }

    /// Deep copy with fresh identity, preserving attributes and text
    pub fn clone_deep(&self) -> NodeRef {
        match &self.kind {
            NodeKind::Text(text) => new_text(&guard(text)),
            NodeKind::Element {
                tag,
                attrs,
                children,
            } => {
                let copy = Arc::new(NodeData {
                    kind: NodeKind::Element {
                        tag: tag.clone(),
                        attrs: Mutex::new(guard(attrs).clone()),
                        children: Mutex::new(Vec::new()),
                    },
                });
                for child in guard(children).iter() {
                    copy.append_child(child.clone_deep());
                }
                copy
            }
        }
    }

    pub fn inner_html(&self) -> String {
        serialize_nodes(&self.children())
    }

    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        serialize_node(self, &mut out);
        out
    }
}

/// Parse an HTML fragment into a list of nodes
pub fn parse_fragment(html: &str) -> Vec<NodeRef> {
    let fragment = Html::parse_fragment(html);
    let mut out = Vec::new();
    convert_children(fragment.tree.root(), &mut out);
    out
}

fn convert_children(node: ego_tree::NodeRef<'_, Node>, out: &mut Vec<NodeRef>) {
    for child in node.children() {
        match child.value() {
            // parse_fragment wraps content in a synthetic html element
            Node::Element(element) if element.name() == "html" => {
                convert_children(child, out);
            }
            Node::Element(element) => {
                let attrs: Vec<(String, String)> = element
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect();
                let converted = Arc::new(NodeData {
                    kind: NodeKind::Element {
                        tag: element.name().to_ascii_lowercase(),
                        attrs: Mutex::new(attrs),
                        children: Mutex::new(Vec::new()),
                    },
                });
                let mut grandchildren = Vec::new();
                convert_children(child, &mut grandchildren);
                for grandchild in grandchildren {
                    converted.append_child(grandchild);
                }
                out.push(converted);
            }
            Node::Text(text) => {
                let text: &str = &**text;
                if !text.is_empty() {
                    out.push(new_text(text));
                }
            }
            Node::Fragment | Node::Document => convert_children(child, out),
            _ => {}
        }
    }
}

/// Serialize a node list back to markup
pub fn serialize_nodes(nodes: &[NodeRef]) -> String {
    let mut out = String::new();
    for node in nodes {
        serialize_node(node, &mut out);
    }
    out
}

fn serialize_node(node: &NodeData, out: &mut String) {
    match &node.kind {
        NodeKind::Text(text) => out.push_str(&escape_text(&guard(text))),
        NodeKind::Element {
            tag,
            attrs,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in guard(attrs).iter() {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            let raw = RAW_TEXT_ELEMENTS.contains(&tag.as_str());
            for child in guard(children).iter() {
                match (&child.kind, raw) {
                    (NodeKind::Text(text), true) => out.push_str(&guard(text)),
                    _ => serialize_node(child, out),
                }
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Record of one script execution (attributes and text of the element)
#[derive(Debug, Clone)]
pub struct ExecutedScript {
    pub attrs: Vec<(String, String)>,
    pub text: String,
}

impl ExecutedScript {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// The canvas element one story renders into
pub struct Canvas {
    root: NodeRef,
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            root: new_element("div", &[("id", "storybook-root")]),
        }
    }

    /// Replace the canvas contents with parsed markup. Script tags inserted
    /// this way do NOT execute; see [`Document::run_script`].
    pub fn set_inner_html(&self, html: &str) {
        if let NodeKind::Element { children, .. } = &self.root.kind {
            *guard(children) = parse_fragment(html);
        }
    }

    pub fn inner_html(&self) -> String {
        self.root.inner_html()
    }

    pub fn first_child(&self) -> Option<NodeRef> {
        self.root.children().first().cloned()
    }

    pub fn clear(&self) {
        if let NodeKind::Element { children, .. } = &self.root.kind {
            guard(children).clear();
        }
    }

    pub fn append_child(&self, node: NodeRef) {
        self.root.append_child(node);
    }

    pub fn children(&self) -> Vec<NodeRef> {
        self.root.children()
    }

    /// All elements with the given tag in the canvas subtree, document order
    pub fn collect_elements(&self, tag: &str) -> Vec<NodeRef> {
        let mut found = Vec::new();
        collect_elements_in(&self.root, tag, &mut found);
        found
    }

    /// Substitute `new` for `old` wherever it sits in the subtree
    pub fn replace_node(&self, old: &NodeRef, new: NodeRef) -> bool {
        replace_node_in(&self.root, old, new)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_elements_in(node: &NodeRef, tag: &str, found: &mut Vec<NodeRef>) {
    for child in node.children() {
        if child.is_element(tag) {
            found.push(Arc::clone(&child));
        }
        collect_elements_in(&child, tag, found);
    }
}

fn replace_node_in(parent: &NodeRef, old: &NodeRef, new: NodeRef) -> bool {
    if let NodeKind::Element { children, .. } = &parent.kind {
        let mut children = guard(children);
        for slot in children.iter_mut() {
            if Arc::ptr_eq(slot, old) {
                *slot = new;
                return true;
            }
        }
        let current: Vec<NodeRef> = children.clone();
        drop(children);
        for child in current {
            if replace_node_in(&child, old, new.clone()) {
                return true;
            }
        }
    }
    false
}

/// The preview document: a head for styles, a body for injected assets, one
/// canvas, and the script-execution log.
pub struct Document {
    head: NodeRef,
    body: NodeRef,
    canvas: Canvas,
    executed: Mutex<Vec<ExecutedScript>>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            head: new_element("head", &[]),
            body: new_element("body", &[]),
            canvas: Canvas::new(),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn head(&self) -> &NodeRef {
        &self.head
    }

    pub fn body(&self) -> &NodeRef {
        &self.body
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Elements with the given tag in the document head
    pub fn head_elements(&self, tag: &str) -> Vec<NodeRef> {
        self.head
            .children()
            .into_iter()
            .filter(|node| node.is_element(tag))
            .collect()
    }

    /// Execute a freshly created script element. Insertion of a new script
    /// node is what triggers execution in a browser; this logs the same event
    /// so tests can observe it.
    pub fn run_script(&self, script: &NodeRef) {
        guard(&self.executed).push(ExecutedScript {
            attrs: script.attrs(),
            text: script.text_content(),
        });
    }

    /// Scripts executed so far, in execution order
    pub fn executed_scripts(&self) -> Vec<ExecutedScript> {
        guard(&self.executed).clone()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_markup_round_trips() {
        let canvas = Canvas::new();
        canvas.set_inner_html("<button>Hi</button>");
        assert_eq!(canvas.inner_html(), "<button>Hi</button>");
    }

    #[test]
    fn attributes_survive_parsing() {
        let canvas = Canvas::new();
        canvas.set_inner_html(r#"<div class="card" data-x="1"><p>text</p></div>"#);
        let div = canvas.first_child().unwrap();
        assert_eq!(div.attr("class").as_deref(), Some("card"));
        assert_eq!(div.attr("data-x").as_deref(), Some("1"));
        assert!(canvas.inner_html().contains(r#"class="card""#));
    }

    #[test]
    fn script_text_is_kept_raw() {
        let canvas = Canvas::new();
        canvas.set_inner_html("<script>if (1 < 2) { go(); }</script>");
        let script = &canvas.collect_elements("script")[0];
        assert_eq!(script.text_content(), "if (1 < 2) { go(); }");
        assert!(canvas.inner_html().contains("1 < 2"));
    }

    #[test]
    fn markup_assignment_does_not_execute_scripts() {
        let document = Document::new();
        document
            .canvas()
            .set_inner_html("<script>sideEffect()</script>");
        assert!(document.executed_scripts().is_empty());
    }

    #[test]
    fn first_child_preserves_identity() {
        let canvas = Canvas::new();
        let node = new_element("span", &[]);
        canvas.append_child(Arc::clone(&node));
        assert!(Arc::ptr_eq(&canvas.first_child().unwrap(), &node));
    }

    #[test]
    fn clone_deep_has_fresh_identity_but_same_content() {
        let node = new_element("script", &[("type", "module")]);
        node.set_text("run()");
        let copy = node.clone_deep();
        assert!(!Arc::ptr_eq(&node, &copy));
        assert_eq!(copy.attr("type").as_deref(), Some("module"));
        assert_eq!(copy.text_content(), "run()");
    }

    #[test]
    fn replace_node_swaps_nested_occurrence() {
        let canvas = Canvas::new();
        canvas.set_inner_html("<div><script>a()</script></div>");
        let script = canvas.collect_elements("script").remove(0);
        let fresh = script.clone_deep();
        assert!(canvas.replace_node(&script, Arc::clone(&fresh)));
        let now = canvas.collect_elements("script").remove(0);
        assert!(Arc::ptr_eq(&now, &fresh));
    }

    #[test]
    fn void_elements_serialize_without_closing_tag() {
        let link = new_element("link", &[("rel", "stylesheet"), ("href", "/a.css")]);
        assert_eq!(
            link.outer_html(),
            r#"<link rel="stylesheet" href="/a.css">"#
        );
    }

    #[test]
    fn text_is_entity_escaped_outside_raw_elements() {
        let canvas = Canvas::new();
        canvas.set_inner_html("<p>a &amp; b</p>");
        assert_eq!(canvas.inner_html(), "<p>a &amp; b</p>");
    }
}
