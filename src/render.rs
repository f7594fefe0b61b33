//! Canvas reconciler: turns a classified story value into painted canvas state
//!
//! One render cycle classifies the story's return value and then either asks
//! the dev server for HTML (deferred component factories), injects markup,
//! reuses or replaces a DOM subtree, or surfaces an authoring error. Failures
//! that originate in the render protocol (timeout, absent transport, server
//! error) are always contained and painted inline; a badly tagged component is
//! an integration defect and propagates instead.

use crate::classify::{classify, CallableValue, Classified, StoryValue};
use crate::correlator::RequestCorrelator;
use crate::dom::{self, Canvas, Document, NodeRef};
use crate::host::{HostUi, PageLifecycle};
use crate::protocol::{
    self, ComponentUpdate, JsonMap, RenderRequest, COMPONENT_UPDATE_EVENT,
};
use crate::transport::Transport;
use crate::{Error, RenderContext, RendererConfig, Result, StoryContext};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Marker inside a dev-time style tag that still requires a manual update call
pub const HOT_STYLE_MARKER: &str = "__vite__updateStyle";

/// Attribute identifying dev-injected style tags
pub const HOT_STYLE_ATTR: &str = "data-vite-dev-id";

type RefreshHandler = Arc<dyn Fn(&str) + Send + Sync>;

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Resolve the story-level component annotation into the value handed to the
/// render cycle. DOM nodes are deep-cloned so stories cannot mutate shared
/// annotation state between renders.
pub fn render(ctx: &StoryContext) -> Result<StoryValue> {
    let component = ctx.component.as_ref().ok_or_else(|| {
        Error::Other(format!(
            "Unable to render story {} as the component annotation is missing from the default export",
            ctx.id
        ))
    })?;

    Ok(match component {
        StoryValue::Node(node) => StoryValue::Node(node.clone_deep()),
        other => other.clone(),
    })
}

/// The per-canvas renderer driving render cycles
pub struct CanvasRenderer {
    correlator: Arc<RequestCorrelator>,
    host: Arc<dyn HostUi>,
    lifecycle: Arc<dyn PageLifecycle>,
    refresh_listeners: Arc<Mutex<Vec<RefreshHandler>>>,
}

impl CanvasRenderer {
    /// Create a renderer bound to an optional transport. With `None` every
    /// remote render fails synchronously and paints an inline error instead.
    pub fn new(
        transport: Option<Arc<dyn Transport>>,
        host: Arc<dyn HostUi>,
        lifecycle: Arc<dyn PageLifecycle>,
        config: RendererConfig,
    ) -> Arc<Self> {
        let renderer = Arc::new(Self {
            correlator: RequestCorrelator::new(transport.clone(), config.render_timeout_ms),
            host,
            lifecycle,
            refresh_listeners: Arc::new(Mutex::new(Vec::new())),
        });

        // Component updates only notify; a host-owned story-refresh mechanism
        // decides whether to run the whole cycle again.
        if let Some(transport) = transport {
            let listeners = Arc::clone(&renderer.refresh_listeners);
            transport.on(
                COMPONENT_UPDATE_EVENT,
                Arc::new(move |payload| {
                    match serde_json::from_value::<ComponentUpdate>(payload.clone()) {
                        Ok(update) => {
                            for listener in guard(&listeners).iter() {
                                listener(&update.file);
                            }
                        }
                        Err(err) => log::warn!("malformed component update: {err}"),
                    }
                }),
            );
        }

        renderer
    }

    /// Register a story-refresh listener invoked with the changed file path
    pub fn on_story_refresh<F>(&self, listener: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        guard(&self.refresh_listeners).push(Arc::new(listener));
    }

    /// The correlator backing remote renders (exposed for inspection in tests)
    pub fn correlator(&self) -> &Arc<RequestCorrelator> {
        &self.correlator
    }

    /// Run one render cycle for a story against the given document's canvas
    pub fn render_to_canvas(&self, ctx: &RenderContext, document: &Document) -> Result<()> {
        let element = (ctx.story_fn)();

        // Visibility never waits on network I/O
        self.host.show_main();

        match classify(&element) {
            Classified::Deferred(factory) => {
                self.render_component(factory, &ctx.story_context, document)
            }
            Classified::Markup(markup) => {
                document.canvas().set_inner_html(markup);
                self.lifecycle.simulate_page_load(document.canvas());
                Ok(())
            }
            Classified::Node(node) => {
                self.reuse_or_replace(node, ctx.force_remount, document.canvas());
                Ok(())
            }
            Classified::Unrecognized => {
                self.host.show_error(
                    &format!(
                        "Expecting an HTML snippet or DOM node from the story: \"{}\" of \"{}\".",
                        ctx.story_context.name, ctx.story_context.title
                    ),
                    "Did you forget to return the HTML snippet from the story?\n\
                     Use \"() => <your snippet or node>\" when defining the story.",
                );
                Ok(())
            }
        }
    }

    fn render_component(
        &self,
        factory: &CallableValue,
        story: &StoryContext,
        document: &Document,
    ) -> Result<()> {
        let module_id = factory.module_id.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "component {:?} is missing moduleId; make sure it was tagged by the compile step",
                factory.name
            ))
        })?;

        let (props, slots) = split_slots(&story.args);
        let mut request = RenderRequest::new(module_id);
        request.args = props;
        request.slots = slots;

        match self.correlator.send(request) {
            Ok(response) => {
                let canvas = document.canvas();
                canvas.set_inner_html(&response.html);
                execute_scripts(document);
                activate_dynamic_styles(document);
                self.lifecycle.simulate_page_load(canvas);
                Ok(())
            }
            Err(err) => {
                // Protocol failures are visually recoverable, never fatal
                document
                    .canvas()
                    .set_inner_html(&protocol::error_fragment(&err.to_string()));
                Ok(())
            }
        }
    }

    fn reuse_or_replace(&self, node: &NodeRef, force_remount: bool, canvas: &Canvas) {
        if let Some(first) = canvas.first_child() {
            // Idempotent repaint avoidance: same node, no forced remount
            if Arc::ptr_eq(&first, node) && !force_remount {
                return;
            }
        }
        canvas.clear();
        canvas.append_child(Arc::clone(node));
        self.lifecycle.simulate_dom_ready();
    }
}

/// Split a story's args into the reserved `slots` sub-mapping and the
/// remaining props forwarded to the server.
pub fn split_slots(args: &JsonMap) -> (JsonMap, BTreeMap<String, String>) {
    let mut props = JsonMap::new();
    let mut slots = BTreeMap::new();

    for (key, value) in args {
        if key == "slots" {
            if let serde_json::Value::Object(map) = value {
                for (name, markup) in map {
                    match markup.as_str() {
                        Some(markup) => {
                            slots.insert(name.clone(), markup.to_string());
                        }
                        None => log::warn!("slot {name:?} is not a string; skipped"),
                    }
                }
            }
            continue;
        }
        props.insert(key.clone(), value.clone());
    }

    (props, slots)
}

// Script tags inserted via markup assignment do not execute; swap each for a
// fresh element preserving attributes and text so insertion triggers it.
fn execute_scripts(document: &Document) {
    let canvas = document.canvas();
    for script in canvas.collect_elements("script") {
        let fresh = script.clone_deep();
        if canvas.replace_node(&script, Arc::clone(&fresh)) {
            document.run_script(&fresh);
        }
    }
}

// Dev-time hot styles still need their manual update call. Each marked style
// is rewritten so hot-channel calls degrade gracefully when the channel is
// absent, then executed once as a standalone module and discarded.
fn activate_dynamic_styles(document: &Document) {
    for style in document.head_elements("style") {
        if style.attr(HOT_STYLE_ATTR).is_none() {
            continue;
        }
        let content = style.text_content();
        if !content.contains(HOT_STYLE_MARKER) {
            continue;
        }
        let rewritten = content
            .replace("import.meta.hot.accept(", "import.meta.hot?.accept(")
            .replace("import.meta.hot.prune(", "import.meta.hot?.prune(");

        let script = dom::new_element("script", &[("type", "module")]);
        script.set_text(&rewritten);
        document.run_script(&script);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: serde_json::Value) -> JsonMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn split_slots_separates_reserved_mapping() {
        let args = args(json!({
            "label": "Hi",
            "count": 2,
            "slots": { "default": "<span>slot</span>" }
        }));
        let (props, slots) = split_slots(&args);
        assert_eq!(props.get("label"), Some(&json!("Hi")));
        assert_eq!(props.get("count"), Some(&json!(2)));
        assert!(props.get("slots").is_none());
        assert_eq!(slots.get("default").map(String::as_str), Some("<span>slot</span>"));
    }

    #[test]
    fn split_slots_defaults_to_empty() {
        let (props, slots) = split_slots(&args(json!({ "label": "Hi" })));
        assert_eq!(props.len(), 1);
        assert!(slots.is_empty());
    }

    #[test]
    fn execute_scripts_swaps_in_fresh_elements() {
        let document = Document::new();
        document
            .canvas()
            .set_inner_html(r#"<div><script data-k="v">init()</script></div>"#);

        execute_scripts(&document);

        let executed = document.executed_scripts();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].text, "init()");
        assert_eq!(executed[0].attr("data-k"), Some("v"));
        // The subtree now holds the fresh element, same markup
        assert!(document.canvas().inner_html().contains("init()"));
    }

    #[test]
    fn dynamic_styles_activate_once_as_modules() {
        let document = Document::new();
        let style = dom::new_element("style", &[(HOT_STYLE_ATTR, "/src/a.css")]);
        style.set_text("import.meta.hot.accept(mod); __vite__updateStyle(id, css)");
        document.head().append_child(style);

        // An unmarked style must be left alone
        let plain = dom::new_element("style", &[]);
        plain.set_text("body { color: red }");
        document.head().append_child(plain);

        activate_dynamic_styles(&document);

        let executed = document.executed_scripts();
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].attr("type"), Some("module"));
        assert!(executed[0].text.contains("import.meta.hot?.accept(mod)"));
    }

    #[test]
    fn render_requires_the_component_annotation() {
        let ctx = StoryContext {
            id: "button--primary".to_string(),
            name: "Primary".to_string(),
            title: "Components/Button".to_string(),
            component: None,
            args: JsonMap::new(),
        };
        let err = render(&ctx).unwrap_err();
        assert!(err.to_string().contains("component annotation is missing"));
    }

    #[test]
    fn render_deep_clones_node_annotations() {
        let node = dom::new_element("span", &[]);
        let ctx = StoryContext {
            id: "s".to_string(),
            name: "S".to_string(),
            title: "T".to_string(),
            component: Some(StoryValue::Node(Arc::clone(&node))),
            args: JsonMap::new(),
        };
        match render(&ctx).unwrap() {
            StoryValue::Node(clone) => assert!(!Arc::ptr_eq(&clone, &node)),
            _ => panic!("expected a node"),
        }
    }
}
