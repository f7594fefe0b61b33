//! Demo: a full client/server render cycle inside one process.
//!
//! Wires a render server with a toy templating engine to a canvas renderer
//! over the in-process transport, then renders a story and prints the canvas.
//!
//! Run with: cargo run --example preview_demo

use std::collections::BTreeMap;
use std::sync::Arc;
use storycanvas::classify::{CallableValue, StoryValue};
use storycanvas::dom::Document;
use storycanvas::host::{NoopHostUi, NoopPageLifecycle};
use storycanvas::protocol::JsonMap;
use storycanvas::server::{ComponentModule, ModuleLoader, RenderEngine, RenderServer};
use storycanvas::transport::{ChannelTransport, Transport};
use storycanvas::{CanvasRenderer, RenderContext, RendererConfig, StoryContext};

struct DemoLoader;

impl ModuleLoader for DemoLoader {
    fn fresh_import(&self, module_id: &str) -> storycanvas::Result<ComponentModule> {
        match module_id {
            "src/components/Button.astro" => Ok(ComponentModule {
                default_export: Some(CallableValue::factory("Button", module_id)),
            }),
            other => Err(storycanvas::Error::Render(format!(
                "Component not found: {other}"
            ))),
        }
    }
}

struct DemoEngine;

impl RenderEngine for DemoEngine {
    fn render_to_string(
        &self,
        _component: &CallableValue,
        props: &JsonMap,
        slots: &BTreeMap<String, String>,
    ) -> storycanvas::Result<String> {
        let label = props
            .get("label")
            .and_then(|value| value.as_str())
            .unwrap_or("Button");
        let extra = slots.get("default").map(String::as_str).unwrap_or_default();
        Ok(format!("<button class=\"demo\">{label}</button>{extra}"))
    }
}

fn main() -> anyhow::Result<()> {
    let (client, server_side) = ChannelTransport::pair();
    let client: Arc<dyn Transport> = client;
    let server_side: Arc<dyn Transport> = server_side;

    let server = RenderServer::new(Arc::new(DemoLoader), Arc::new(DemoEngine));
    server.attach(&server_side);

    let renderer = CanvasRenderer::new(
        Some(client),
        Arc::new(NoopHostUi),
        Arc::new(NoopPageLifecycle),
        RendererConfig::default(),
    );
    let document = Document::new();

    let mut story = StoryContext::new("button--primary", "Primary", "Components/Button");
    story
        .args
        .insert("label".to_string(), serde_json::json!("Click me"));

    let factory = CallableValue::factory("Button", "src/components/Button.astro");
    let ctx = RenderContext {
        story_fn: Box::new(move || StoryValue::Callable(factory.clone())),
        force_remount: false,
        story_context: story,
    };

    renderer.render_to_canvas(&ctx, &document)?;
    println!("canvas: {}", document.canvas().inner_html());

    // A component the server cannot resolve paints an inline error instead
    let missing = CallableValue::factory("Gone", "src/components/Gone.astro");
    let ctx = RenderContext {
        story_fn: Box::new(move || StoryValue::Callable(missing.clone())),
        force_remount: false,
        story_context: StoryContext::new("gone--default", "Default", "Components/Gone"),
    };
    renderer.render_to_canvas(&ctx, &document)?;
    println!("canvas after failure: {}", document.canvas().inner_html());

    Ok(())
}
