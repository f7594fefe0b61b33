//! Server render adapter: answers render requests inside the dev server
//!
//! The adapter loads the target module fresh on every request (so edits are
//! picked up), invokes the templating engine's off-DOM render entry point,
//! and answers exactly one response per request id. Failures never crash the
//! serving side; they travel back as a structured payload carrying both the
//! error string and a paintable HTML fragment.

use crate::classify::CallableValue;
use crate::protocol::{
    self, JsonMap, RenderRequest, RenderResponse, COMPONENT_UPDATE_EVENT, RENDER_REQUEST_EVENT,
    RENDER_RESPONSE_EVENT,
};
use crate::transport::Transport;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A freshly loaded component module
#[derive(Debug, Clone)]
pub struct ComponentModule {
    /// The module's default export, when present
    pub default_export: Option<CallableValue>,
}

/// Loads component modules by identity.
///
/// `fresh_import` must not serve a stale cached module: the whole point of
/// the dev path is that an edited component renders with its latest source.
pub trait ModuleLoader: Send + Sync {
    fn fresh_import(&self, module_id: &str) -> Result<ComponentModule>;
}

/// The templating framework's isolated server-render entry point
pub trait RenderEngine: Send + Sync {
    fn render_to_string(
        &self,
        component: &CallableValue,
        props: &JsonMap,
        slots: &BTreeMap<String, String>,
    ) -> Result<String>;
}

/// Dev-server side of the render protocol
pub struct RenderServer {
    loader: Arc<dyn ModuleLoader>,
    engine: Arc<dyn RenderEngine>,
}

impl RenderServer {
    pub fn new(loader: Arc<dyn ModuleLoader>, engine: Arc<dyn RenderEngine>) -> Arc<Self> {
        Arc::new(Self { loader, engine })
    }

    /// Register the request listener on the transport. Every request gets
    /// exactly one response, success or failure.
    pub fn attach(self: &Arc<Self>, transport: &Arc<dyn Transport>) {
        let server = Arc::clone(self);
        let transport_out = Arc::clone(transport);
        transport.on(
            RENDER_REQUEST_EVENT,
            Arc::new(move |payload| {
                let request: RenderRequest = match serde_json::from_value(payload.clone()) {
                    Ok(request) => request,
                    Err(err) => {
                        log::warn!("malformed render request: {err}");
                        return;
                    }
                };

                let response = match server.render(&request) {
                    Ok(html) => RenderResponse {
                        id: request.id.clone(),
                        html,
                        error: None,
                    },
                    Err(err) => {
                        log::error!("render failed for {}: {err}", request.component);
                        RenderResponse {
                            id: request.id.clone(),
                            html: protocol::error_fragment(&err.to_string()),
                            error: Some(err.to_string()),
                        }
                    }
                };

                match serde_json::to_value(&response) {
                    Ok(payload) => {
                        if let Err(err) = transport_out.send(RENDER_RESPONSE_EVENT, payload) {
                            log::warn!("failed to send render response: {err}");
                        }
                    }
                    Err(err) => log::warn!("failed to encode render response: {err}"),
                }
            }),
        );
    }

    fn render(&self, request: &RenderRequest) -> Result<String> {
        let module = self.loader.fresh_import(&request.component)?;
        let component = module
            .default_export
            .ok_or_else(|| Error::Render(format!("Component not found: {}", request.component)))?;
        self.engine
            .render_to_string(&component, &request.args, &request.slots)
    }
}

/// Notify clients that a component source file changed. The client side does
/// not re-render on its own; it forwards this to its story-refresh listeners.
pub fn notify_component_update(transport: &Arc<dyn Transport>, file: &str) -> Result<()> {
    transport.send(
        COMPONENT_UPDATE_EVENT,
        serde_json::to_value(protocol::ComponentUpdate {
            file: file.to_string(),
        })?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use serde_json::json;
    use std::sync::Mutex;

    struct MapLoader {
        modules: Mutex<std::collections::HashMap<String, ComponentModule>>,
        imports: Mutex<Vec<String>>,
    }

    impl MapLoader {
        fn with(module_id: &str, module: ComponentModule) -> Arc<Self> {
            let mut modules = std::collections::HashMap::new();
            modules.insert(module_id.to_string(), module);
            Arc::new(Self {
                modules: Mutex::new(modules),
                imports: Mutex::new(Vec::new()),
            })
        }
    }

    impl ModuleLoader for MapLoader {
        fn fresh_import(&self, module_id: &str) -> Result<ComponentModule> {
            self.imports.lock().unwrap().push(module_id.to_string());
            self.modules
                .lock()
                .unwrap()
                .get(module_id)
                .cloned()
                .ok_or_else(|| Error::Render(format!("Component not found: {module_id}")))
        }
    }

    struct EchoEngine;

    impl RenderEngine for EchoEngine {
        fn render_to_string(
            &self,
            _component: &CallableValue,
            props: &JsonMap,
            slots: &BTreeMap<String, String>,
        ) -> Result<String> {
            let label = props
                .get("label")
                .and_then(|value| value.as_str())
                .unwrap_or_default();
            let slot = slots.get("default").map(String::as_str).unwrap_or_default();
            Ok(format!("<button>{label}{slot}</button>"))
        }
    }

    fn responses_on(transport: &Arc<ChannelTransport>) -> Arc<Mutex<Vec<RenderResponse>>> {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&collected);
        transport.on(
            RENDER_RESPONSE_EVENT,
            Arc::new(move |payload| {
                sink.lock()
                    .unwrap()
                    .push(serde_json::from_value(payload.clone()).unwrap());
            }),
        );
        collected
    }

    #[test]
    fn request_is_answered_with_rendered_html() {
        let (client, server_side) = ChannelTransport::pair();
        let loader = MapLoader::with(
            "Button.astro",
            ComponentModule {
                default_export: Some(CallableValue::factory("Button", "Button.astro")),
            },
        );
        let server = RenderServer::new(loader.clone(), Arc::new(EchoEngine));
        let server_transport: Arc<dyn Transport> = server_side;
        server.attach(&server_transport);

        let responses = responses_on(&client);
        client
            .send(
                RENDER_REQUEST_EVENT,
                json!({ "id": "r1", "component": "Button.astro", "args": { "label": "Hi" } }),
            )
            .unwrap();

        let responses = responses.lock().unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].id, "r1");
        assert_eq!(responses[0].html, "<button>Hi</button>");
        assert_eq!(responses[0].error, None);
        assert_eq!(loader.imports.lock().unwrap().as_slice(), ["Button.astro"]);
    }

    #[test]
    fn missing_default_export_answers_structured_error() {
        let (client, server_side) = ChannelTransport::pair();
        let loader = MapLoader::with(
            "Broken.astro",
            ComponentModule {
                default_export: None,
            },
        );
        let server = RenderServer::new(loader, Arc::new(EchoEngine));
        let server_transport: Arc<dyn Transport> = server_side;
        server.attach(&server_transport);

        let responses = responses_on(&client);
        client
            .send(
                RENDER_REQUEST_EVENT,
                json!({ "id": "r2", "component": "Broken.astro" }),
            )
            .unwrap();

        let responses = responses.lock().unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].id, "r2");
        assert_eq!(
            responses[0].error.as_deref(),
            Some("Component not found: Broken.astro")
        );
        assert!(responses[0].html.contains("Failed to render"));
        assert!(responses[0].html.contains("Component not found: Broken.astro"));
    }

    #[test]
    fn module_is_loaded_fresh_on_every_request() {
        let (client, server_side) = ChannelTransport::pair();
        let loader = MapLoader::with(
            "Card.astro",
            ComponentModule {
                default_export: Some(CallableValue::factory("Card", "Card.astro")),
            },
        );
        let server = RenderServer::new(loader.clone(), Arc::new(EchoEngine));
        let server_transport: Arc<dyn Transport> = server_side;
        server.attach(&server_transport);

        for id in ["a", "b", "c"] {
            client
                .send(
                    RENDER_REQUEST_EVENT,
                    json!({ "id": id, "component": "Card.astro" }),
                )
                .unwrap();
        }
        assert_eq!(loader.imports.lock().unwrap().len(), 3);
    }

    #[test]
    fn component_update_notification_reaches_listeners() {
        let (client, server_side) = ChannelTransport::pair();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        client.on(
            COMPONENT_UPDATE_EVENT,
            Arc::new(move |payload| {
                sink.lock()
                    .unwrap()
                    .push(payload["file"].as_str().unwrap().to_string());
            }),
        );

        let transport: Arc<dyn Transport> = server_side;
        notify_component_update(&transport, "/src/components/Button.astro").unwrap();
        assert_eq!(
            seen.lock().unwrap().as_slice(),
            ["/src/components/Button.astro"]
        );
    }
}
