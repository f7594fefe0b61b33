//! Wire types for the render request/response protocol
//!
//! The dev server and the preview client exchange three named events over the
//! live-reload transport: a render request, its response, and an out-of-band
//! component-update notification used for cache invalidation. Payloads are
//! plain JSON objects so either side can evolve independently.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// JSON object type used for story args/props
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Event name for client-to-server render requests
pub const RENDER_REQUEST_EVENT: &str = "astro:render:request";

/// Event name for server-to-client render responses
pub const RENDER_RESPONSE_EVENT: &str = "astro:render:response";

/// Event name fired by the server whenever a templating-language source file changes
pub const COMPONENT_UPDATE_EVENT: &str = "astro:component:update";

/// A render request sent from client to server.
///
/// The `id` is assigned by the request correlator when the request is sent;
/// it is session-unique and echoed back in the matching [`RenderResponse`].
/// Never mutated after creation, consumed exactly once by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub id: String,
    /// Module identity of the target component
    pub component: String,
    /// Named properties forwarded to the component
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub args: JsonMap,
    /// Named slots of pre-rendered markup
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub slots: BTreeMap<String, String>,
}

impl RenderRequest {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            component: component.into(),
            args: JsonMap::new(),
            slots: BTreeMap::new(),
        }
    }
}

/// A render response sent from server to client, echoing the request id.
///
/// An error response still carries a best-effort HTML fallback (a styled
/// error fragment) so the canvas always has something paintable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderResponse {
    pub id: String,
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Out-of-band notification that a component source file changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentUpdate {
    pub file: String,
}

/// Escape HTML special characters so error text cannot inject markup
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#039;")
}

/// Build the styled inline error fragment painted into the canvas when a
/// render fails. Used by both sides so failures look the same regardless of
/// where they happened.
pub fn error_fragment(message: &str) -> String {
    format!(
        "<div style=\"color: #dc2626; background: #fef2f2; padding: 16px; border-radius: 8px; font-family: system-ui;\">\
<strong>Failed to render component</strong>\
<pre style=\"margin: 8px 0 0; white-space: pre-wrap;\">{}</pre>\
</div>",
        escape_html(message)
    )
}
