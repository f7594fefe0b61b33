//! Storycanvas
//!
//! Client/server preview rendering for server-side templated components in
//! story catalogs. A dev-server adapter performs real server-side rendering;
//! the browser-side renderer requests that HTML over a live-reload transport
//! and mounts it into a canvas element.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use storycanvas::{CanvasRenderer, RenderContext, RendererConfig, StoryContext, StoryValue};
//! use storycanvas::dom::Document;
//! use storycanvas::host::{NoopHostUi, NoopPageLifecycle};
//!
//! # fn main() -> storycanvas::Result<()> {
//! let renderer = CanvasRenderer::new(
//!     None, // no live-reload channel: remote renders fail inline
//!     Arc::new(NoopHostUi),
//!     Arc::new(NoopPageLifecycle),
//!     RendererConfig::default(),
//! );
//!
//! let document = Document::new();
//! let ctx = RenderContext {
//!     story_fn: Box::new(|| StoryValue::Markup("<p>hi</p>".to_string())),
//!     force_remount: false,
//!     story_context: StoryContext::new("button--primary", "Primary", "Components/Button"),
//! };
//! renderer.render_to_canvas(&ctx, &document)?;
//! assert_eq!(document.canvas().inner_html(), "<p>hi</p>");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod assets;
pub mod classify;
pub mod correlator;
pub mod docs;
pub mod dom;
pub mod host;
pub mod protocol;
pub mod render;
pub mod server;
pub mod transport;

// Async-friendly preview API (worker-backed abstraction)
pub mod async_api;

// Dev-toolbar config discovery side-channel
#[cfg(feature = "toolbar")]
pub mod toolbar;

pub use async_api::Preview;
pub use classify::{CallableValue, StoryValue};
pub use correlator::{RequestCorrelator, DEFAULT_RENDER_TIMEOUT_MS};
pub use protocol::{JsonMap, RenderRequest, RenderResponse};
pub use render::CanvasRenderer;
pub use transport::{ChannelTransport, Transport};

/// Configuration for the preview renderer
///
/// The default render timeout matches what a developer tolerates while
/// switching stories; a server that cannot answer within it is treated as
/// unreachable for that request.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Timeout for one render request in milliseconds
    pub render_timeout_ms: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            render_timeout_ms: DEFAULT_RENDER_TIMEOUT_MS,
        }
    }
}

/// Read-only story view supplied by the host cataloging tool per render
#[derive(Clone)]
pub struct StoryContext {
    /// Story id, e.g. `button--primary`
    pub id: String,
    /// Display name of the story
    pub name: String,
    /// Slash-delimited hierarchical path, e.g. `Components/Button`
    pub title: String,
    /// The resolved component value from the story's default export
    pub component: Option<StoryValue>,
    /// Story args; may contain a reserved `slots` sub-mapping that is split
    /// out before props are forwarded to the server
    pub args: JsonMap,
}

impl StoryContext {
    pub fn new(id: impl Into<String>, name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            title: title.into(),
            component: None,
            args: JsonMap::new(),
        }
    }
}

/// Everything one render cycle needs
pub struct RenderContext {
    /// Invoked once per cycle to obtain the story's element
    pub story_fn: Box<dyn Fn() -> StoryValue + Send + Sync>,
    /// Forces replacement even when the canvas already holds the same node
    pub force_remount: bool,
    pub story_context: StoryContext,
}
