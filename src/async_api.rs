//! Async-friendly preview API (worker-backed abstraction)
//!
//! The worker thread owns a [`CanvasRenderer`] and its [`Document`] and
//! executes commands sent from async tasks, so callers get an async interface
//! without sharing the document across threads.

use crate::dom::Document;
use crate::host::{NoopHostUi, NoopPageLifecycle};
use crate::render::CanvasRenderer;
use crate::transport::Transport;
use crate::{Error, RenderContext, RendererConfig, Result};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Render(RenderContext, oneshot::Sender<Result<()>>),
    CanvasHtml(oneshot::Sender<Result<String>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async preview handle backed by a dedicated worker thread
#[derive(Clone)]
pub struct Preview {
    cmd_tx: Sender<Command>,
}

impl Preview {
    /// Create a preview (spawns a background thread owning the renderer and
    /// document). Host signals and lifecycle simulation default to noops.
    pub async fn new(
        transport: Option<Arc<dyn Transport>>,
        config: RendererConfig,
    ) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::spawn(move || {
            let renderer = CanvasRenderer::new(
                transport,
                Arc::new(NoopHostUi),
                Arc::new(NoopPageLifecycle),
                config,
            );
            let document = Document::new();

            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Render(ctx, resp) => {
                        let res = renderer.render_to_canvas(&ctx, &document);
                        let _ = resp.send(res);
                    }
                    Command::CanvasHtml(resp) => {
                        let _ = resp.send(Ok(document.canvas().inner_html()));
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(Ok(()));
                        break;
                    }
                }
            }
        });

        let init_res = init_rx
            .await
            .map_err(|err| Error::Other(format!("Worker init canceled: {err}")))?;
        init_res?;

        Ok(Self { cmd_tx })
    }

    /// Run one render cycle for a story
    pub async fn render(&self, ctx: RenderContext) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Render(ctx, tx));
        rx.await
            .map_err(|err| Error::Other(format!("Render canceled: {err}")))?
    }

    /// Current canvas markup
    pub async fn canvas_html(&self) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::CanvasHtml(tx));
        rx.await
            .map_err(|err| Error::Other(format!("CanvasHtml canceled: {err}")))?
    }

    /// Shutdown the background worker
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Close(tx));
        rx.await
            .map_err(|err| Error::Other(format!("Close canceled: {err}")))?
    }
}
