//! Host-UI and page-lifecycle collaborators
//!
//! The story-cataloging tool owns the surrounding UI and the page-lifecycle
//! simulation; the renderer only talks to them through these traits. Noop
//! implementations are safe defaults; the recording variants exist for tests
//! that assert on the signals a render cycle emits.

use crate::dom::Canvas;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Signals to the host cataloging tool's UI
pub trait HostUi: Send + Sync {
    /// Unblock the host's loading indicator; must not wait on network I/O
    fn show_main(&self);

    /// Surface a host-level error (user-authoring mistakes, not system faults)
    fn show_error(&self, title: &str, description: &str);
}

/// Page-lifecycle simulators for scripts that gate on load/DOM-ready events
pub trait PageLifecycle: Send + Sync {
    fn simulate_page_load(&self, canvas: &Canvas);
    fn simulate_dom_ready(&self);
}

/// Host that ignores all signals
pub struct NoopHostUi;

impl HostUi for NoopHostUi {
    fn show_main(&self) {}
    fn show_error(&self, title: &str, description: &str) {
        log::warn!("host error: {title} - {description}");
    }
}

/// Lifecycle simulator that does nothing
pub struct NoopPageLifecycle;

impl PageLifecycle for NoopPageLifecycle {
    fn simulate_page_load(&self, _canvas: &Canvas) {}
    fn simulate_dom_ready(&self) {}
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Test double recording every host signal
#[derive(Default)]
pub struct RecordingHostUi {
    main_shown: Mutex<usize>,
    errors: Mutex<Vec<(String, String)>>,
}

impl RecordingHostUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn main_shown(&self) -> usize {
        *guard(&self.main_shown)
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        guard(&self.errors).clone()
    }
}

impl HostUi for RecordingHostUi {
    fn show_main(&self) {
        *guard(&self.main_shown) += 1;
    }

    fn show_error(&self, title: &str, description: &str) {
        guard(&self.errors).push((title.to_string(), description.to_string()));
    }
}

/// Test double recording lifecycle simulations
#[derive(Default)]
pub struct RecordingPageLifecycle {
    page_loads: Mutex<usize>,
    dom_readies: Mutex<usize>,
}

impl RecordingPageLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_loads(&self) -> usize {
        *guard(&self.page_loads)
    }

    pub fn dom_readies(&self) -> usize {
        *guard(&self.dom_readies)
    }
}

impl PageLifecycle for RecordingPageLifecycle {
    fn simulate_page_load(&self, _canvas: &Canvas) {
        *guard(&self.page_loads) += 1;
    }

    fn simulate_dom_ready(&self) {
        *guard(&self.dom_readies) += 1;
    }
}
