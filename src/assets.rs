//! Global asset injection for the preview document
//!
//! On canvas load the host provides two independently-loadable lists of URLs
//! (stylesheets and scripts). Injection appends the matching tags to the
//! document; a list that fails to load is treated as "nothing configured"
//! and silently ignored.

use crate::dom::{self, Document};
use crate::Result;
use url::Url;

/// Provider of the two host-configured asset lists
pub trait AssetSource: Send + Sync {
    fn stylesheets(&self) -> Result<Vec<String>>;
    fn scripts(&self) -> Result<Vec<String>>;
}

/// Fixed asset lists, as read from the framework options
#[derive(Debug, Clone, Default)]
pub struct StaticAssets {
    pub stylesheets: Vec<String>,
    pub scripts: Vec<String>,
}

impl AssetSource for StaticAssets {
    fn stylesheets(&self) -> Result<Vec<String>> {
        Ok(self.stylesheets.clone())
    }

    fn scripts(&self) -> Result<Vec<String>> {
        Ok(self.scripts.clone())
    }
}

/// Append stylesheet links to the head and script tags to the body.
/// Script tags appended this way load and run, so they go through the
/// document's execution log.
pub fn inject_global_assets(document: &Document, source: &dyn AssetSource) {
    match source.stylesheets() {
        Ok(stylesheets) => {
            for href in stylesheets {
                let href = normalize_asset_path(&href);
                let link = dom::new_element("link", &[("rel", "stylesheet"), ("href", &href)]);
                document.head().append_child(link);
            }
        }
        Err(_) => { /* no stylesheets configured */ }
    }

    match source.scripts() {
        Ok(scripts) => {
            for src in scripts {
                let src = normalize_asset_path(&src);
                let script = dom::new_element("script", &[("src", &src)]);
                document.body().append_child(script.clone());
                document.run_script(&script);
            }
        }
        Err(_) => { /* no scripts configured */ }
    }
}

/// Normalize an asset path for injection: absolute http(s) URLs are kept
/// as-is, relative paths lose a leading `./` and gain a leading `/`.
pub fn normalize_asset_path(path: &str) -> String {
    if let Ok(url) = Url::parse(path) {
        if matches!(url.scheme(), "http" | "https") {
            return path.to_string();
        }
    }

    let path = path.strip_prefix("./").unwrap_or(path);
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
