//! Dev-toolbar config discovery side-channel
//!
//! A small HTTP endpoint lets the templating framework's dev toolbar find the
//! running catalog server: `GET /__storybook-config` answers `{ port, host }`
//! as JSON. Not part of the render core, but the toolbar integration needs it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Path served by the config endpoint
pub const CONFIG_ENDPOINT: &str = "/__storybook-config";

/// Location of the running catalog server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolbarConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        Self {
            port: 6006,
            host: "localhost".to_string(),
        }
    }
}

/// Handle to a running config endpoint
pub struct ConfigServer {
    addr: String,
    server: Arc<tiny_http::Server>,
}

impl ConfigServer {
    /// Address the endpoint is bound to, e.g. `127.0.0.1:43210`
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Stop accepting requests
    pub fn shutdown(&self) {
        self.server.unblock();
    }
}

/// Serve the config endpoint on `bind` (use port 0 for an ephemeral port).
/// Requests for any other path get a 404.
pub fn serve_config(bind: &str, config: ToolbarConfig) -> Result<ConfigServer> {
    let server = tiny_http::Server::http(bind)
        .map_err(|err| Error::Network(format!("failed to bind config endpoint: {err}")))?;
    let server = Arc::new(server);
    let addr = server.server_addr().to_string();

    let body = serde_json::to_string(&config)?;
    let content_type = "Content-Type: application/json"
        .parse::<tiny_http::Header>()
        .map_err(|()| Error::Network("invalid content-type header".to_string()))?;
    let worker = Arc::clone(&server);
    std::thread::spawn(move || {
        for request in worker.incoming_requests() {
            if request.url() == CONFIG_ENDPOINT {
                let response =
                    tiny_http::Response::from_string(body.clone()).with_header(content_type.clone());
                let _ = request.respond(response);
            } else {
                let _ = request.respond(
                    tiny_http::Response::from_string("Not Found").with_status_code(404),
                );
            }
        }
    });

    Ok(ConfigServer { addr, server })
}

/// Fetch and decode the config from a running endpoint
pub fn discover(base_url: &str) -> Result<ToolbarConfig> {
    let url = format!("{base_url}{CONFIG_ENDPOINT}");
    let response = reqwest::blocking::get(&url)
        .map_err(|err| Error::Network(format!("config discovery failed: {err}")))?;
    response
        .json::<ToolbarConfig>()
        .map_err(|err| Error::Network(format!("malformed config payload: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_round_trips_over_http() {
        let config = ToolbarConfig {
            port: 7007,
            host: "0.0.0.0".to_string(),
        };
        let endpoint = serve_config("127.0.0.1:0", config.clone()).unwrap();

        let discovered = discover(&format!("http://{}", endpoint.addr())).unwrap();
        assert_eq!(discovered, config);

        endpoint.shutdown();
    }

    #[test]
    fn other_paths_are_not_found() {
        let endpoint = serve_config("127.0.0.1:0", ToolbarConfig::default()).unwrap();
        let status = reqwest::blocking::get(format!("http://{}/other", endpoint.addr()))
            .unwrap()
            .status();
        assert_eq!(status.as_u16(), 404);
        endpoint.shutdown();
    }
}
