//! Lifecycle wrapper that owns the HTTP server inside the host.

use engine_http::{HttpServer, ServerConfig};
use engine_scene::SceneManager;
use tracing::{info, warn};

/// Starts the server on initialize (when a port was given), pumps it every
/// update and stops it on uninitialize.
pub struct HttpServerModule {
    port: Option<u16>,
    server: HttpServer,
}

impl HttpServerModule {
    /// `port` is the requested listen port; `None` leaves the server off.
    #[must_use]
    pub fn new(port: Option<u16>, config: ServerConfig) -> Self {
        let config = config.with_port(port.unwrap_or(0));
        Self {
            port,
            server: HttpServer::new(config),
        }
    }

    #[must_use]
    pub fn server(&self) -> &HttpServer {
        &self.server
    }

    /// Register fallback handlers and the like before initializing.
    pub fn server_mut(&mut self) -> &mut HttpServer {
        &mut self.server
    }

    /// Start the server if a valid port was configured. Returns whether the
    /// server is running afterwards.
    pub fn initialize(&mut self) -> bool {
        match self.port {
            None => info!("no HTTP port given, HTTP server disabled"),
            Some(0) => warn!("invalid HTTP port 0, HTTP server disabled"),
            Some(_) if self.server.is_running() => warn!("HTTP server already started"),
            // Startup failures are logged by the server.
            Some(_) => return self.server.start().is_ok(),
        }
        self.server.is_running()
    }

    /// Handle queued requests. Returns how many were answered.
    pub fn update(&mut self, scenes: &mut SceneManager) -> usize {
        self.server.poll(scenes)
    }

    pub fn uninitialize(&mut self) {
        self.server.stop();
    }
}
