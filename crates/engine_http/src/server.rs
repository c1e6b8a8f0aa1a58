//! HTTP listener and the poll entry point.
//!
//! `rouille` accepts connections and reads bodies on its own threads. Each
//! worker converts the request into an [`HttpRequest`] and blocks on the
//! bridge; [`HttpServer::poll`], called from the host tick, answers queued
//! requests on the caller's thread. Requests outside the scene prefixes go
//! to the registered [`FallbackHandler`]s in order.

use std::io::Read;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use engine_scene::SceneManager;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::bridge::{RequestReceiver, RequestSender, bridge};
use crate::dispatch::handle_scene_request;
use crate::path::is_scene_path;
use crate::reply::Reply;
use crate::request::{HttpRequest, Method};

/// Errors from the server lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to listen on {address}: {reason}")]
    Bind { address: SocketAddr, reason: String },
}

/// Listener and bridge settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to listen on.
    pub bind: IpAddr,
    /// TCP port; `0` picks an ephemeral port.
    pub port: u16,
    /// Maximum number of requests waiting for a poll.
    pub queue_capacity: usize,
    /// Requests answered per [`HttpServer::poll`] call.
    pub requests_per_poll: usize,
    /// How long a worker waits for room in the queue.
    pub queue_timeout: Duration,
    /// How long a worker waits for the scene thread's reply.
    pub reply_timeout: Duration,
    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
            queue_capacity: 64,
            requests_per_poll: 1,
            queue_timeout: Duration::from_secs(1),
            reply_timeout: Duration::from_secs(30),
            max_body_bytes: 1 << 20,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn with_bind(mut self, bind: IpAddr) -> Self {
        self.bind = bind;
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Values below 1 are raised to 1.
    #[must_use]
    pub fn with_requests_per_poll(mut self, count: usize) -> Self {
        self.requests_per_poll = count.max(1);
        self
    }

    #[must_use]
    pub fn with_queue_timeout(mut self, timeout: Duration) -> Self {
        self.queue_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// The socket address the listener binds.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Handler for requests outside the scene prefixes.
///
/// Returning `None` passes the request on to the next handler.
pub trait FallbackHandler {
    fn handle(&mut self, request: &HttpRequest) -> Option<Reply>;
}

impl<F> FallbackHandler for F
where
    F: FnMut(&HttpRequest) -> Option<Reply>,
{
    fn handle(&mut self, request: &HttpRequest) -> Option<Reply> {
        self(request)
    }
}

struct Listener {
    address: SocketAddr,
    receiver: RequestReceiver,
    stop_tx: mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

/// Scene resource server.
pub struct HttpServer {
    config: ServerConfig,
    listener: Option<Listener>,
    fallbacks: Vec<Box<dyn FallbackHandler>>,
}

impl HttpServer {
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            listener: None,
            fallbacks: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.listener.is_some()
    }

    /// The bound address while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(|l| l.address)
    }

    /// Append a handler for non-scene requests.
    pub fn add_fallback(&mut self, handler: impl FallbackHandler + 'static) {
        self.fallbacks.push(Box::new(handler));
    }

    /// Bind the listener and start accepting. A running server is restarted.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the listener cannot be created; the
    /// server is left stopped.
    pub fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if self.is_running() {
            info!("HTTP server already running, restarting");
            self.stop();
        }

        let address = self.config.address();
        let (sender, receiver) = bridge(
            self.config.queue_capacity,
            self.config.queue_timeout,
            self.config.reply_timeout,
        );
        let max_body_bytes = self.config.max_body_bytes;
        let server = rouille::Server::new(address, move |request| serve(&sender, max_body_bytes, request))
            .map_err(|err| {
                error!(%address, error = %err, "failed to start HTTP server");
                ServerError::Bind {
                    address,
                    reason: err.to_string(),
                }
            })?;

        let bound = server.server_addr();
        let (thread, stop_tx) = server.stoppable();
        self.listener = Some(Listener {
            address: bound,
            receiver,
            stop_tx,
            thread,
        });
        info!(address = %bound, "HTTP server started");
        Ok(bound)
    }

    /// Stop listening. Requests still queued are dropped and answered 503 by
    /// their workers.
    pub fn stop(&mut self) {
        let Some(listener) = self.listener.take() else {
            return;
        };
        if listener.stop_tx.send(()).is_err() {
            warn!("HTTP listener thread already gone");
        }
        drop(listener.receiver);
        if listener.thread.join().is_err() {
            error!("HTTP listener thread panicked");
        }
        info!(address = %listener.address, "HTTP server stopped");
    }

    /// Answer up to `requests_per_poll` queued requests. Returns how many
    /// were handled.
    pub fn poll(&mut self, scenes: &mut SceneManager) -> usize {
        let Self {
            config,
            listener,
            fallbacks,
        } = self;
        let Some(listener) = listener else {
            return 0;
        };

        let mut handled = 0;
        while handled < config.requests_per_poll {
            let Some(pending) = listener.receiver.try_next() else {
                break;
            };
            let reply = route(fallbacks.as_mut_slice(), scenes, pending.request());
            debug!(
                request_id = %pending.id(),
                method = %pending.request().method,
                path = pending.request().path(),
                status = reply.status,
                "handled request"
            );
            let request_id = pending.id();
            if !pending.respond(reply) {
                debug!(%request_id, "client stopped waiting for reply");
            }
            handled += 1;
        }
        handled
    }

    /// Handle one request directly on the calling thread.
    pub fn handle(&mut self, scenes: &mut SceneManager, request: &HttpRequest) -> Reply {
        route(&mut self.fallbacks, scenes, request)
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn route(
    fallbacks: &mut [Box<dyn FallbackHandler>],
    scenes: &mut SceneManager,
    request: &HttpRequest,
) -> Reply {
    if is_scene_path(&request.url) {
        return handle_scene_request(scenes, request);
    }
    fallbacks
        .iter_mut()
        .find_map(|handler| handler.handle(request))
        .unwrap_or_else(Reply::not_found)
}

/// Why a request could not be read off the connection.
#[derive(Debug, Error)]
enum ReadError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Runs on a rouille worker thread.
fn serve(sender: &RequestSender, max_body_bytes: usize, request: &rouille::Request) -> rouille::Response {
    let request = match read_request(request, max_body_bytes) {
        Ok(request) => request,
        Err(err @ ReadError::TooLarge { .. }) => {
            debug!(error = %err, "rejected request body");
            return to_response(Reply::payload_too_large());
        }
        Err(err) => {
            debug!(error = %err, "failed to read request body");
            return to_response(Reply::bad_request());
        }
    };
    let reply = sender.submit(request).unwrap_or_else(|err| {
        warn!(error = %err, "request was not handled");
        Reply::service_unavailable()
    });
    to_response(reply)
}

/// Copy method, target and at most `max_body_bytes` of body.
fn read_request(request: &rouille::Request, max_body_bytes: usize) -> Result<HttpRequest, ReadError> {
    let mut body = Vec::new();
    if let Some(data) = request.data() {
        let limit = u64::try_from(max_body_bytes).unwrap_or(u64::MAX).saturating_add(1);
        data.take(limit).read_to_end(&mut body)?;
        if body.len() > max_body_bytes {
            return Err(ReadError::TooLarge {
                limit: max_body_bytes,
            });
        }
    }
    Ok(HttpRequest {
        method: Method::parse(request.method()),
        url: request.raw_url().to_string(),
        body,
    })
}

fn to_response(reply: Reply) -> rouille::Response {
    match reply.content_type {
        Some(content_type) => rouille::Response::from_data(content_type, reply.body),
        None => rouille::Response::empty_204(),
    }
    .with_status_code(reply.status)
}
