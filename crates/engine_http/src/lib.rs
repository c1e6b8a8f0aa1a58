//! # engine_http
//!
//! Exposes the active scene as HTTP resources with XML bodies.
//!
//! This crate provides:
//!
//! - [`path`]: request target parsing into segments and query pairs.
//! - [`locator`]: segment lookup of entities, components and attributes.
//! - [`dispatch`]: verb/depth routing and the CRUD handlers.
//! - [`codec`]: XML encoding and decoding of scene objects.
//! - [`apply`]: applying decoded documents to a scene.
//! - [`reply`]: status, content type and body of responses.
//! - [`bridge`]: the queue between transport threads and the scene thread.
//! - [`server`]: the `rouille` listener, polling and fallback handlers.

pub mod apply;
pub mod bridge;
pub mod codec;
pub mod dispatch;
pub mod locator;
pub mod path;
pub mod reply;
pub mod request;
pub mod server;

pub use bridge::{BridgeError, PendingRequest, RequestReceiver, RequestSender, bridge};
pub use codec::{CodecError, decode_scene, encode_component, encode_entity, encode_scene};
pub use dispatch::{RequestError, Route, dispatch, handle_scene_request};
pub use locator::LocatorMiss;
pub use path::{ResourcePath, is_scene_path};
pub use reply::Reply;
pub use request::{HttpRequest, Method};
pub use server::{FallbackHandler, HttpServer, ServerConfig, ServerError};
