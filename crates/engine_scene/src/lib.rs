//! # engine_scene
//!
//! In-memory scene graph served over HTTP by `engine_http`.
//!
//! This crate provides:
//!
//! - [`attribute`]: typed attribute values and their text form.
//! - [`component`]: fixed and dynamic components.
//! - [`entity`]: entity ids, entity nodes and the id allocator.
//! - [`registry`]: component type registry, including placeholder types.
//! - [`scene`]: the entity arena with parent/child links.
//! - [`manager`]: named scenes and the active-scene rule.
//! - [`error`]: scene error types.

pub mod attribute;
pub mod component;
pub mod entity;
pub mod error;
pub mod manager;
pub mod registry;
pub mod scene;

pub use attribute::{
    Attribute, AttributeError, AttributeId, AttributeType, AttributeValue, parse_bool, parse_bool_or,
};
pub use component::{Component, ComponentKind};
pub use entity::{Entity, EntityId, IdAllocator};
pub use error::SceneError;
pub use manager::{DEFAULT_SCENE_NAME, SceneManager};
pub use registry::{
    AttributeSpec, ComponentRegistry, ComponentSchema, DYNAMIC_COMPONENT, NAME_COMPONENT,
};
pub use scene::{MAX_ENTITY_DEPTH, Scene};
