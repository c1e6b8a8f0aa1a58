//! Storage-engine error types.

use thiserror::Error;

use crate::attribute::{AttributeError, AttributeId};
use crate::entity::EntityId;

/// Errors raised by scene, entity and component operations.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("entity {0} not found")]
    EntityNotFound(EntityId),

    /// Explicit ids must be non-zero and free.
    #[error("entity id {0} is invalid or already in use")]
    IdUnavailable(EntityId),

    #[error("entity {parent} is already {limit} levels deep")]
    NestingTooDeep { parent: EntityId, limit: usize },

    #[error("no free entity id left in the {0} range")]
    IdsExhausted(&'static str),

    #[error("unknown component type: {0}")]
    UnknownComponentType(String),

    #[error("component type '{0}' has a fixed attribute set")]
    FixedAttributes(String),

    #[error("attribute '{name}' already exists on '{component}'")]
    DuplicateAttribute { component: String, name: String },

    #[error("no free attribute id left on '{0}'")]
    AttributeIdsExhausted(String),

    #[error("attribute {id} not found on '{component}'")]
    AttributeNotFound { component: String, id: AttributeId },

    #[error("scene '{0}' already exists")]
    DuplicateScene(String),

    #[error(transparent)]
    Attribute(#[from] AttributeError),
}
