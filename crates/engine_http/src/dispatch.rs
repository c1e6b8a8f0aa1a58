//! Verb + depth dispatch over the active scene.
//!
//! Every scene request is classified into a [`Route`] from its verb, path
//! depth, query and body, executed against the scene, and turned into a
//! [`Reply`]. Failures fall through to the verb's terminal reply: GET (and
//! verbs without handlers) end in a bare 404, DELETE/PUT/POST in a 400
//! "Bad Request". Clients observe this difference, so it is kept.

use engine_scene::{Component, EntityId, Scene, SceneError, SceneManager};
use thiserror::Error;
use tracing::debug;

use crate::apply::{apply_attributes, apply_query, build_entity, replace_entity};
use crate::codec::{
    CodecError, EntityDescriptor, decode_component, decode_entity, encode_component, encode_entity,
    encode_scene,
};
use crate::locator::{
    ComponentRef, LocatorMiss, locate_attribute, locate_component, locate_entity,
    locate_entity_by_name, parse_entity_id,
};
use crate::path::ResourcePath;
use crate::reply::{Reply, STATUS_BAD_REQUEST, STATUS_OK};
use crate::request::{HttpRequest, Method};

/// Why a scene request failed.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The body is not well-formed XML.
    #[error(transparent)]
    MalformedBody(CodecError),

    #[error("resource not found: {0}")]
    ResourceNotFound(#[from] LocatorMiss),

    /// The target exists but cannot take this mutation.
    #[error("invalid mutation target: {0}")]
    InvalidMutationTarget(String),

    #[error("no handler for {method} at depth {depth}")]
    Unrouted { method: String, depth: usize },

    #[error("no active scene")]
    NoActiveScene,

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Encode(CodecError),
}

impl From<CodecError> for RequestError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Malformed { .. } => Self::MalformedBody(err),
            _ => Self::Encode(err),
        }
    }
}

impl RequestError {
    /// The reply for this failure under `method`.
    #[must_use]
    pub fn to_reply(&self, method: &Method) -> Reply {
        match self {
            Self::MalformedBody(err) => Reply::text(STATUS_BAD_REQUEST, err.to_string()),
            Self::NoActiveScene => Reply::not_found(),
            // GET misses are terminal 404s; mutating verbs answer 400.
            _ => match method {
                Method::Delete | Method::Put | Method::Post => Reply::bad_request(),
                Method::Get | Method::Other(_) => Reply::not_found(),
            },
        }
    }
}

/// The handler selected for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    GetScene,
    GetEntityByName(String),
    GetEntity,
    GetComponent,
    GetAttribute,
    DeleteEntityByName(String),
    DeleteEntity,
    DeleteComponent,
    DeleteAttribute,
    /// Depth 3 with a query; takes precedence over a body.
    PutComponentQuery,
    PutComponentBody,
    /// Destructive replace of an entity's components and children.
    PutEntityBody,
    PostEntity,
    PostEntityWithId,
    PostComponent,
    /// No handler for this verb/depth combination.
    Unrouted,
}

impl Route {
    #[must_use]
    pub fn classify(method: &Method, path: &ResourcePath, has_body: bool) -> Self {
        let depth = path.depth();
        match method {
            Method::Get => match depth {
                1 => match path.query_value("name") {
                    Some(name) => Self::GetEntityByName(name.to_string()),
                    None => Self::GetScene,
                },
                2 => Self::GetEntity,
                3 => Self::GetComponent,
                4 => Self::GetAttribute,
                _ => Self::Unrouted,
            },
            Method::Delete => match depth {
                1 => path
                    .query_value("name")
                    .map_or(Self::Unrouted, |name| Self::DeleteEntityByName(name.to_string())),
                2 => Self::DeleteEntity,
                3 => Self::DeleteComponent,
                4 => Self::DeleteAttribute,
                _ => Self::Unrouted,
            },
            Method::Put => match depth {
                3 if path.has_query() => Self::PutComponentQuery,
                3 if has_body => Self::PutComponentBody,
                2 if has_body => Self::PutEntityBody,
                _ => Self::Unrouted,
            },
            Method::Post => match depth {
                1 => Self::PostEntity,
                2 => Self::PostEntityWithId,
                3 => Self::PostComponent,
                _ => Self::Unrouted,
            },
            Method::Other(_) => Self::Unrouted,
        }
    }
}

/// Handle a scene request against the manager's active scene.
pub fn handle_scene_request(scenes: &mut SceneManager, request: &HttpRequest) -> Reply {
    match scenes.active_scene_mut() {
        Some(scene) => dispatch(scene, request),
        None => {
            debug!(path = request.path(), "no active scene");
            RequestError::NoActiveScene.to_reply(&request.method)
        }
    }
}

/// Handle a scene request against `scene`.
pub fn dispatch(scene: &mut Scene, request: &HttpRequest) -> Reply {
    let path = ResourcePath::parse(&request.url);
    let route = Route::classify(&request.method, &path, request.has_body());
    match execute(scene, &route, &path, request) {
        Ok(reply) => reply,
        Err(err) => {
            debug!(method = %request.method, path = request.path(), error = %err, "scene request failed");
            err.to_reply(&request.method)
        }
    }
}

fn execute(
    scene: &mut Scene,
    route: &Route,
    path: &ResourcePath,
    request: &HttpRequest,
) -> Result<Reply, RequestError> {
    match route {
        Route::GetScene => Ok(Reply::xml(encode_scene(scene)?)),
        Route::GetEntityByName(name) => {
            let id = locate_entity_by_name(scene, name)?;
            entity_reply(scene, id)
        }
        Route::GetEntity => {
            let id = locate_entity(scene, path)?;
            entity_reply(scene, id)
        }
        Route::GetComponent => {
            let found = locate_component(scene, path)?;
            component_reply(scene, found)
        }
        Route::GetAttribute => {
            let found = locate_attribute(scene, path)?;
            let value = component_ref(scene, found.component)?
                .attribute_by_id(found.id)
                .map(|attr| attr.value().to_string())
                .ok_or_else(|| LocatorMiss::Attribute {
                    entity: found.component.entity,
                    type_name: path.segment(2).to_string(),
                    key: path.segment(3).to_string(),
                })?;
            Ok(Reply::text(STATUS_OK, value))
        }

        Route::DeleteEntityByName(name) => {
            let id = locate_entity_by_name(scene, name)?;
            scene.remove_entity(id);
            Ok(Reply::deleted())
        }
        Route::DeleteEntity => {
            let id = locate_entity(scene, path)?;
            scene.remove_entity(id);
            Ok(Reply::deleted())
        }
        Route::DeleteComponent => {
            let found = locate_component(scene, path)?;
            scene
                .entity_mut(found.entity)
                .and_then(|entity| entity.remove_component(found.index))
                .ok_or_else(|| LocatorMiss::Entity(found.entity.to_string()))?;
            Ok(Reply::deleted())
        }
        Route::DeleteAttribute => {
            let found = locate_attribute(scene, path)?;
            component_mut(scene, found.component)?.remove_attribute(found.id)?;
            Ok(Reply::deleted())
        }

        Route::PutComponentQuery => {
            let found = locate_component(scene, path)?;
            apply_query(component_mut(scene, found)?, path.query_pairs());
            component_reply(scene, found)
        }
        Route::PutComponentBody => {
            let desc = decode_component(&request.body)?
                .ok_or_else(|| RequestError::InvalidMutationTarget("body is not a component document".into()))?;
            let found = locate_component(scene, path)?;
            apply_attributes(component_mut(scene, found)?, &desc.attributes);
            component_reply(scene, found)
        }
        Route::PutEntityBody => {
            let desc = decode_entity(&request.body)?
                .ok_or_else(|| RequestError::InvalidMutationTarget("body is not an entity document".into()))?;
            let id = locate_entity(scene, path)?;
            replace_entity(scene, id, &desc)?;
            entity_reply(scene, id)
        }

        Route::PostEntity | Route::PostEntityWithId => {
            let mut desc = if request.has_body() {
                decode_entity(&request.body)?.unwrap_or_default()
            } else {
                EntityDescriptor::default()
            };
            desc.id = match route {
                Route::PostEntityWithId => Some(parse_entity_id(path.segment(1)).id()),
                _ => None,
            };
            let id = build_entity(scene, None, &desc)?;
            entity_reply(scene, id)
        }
        Route::PostComponent => {
            let desc = if request.has_body() {
                let desc = decode_component(&request.body)?.ok_or_else(|| {
                    RequestError::InvalidMutationTarget("body is not a component document".into())
                })?;
                Some(desc)
            } else {
                None
            };
            let entity_id = locate_entity(scene, path)?;
            let type_name = path.segment(2);
            if !scene.registry().is_registered(type_name) {
                return Err(SceneError::UnknownComponentType(type_name.to_string()).into());
            }

            let name = desc.as_ref().map_or("", |d| d.name.as_str());
            let replicated = desc.as_ref().is_none_or(|d| d.replicated);
            let existed = scene
                .entity(entity_id)
                .and_then(|entity| entity.component_index(type_name, name))
                .is_some();
            let component = scene.get_or_create_component(entity_id, type_name, name, replicated)?;
            if let Some(desc) = &desc {
                if !existed {
                    component.set_temporary(desc.temporary);
                }
                apply_attributes(component, &desc.attributes);
            }
            let index = scene
                .entity(entity_id)
                .and_then(|entity| entity.component_index(type_name, name))
                .ok_or_else(|| LocatorMiss::Component {
                    entity: entity_id,
                    type_name: type_name.to_string(),
                })?;
            component_reply(
                scene,
                ComponentRef {
                    entity: entity_id,
                    index,
                },
            )
        }

        Route::Unrouted => Err(RequestError::Unrouted {
            method: request.method.to_string(),
            depth: path.depth(),
        }),
    }
}

fn entity_reply(scene: &Scene, id: EntityId) -> Result<Reply, RequestError> {
    let xml = encode_entity(scene, id)?.ok_or_else(|| LocatorMiss::Entity(id.to_string()))?;
    Ok(Reply::xml(xml))
}

fn component_reply(scene: &Scene, found: ComponentRef) -> Result<Reply, RequestError> {
    Ok(Reply::xml(encode_component(component_ref(scene, found)?)?))
}

fn component_ref(scene: &Scene, found: ComponentRef) -> Result<&Component, RequestError> {
    scene
        .entity(found.entity)
        .and_then(|entity| entity.components().get(found.index))
        .ok_or_else(|| LocatorMiss::Entity(found.entity.to_string()).into())
}

fn component_mut(scene: &mut Scene, found: ComponentRef) -> Result<&mut Component, RequestError> {
    scene
        .entity_mut(found.entity)
        .and_then(|entity| entity.component_mut(found.index))
        .ok_or_else(|| LocatorMiss::Entity(found.entity.to_string()).into())
}
