//! Resolves path segments to scene objects.
//!
//! Lookups stop at the first unresolved step. The locator returns ids and
//! indices rather than references so that the dispatcher can take a mutable
//! borrow of the scene afterwards.

use engine_scene::{AttributeId, EntityId, Scene};
use thiserror::Error;

use crate::path::ResourcePath;

/// A step of the address that did not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorMiss {
    #[error("no entity with id '{0}'")]
    Entity(String),

    #[error("no entity named '{0}'")]
    EntityName(String),

    #[error("entity {entity} has no component of type '{type_name}'")]
    Component { entity: EntityId, type_name: String },

    #[error("component '{type_name}' on entity {entity} has no attribute '{key}'")]
    Attribute {
        entity: EntityId,
        type_name: String,
        key: String,
    },
}

/// Address of a component: owning entity plus index in its component list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentRef {
    pub entity: EntityId,
    pub index: usize,
}

/// Address of an attribute within a located component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeRef {
    pub component: ComponentRef,
    pub id: AttributeId,
}

/// Parse a decimal entity id, yielding [`EntityId::INVALID`] on failure.
#[must_use]
pub fn parse_entity_id(segment: &str) -> EntityId {
    segment.trim().parse().map(EntityId).unwrap_or(EntityId::INVALID)
}

/// Entity addressed by the numeric id in segment 1.
///
/// # Errors
///
/// Returns [`LocatorMiss::Entity`] if the id does not parse or is not live.
pub fn locate_entity(scene: &Scene, path: &ResourcePath) -> Result<EntityId, LocatorMiss> {
    let segment = path.segment(1);
    let id = parse_entity_id(segment);
    if scene.has_entity(id) {
        Ok(id)
    } else {
        Err(LocatorMiss::Entity(segment.to_string()))
    }
}

/// Entity addressed by human name.
///
/// # Errors
///
/// Returns [`LocatorMiss::EntityName`] if no entity has this name.
pub fn locate_entity_by_name(scene: &Scene, name: &str) -> Result<EntityId, LocatorMiss> {
    scene
        .entity_by_name(name)
        .map(|entity| entity.id())
        .ok_or_else(|| LocatorMiss::EntityName(name.to_string()))
}

/// First component whose type is segment 2, on the entity of segment 1.
///
/// # Errors
///
/// Returns the first unresolved step.
pub fn locate_component(scene: &Scene, path: &ResourcePath) -> Result<ComponentRef, LocatorMiss> {
    let entity_id = locate_entity(scene, path)?;
    let type_name = path.segment(2);
    scene
        .entity(entity_id)
        .and_then(|entity| entity.first_component_of_type(type_name))
        .map(|index| ComponentRef {
            entity: entity_id,
            index,
        })
        .ok_or_else(|| LocatorMiss::Component {
            entity: entity_id,
            type_name: type_name.to_string(),
        })
}

/// Attribute named (or numbered) by segment 3 on the located component.
///
/// # Errors
///
/// Returns the first unresolved step.
pub fn locate_attribute(scene: &Scene, path: &ResourcePath) -> Result<AttributeRef, LocatorMiss> {
    let component = locate_component(scene, path)?;
    let key = path.segment(3);
    scene
        .entity(component.entity)
        .and_then(|entity| entity.components().get(component.index))
        .and_then(|comp| comp.resolve_attribute_id(key))
        .map(|id| AttributeRef { component, id })
        .ok_or_else(|| LocatorMiss::Attribute {
            entity: component.entity,
            type_name: path.segment(2).to_string(),
            key: key.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_scene::{AttributeType, DYNAMIC_COMPONENT};

    fn scene() -> Scene {
        let mut scene = Scene::new("test");
        scene.create_entity(EntityId(5)).unwrap();
        scene.set_entity_name(EntityId(5), "box").unwrap();
        scene
            .get_or_create_component(EntityId(5), DYNAMIC_COMPONENT, "first", true)
            .unwrap()
            .create_attribute(AttributeType::Real, "speed", None)
            .unwrap();
        scene
            .get_or_create_component(EntityId(5), DYNAMIC_COMPONENT, "second", true)
            .unwrap();
        scene
    }

    #[test]
    fn test_parse_entity_id_is_permissive() {
        assert_eq!(parse_entity_id("17"), EntityId(17));
        assert_eq!(parse_entity_id(" 17 "), EntityId(17));
        assert_eq!(parse_entity_id("abc"), EntityId::INVALID);
        assert_eq!(parse_entity_id("-3"), EntityId::INVALID);
    }

    #[test]
    fn test_locate_entity() {
        let scene = scene();
        assert_eq!(locate_entity(&scene, &ResourcePath::parse("/entities/5")), Ok(EntityId(5)));
        assert_eq!(
            locate_entity(&scene, &ResourcePath::parse("/entities/6")),
            Err(LocatorMiss::Entity("6".into()))
        );
        assert!(locate_entity(&scene, &ResourcePath::parse("/entities/x")).is_err());
    }

    #[test]
    fn test_locate_entity_by_name() {
        let scene = scene();
        assert_eq!(locate_entity_by_name(&scene, "box"), Ok(EntityId(5)));
        assert!(locate_entity_by_name(&scene, "lamp").is_err());
    }

    #[test]
    fn test_first_matching_component_wins() {
        let scene = scene();
        let found = locate_component(&scene, &ResourcePath::parse("/entities/5/DynamicComponent")).unwrap();
        let comp = &scene.entity(EntityId(5)).unwrap().components()[found.index];
        assert_eq!(comp.name(), "first");
    }

    #[test]
    fn test_locate_attribute_by_id_or_name() {
        let scene = scene();
        let by_name = locate_attribute(&scene, &ResourcePath::parse("/entities/5/DynamicComponent/speed")).unwrap();
        let by_id = locate_attribute(&scene, &ResourcePath::parse("/entities/5/DynamicComponent/0")).unwrap();
        assert_eq!(by_name, by_id);
        assert!(matches!(
            locate_attribute(&scene, &ResourcePath::parse("/entities/5/DynamicComponent/mass")),
            Err(LocatorMiss::Attribute { .. })
        ));
    }

    #[test]
    fn test_stops_at_first_miss() {
        let scene = scene();
        assert!(matches!(
            locate_attribute(&scene, &ResourcePath::parse("/entities/5/Mesh/meshRef")),
            Err(LocatorMiss::Component { .. })
        ));
    }
}
