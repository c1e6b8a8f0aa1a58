//! Applying decoded documents to a scene.
//!
//! Unresolvable attributes and bad values are logged and skipped; they never
//! fail the request.

use engine_scene::{AttributeType, Component, EntityId, Scene, SceneError};
use tracing::warn;

use crate::codec::{AttributeDescriptor, ComponentDescriptor, EntityDescriptor};

/// Assign attribute values from a component body.
///
/// Each element is matched by numeric id when it carries an `id`, otherwise
/// by name. Unmatched elements create a new attribute on dynamic components;
/// on fixed components they are skipped with a warning. Returns the number
/// of attributes assigned.
pub fn apply_attributes(component: &mut Component, attributes: &[AttributeDescriptor]) -> usize {
    let mut applied = 0;
    for desc in attributes {
        let existing = match (&desc.id, &desc.name) {
            (Some(_), _) => desc
                .numeric_id()
                .and_then(|id| component.attribute_by_id(id))
                .map(|attr| attr.id()),
            (None, Some(name)) => component.attribute_by_name(name).map(|attr| attr.id()),
            (None, None) => None,
        };

        let id = match existing {
            Some(id) => Some(id),
            None if component.supports_dynamic_attributes() => create_attribute(component, desc),
            None => None,
        };
        let Some(id) = id else {
            warn!(
                component = component.type_name(),
                key = desc.key(),
                "could not resolve attribute in document, skipping"
            );
            continue;
        };

        if assign(component, id, &desc.value) {
            applied += 1;
        }
    }
    applied
}

/// Assign attribute values from query pairs, keyed by id or name.
pub fn apply_query(component: &mut Component, pairs: &[(String, String)]) -> usize {
    let mut applied = 0;
    for (key, value) in pairs {
        match component.resolve_attribute_id(key) {
            Some(id) => {
                if assign(component, id, value) {
                    applied += 1;
                }
            }
            None => warn!(
                component = component.type_name(),
                key = key.as_str(),
                "query names no attribute, skipping"
            ),
        }
    }
    applied
}

fn create_attribute(component: &mut Component, desc: &AttributeDescriptor) -> Option<u32> {
    let name = desc.name.as_deref().or(desc.id.as_deref())?;
    let ty = desc.type_name.as_deref().and_then(AttributeType::from_type_name)?;
    match component.create_attribute(ty, name, desc.numeric_id()) {
        Ok(attr) => Some(attr.id()),
        Err(err) => {
            warn!(component = component.type_name(), attribute = name, error = %err, "failed to create attribute");
            None
        }
    }
}

fn assign(component: &mut Component, id: u32, value: &str) -> bool {
    let type_name = component.type_name().to_string();
    let Some(attr) = component.attribute_by_id_mut(id) else {
        return false;
    };
    match attr.set_from_str(value) {
        Ok(()) => true,
        Err(err) => {
            warn!(component = %type_name, attribute = attr.name(), error = %err, "rejected attribute value");
            false
        }
    }
}

/// Create or reuse a component for each descriptor and populate it.
///
/// An unregistered type name is registered as a placeholder type built from
/// the descriptor's attributes. Descriptors that name neither a type nor a
/// known type id are skipped with a warning.
pub fn populate_components(scene: &mut Scene, entity: EntityId, components: &[ComponentDescriptor]) {
    for desc in components {
        if !desc.type_name.is_empty() && !scene.registry().is_registered(&desc.type_name) {
            register_placeholder(scene, desc);
        }

        let result = if desc.type_name.is_empty() {
            match desc.type_id {
                Some(type_id) => {
                    scene.get_or_create_component_by_id(entity, type_id, &desc.name, desc.replicated)
                }
                None => Err(SceneError::UnknownComponentType(String::new())),
            }
        } else {
            scene.get_or_create_component(entity, &desc.type_name, &desc.name, desc.replicated)
        };

        match result {
            Ok(component) => {
                component.set_temporary(desc.temporary);
                apply_attributes(component, &desc.attributes);
            }
            Err(err) => warn!(entity = %entity, error = %err, "skipping component element"),
        }
    }
}

fn register_placeholder(scene: &mut Scene, desc: &ComponentDescriptor) {
    let attributes = desc.attributes.iter().filter_map(|attr| {
        let name = attr.name.clone().or_else(|| attr.id.clone())?;
        let Some(ty) = attr.type_name.as_deref().and_then(AttributeType::from_type_name) else {
            warn!(
                component = %desc.type_name,
                attribute = %name,
                "placeholder attribute has no known type, skipping"
            );
            return None;
        };
        Some((attr.numeric_id(), name, ty))
    });
    scene
        .registry_mut()
        .register_placeholder(&desc.type_name, desc.type_id, attributes);
}

/// Pick the id for a new entity: the requested one if non-zero and free,
/// otherwise the next free id from the range selected by `replicated`.
///
/// # Errors
///
/// Returns [`SceneError::IdsExhausted`] if the range is full.
pub fn choose_entity_id(scene: &mut Scene, requested: Option<u32>, replicated: bool) -> Result<EntityId, SceneError> {
    match requested.map(EntityId) {
        Some(id) if id.is_valid() && !scene.has_entity(id) => Ok(id),
        _ => scene.next_free_id_for(replicated),
    }
}

/// Create an entity (and its nested children) from a descriptor.
///
/// # Errors
///
/// Fails only if no id can be allocated or `parent` vanished.
pub fn build_entity(
    scene: &mut Scene,
    parent: Option<EntityId>,
    desc: &EntityDescriptor,
) -> Result<EntityId, SceneError> {
    let id = choose_entity_id(scene, desc.id, desc.replicated)?;
    let entity = match parent {
        Some(parent) => scene.create_child(parent, id)?,
        None => scene.create_entity(id)?,
    };
    entity.set_temporary(desc.temporary);
    fill_entity(scene, id, desc)?;
    Ok(id)
}

/// Destructively replace an entity's content: drop every component and child
/// entity, then rebuild both from the descriptor.
///
/// # Errors
///
/// Returns [`SceneError::EntityNotFound`] if the entity does not exist.
pub fn replace_entity(scene: &mut Scene, id: EntityId, desc: &EntityDescriptor) -> Result<(), SceneError> {
    scene
        .entity_mut(id)
        .ok_or(SceneError::EntityNotFound(id))?
        .remove_all_components();
    scene.remove_all_children(id)?;
    fill_entity(scene, id, desc)
}

fn fill_entity(scene: &mut Scene, id: EntityId, desc: &EntityDescriptor) -> Result<(), SceneError> {
    populate_components(scene, id, &desc.components);
    for child in &desc.children {
        build_entity(scene, Some(id), child)?;
    }
    Ok(())
}
