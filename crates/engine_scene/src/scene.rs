//! Scene storage.
//!
//! A [`Scene`] keeps every entity of its tree in one arena ordered by id;
//! parent/child relations are id links, so root and child entities are
//! looked up the same way.

use std::collections::BTreeMap;

use tracing::debug;

use crate::attribute::AttributeValue;
use crate::component::Component;
use crate::entity::{Entity, EntityId, IdAllocator};
use crate::error::SceneError;
use crate::registry::{ComponentRegistry, NAME_COMPONENT};

/// Deepest position an entity may take in the tree; roots sit at depth 0.
pub const MAX_ENTITY_DEPTH: usize = 256;

/// A named container of entities plus the component types it can build.
#[derive(Debug)]
pub struct Scene {
    name: String,
    registry: ComponentRegistry,
    entities: BTreeMap<EntityId, Entity>,
    allocator: IdAllocator,
}

impl Scene {
    /// Create an empty scene with the built-in component types.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_registry(name, ComponentRegistry::with_builtin_types())
    }

    /// Create an empty scene with a caller-provided type registry.
    #[must_use]
    pub fn with_registry(name: impl Into<String>, registry: ComponentRegistry) -> Self {
        Self {
            name: name.into(),
            registry,
            entities: BTreeMap::new(),
            allocator: IdAllocator::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    // -- Lookup --

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    #[must_use]
    pub fn has_entity(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// The lowest-id entity whose name equals `name`.
    #[must_use]
    pub fn entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.values().find(|e| e.name() == Some(name))
    }

    /// Every entity, root or child, in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entities without a parent, in id order.
    pub fn root_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|e| e.parent().is_none())
    }

    /// Number of ancestors above `id`; 0 for roots and unknown ids.
    #[must_use]
    pub fn depth(&self, id: EntityId) -> usize {
        std::iter::successors(self.entity(id).and_then(Entity::parent), |parent| {
            self.entity(*parent).and_then(Entity::parent)
        })
        .count()
    }

    /// Returns the count of live entities, children included.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // -- Id allocation --

    /// Next unused id from the replicated range.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::IdsExhausted`] if the range is full.
    pub fn next_free_id(&mut self) -> Result<EntityId, SceneError> {
        self.allocator
            .next_replicated(|id| self.entities.contains_key(&id))
            .ok_or(SceneError::IdsExhausted("replicated"))
    }

    /// Next unused id from the local range.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::IdsExhausted`] if the range is full.
    pub fn next_free_id_local(&mut self) -> Result<EntityId, SceneError> {
        self.allocator
            .next_local(|id| self.entities.contains_key(&id))
            .ok_or(SceneError::IdsExhausted("local"))
    }

    /// Next unused id from the range selected by `replicated`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::IdsExhausted`] if that range is full.
    pub fn next_free_id_for(&mut self, replicated: bool) -> Result<EntityId, SceneError> {
        if replicated {
            self.next_free_id()
        } else {
            self.next_free_id_local()
        }
    }

    // -- Entity lifecycle --

    /// Create a root entity with an explicit id.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::IdUnavailable`] if `id` is 0 or already in use.
    pub fn create_entity(&mut self, id: EntityId) -> Result<&mut Entity, SceneError> {
        self.insert_entity(id, None)
    }

    /// Create an entity as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::EntityNotFound`] if `parent` does not exist,
    /// [`SceneError::NestingTooDeep`] if `parent` already sits at
    /// [`MAX_ENTITY_DEPTH`] and [`SceneError::IdUnavailable`] if `id` is 0 or
    /// already in use.
    pub fn create_child(&mut self, parent: EntityId, id: EntityId) -> Result<&mut Entity, SceneError> {
        if !self.has_entity(parent) {
            return Err(SceneError::EntityNotFound(parent));
        }
        if self.depth(parent) >= MAX_ENTITY_DEPTH {
            return Err(SceneError::NestingTooDeep {
                parent,
                limit: MAX_ENTITY_DEPTH,
            });
        }
        self.insert_entity(id, Some(parent))
    }

    fn insert_entity(&mut self, id: EntityId, parent: Option<EntityId>) -> Result<&mut Entity, SceneError> {
        if !id.is_valid() || self.has_entity(id) {
            return Err(SceneError::IdUnavailable(id));
        }
        if let Some(parent_id) = parent
            && let Some(parent) = self.entities.get_mut(&parent_id)
        {
            parent.children_mut().push(id);
        }
        debug!(entity = %id, parent = ?parent.map(|p| p.id()), scene = %self.name, "entity created");
        Ok(self.entities.entry(id).or_insert_with(|| Entity::new(id, parent)))
    }

    /// Remove an entity together with its whole subtree.
    ///
    /// Returns `true` if the entity existed.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.get(&id) else {
            return false;
        };
        if let Some(parent_id) = entity.parent()
            && let Some(parent) = self.entities.get_mut(&parent_id)
        {
            parent.children_mut().retain(|child| *child != id);
        }
        let removed = self.remove_subtree(id);
        debug!(entity = %id, removed, scene = %self.name, "entity removed");
        true
    }

    /// Remove every child entity (recursively) of `id`, keeping `id` itself.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::EntityNotFound`] if `id` does not exist.
    pub fn remove_all_children(&mut self, id: EntityId) -> Result<usize, SceneError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(SceneError::EntityNotFound(id))?;
        let children = std::mem::take(entity.children_mut());
        Ok(children.into_iter().map(|child| self.remove_subtree(child)).sum())
    }

    /// Drop `root` and all its descendants from the arena, returning how many
    /// entities were removed. Does not touch `root`'s parent.
    fn remove_subtree(&mut self, root: EntityId) -> usize {
        let mut stack = vec![root];
        let mut removed = 0;
        while let Some(id) = stack.pop() {
            if let Some(entity) = self.entities.remove(&id) {
                stack.extend_from_slice(entity.children());
                removed += 1;
            }
        }
        removed
    }

    // -- Components --

    /// Return the component with this type and instance name, creating it
    /// from the registry if the entity has none.
    ///
    /// `replicated` only applies to a newly created component.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::EntityNotFound`] or
    /// [`SceneError::UnknownComponentType`].
    pub fn get_or_create_component(
        &mut self,
        entity_id: EntityId,
        type_name: &str,
        name: &str,
        replicated: bool,
    ) -> Result<&mut Component, SceneError> {
        let entity = self
            .entities
            .get_mut(&entity_id)
            .ok_or(SceneError::EntityNotFound(entity_id))?;

        let index = match entity.component_index(type_name, name) {
            Some(index) => index,
            None => {
                let mut component = self.registry.create(type_name, name)?;
                component.set_replicated(replicated);
                debug!(entity = %entity_id, type_name, name, "component created");
                entity.components.push(component);
                entity.components.len() - 1
            }
        };
        Ok(&mut entity.components[index])
    }

    /// [`Scene::get_or_create_component`] addressed by numeric type id.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::EntityNotFound`] or
    /// [`SceneError::UnknownComponentType`].
    pub fn get_or_create_component_by_id(
        &mut self,
        entity_id: EntityId,
        type_id: u32,
        name: &str,
        replicated: bool,
    ) -> Result<&mut Component, SceneError> {
        let type_name = self
            .registry
            .get_by_id(type_id)
            .map(|schema| schema.type_name.clone())
            .ok_or_else(|| SceneError::UnknownComponentType(type_id.to_string()))?;
        self.get_or_create_component(entity_id, &type_name, name, replicated)
    }

    /// Give an entity a human-readable name through its `Name` component.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::EntityNotFound`] if the entity does not exist.
    pub fn set_entity_name(&mut self, entity_id: EntityId, name: &str) -> Result<(), SceneError> {
        let component = self.get_or_create_component(entity_id, NAME_COMPONENT, "", true)?;
        if let Some(attr) = component
            .resolve_attribute_id("name")
            .and_then(|id| component.attribute_by_id_mut(id))
        {
            attr.set_value(AttributeValue::String(name.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DYNAMIC_COMPONENT;

    fn scene_with(ids: &[u32]) -> Scene {
        let mut scene = Scene::new("test");
        for id in ids {
            scene.create_entity(EntityId(*id)).unwrap();
        }
        scene
    }

    #[test]
    fn test_create_and_lookup() {
        let scene = scene_with(&[3, 7]);
        assert!(scene.has_entity(EntityId(3)));
        assert_eq!(scene.entity(EntityId(7)).unwrap().id(), EntityId(7));
        assert_eq!(scene.entity_count(), 2);
    }

    #[test]
    fn test_create_rejects_zero_and_duplicates() {
        let mut scene = scene_with(&[3]);
        assert!(matches!(scene.create_entity(EntityId(0)), Err(SceneError::IdUnavailable(_))));
        assert!(matches!(scene.create_entity(EntityId(3)), Err(SceneError::IdUnavailable(_))));
    }

    #[test]
    fn test_next_free_id_skips_live_ids() {
        let mut scene = scene_with(&[1, 2]);
        assert_eq!(scene.next_free_id().unwrap(), EntityId(3));
        assert!(scene.next_free_id_local().unwrap().is_local());
    }

    #[test]
    fn test_remove_entity_removes_subtree() {
        let mut scene = scene_with(&[1]);
        scene.create_child(EntityId(1), EntityId(2)).unwrap();
        scene.create_child(EntityId(2), EntityId(3)).unwrap();
        scene.create_entity(EntityId(4)).unwrap();

        assert!(scene.remove_entity(EntityId(1)));
        assert_eq!(scene.entities().map(Entity::id).collect::<Vec<_>>(), vec![EntityId(4)]);
        assert!(!scene.remove_entity(EntityId(1)));
    }

    #[test]
    fn test_removing_child_detaches_from_parent() {
        let mut scene = scene_with(&[1]);
        scene.create_child(EntityId(1), EntityId(2)).unwrap();
        assert!(scene.remove_entity(EntityId(2)));
        assert!(scene.entity(EntityId(1)).unwrap().children().is_empty());
    }

    #[test]
    fn test_remove_all_children_keeps_parent() {
        let mut scene = scene_with(&[1]);
        scene.create_child(EntityId(1), EntityId(2)).unwrap();
        scene.create_child(EntityId(2), EntityId(3)).unwrap();
        assert_eq!(scene.remove_all_children(EntityId(1)).unwrap(), 2);
        assert_eq!(scene.entity_count(), 1);
        assert!(scene.entity(EntityId(1)).unwrap().children().is_empty());
    }

    #[test]
    fn test_root_entities_exclude_children() {
        let mut scene = scene_with(&[1, 5]);
        scene.create_child(EntityId(1), EntityId(2)).unwrap();
        let roots: Vec<_> = scene.root_entities().map(Entity::id).collect();
        assert_eq!(roots, vec![EntityId(1), EntityId(5)]);
    }

    #[test]
    fn test_get_or_create_component_reuses_matching_instance() {
        let mut scene = scene_with(&[1]);
        scene
            .get_or_create_component(EntityId(1), DYNAMIC_COMPONENT, "", true)
            .unwrap();
        scene
            .get_or_create_component(EntityId(1), DYNAMIC_COMPONENT, "", true)
            .unwrap();
        scene
            .get_or_create_component(EntityId(1), DYNAMIC_COMPONENT, "second", false)
            .unwrap();

        let entity = scene.entity(EntityId(1)).unwrap();
        assert_eq!(entity.components().len(), 2);
        assert!(!entity.components()[1].is_replicated());
        assert_eq!(entity.first_component_of_type(DYNAMIC_COMPONENT), Some(0));
    }

    #[test]
    fn test_get_or_create_component_by_type_id() {
        let mut scene = scene_with(&[1]);
        let comp = scene
            .get_or_create_component_by_id(EntityId(1), 20, "", true)
            .unwrap();
        assert_eq!(comp.type_name(), "Placeable");
        assert!(matches!(
            scene.get_or_create_component_by_id(EntityId(1), 4242, "", true),
            Err(SceneError::UnknownComponentType(_))
        ));
    }

    #[test]
    fn test_entity_by_name() {
        let mut scene = scene_with(&[1, 2]);
        scene.set_entity_name(EntityId(2), "camera").unwrap();
        assert_eq!(scene.entity_by_name("camera").unwrap().id(), EntityId(2));
        assert_eq!(scene.entity(EntityId(2)).unwrap().name(), Some("camera"));
        assert!(scene.entity_by_name("light").is_none());
    }

    #[test]
    fn test_child_depth_is_bounded() {
        let mut scene = scene_with(&[1]);
        for id in 2..=(MAX_ENTITY_DEPTH as u32 + 1) {
            scene.create_child(EntityId(id - 1), EntityId(id)).unwrap();
        }
        let deepest = EntityId(MAX_ENTITY_DEPTH as u32 + 1);
        assert_eq!(scene.depth(deepest), MAX_ENTITY_DEPTH);
        assert!(matches!(
            scene.create_child(deepest, EntityId(5000)),
            Err(SceneError::NestingTooDeep { .. })
        ));
        assert!(!scene.has_entity(EntityId(5000)));
        assert_eq!(scene.depth(EntityId(1)), 0);
    }
}
