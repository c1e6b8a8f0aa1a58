//! Entity identifiers, the entity node type and id allocation.
//!
//! The `u32` id space is split in two: ids below [`EntityId::LOCAL_BASE`] are
//! *replicated* (shared with networked peers), ids at or above it are *local*
//! to this process. `0` is reserved as the invalid id.

use std::fmt;

use crate::component::Component;

/// A scene-unique entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    /// The null / invalid entity sentinel.
    pub const INVALID: EntityId = EntityId(0);

    /// First id of the local (non-replicated) range.
    pub const LOCAL_BASE: u32 = 0x8000_0000;

    /// Returns the raw identifier.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) entity id.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Returns `true` if the id lies in the local range.
    #[must_use]
    pub const fn is_local(self) -> bool {
        self.0 >= Self::LOCAL_BASE
    }

    /// Returns `true` if the id lies in the replicated range.
    #[must_use]
    pub const fn is_replicated(self) -> bool {
        self.is_valid() && !self.is_local()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out free ids from the replicated and local ranges.
///
/// Each range has its own cursor that wraps inside the range; an id is only
/// returned if the caller reports it as unused.
#[derive(Debug)]
pub struct IdAllocator {
    next_replicated: u32,
    next_local: u32,
}

impl IdAllocator {
    /// Creates a new allocator. Replicated ids start at 1 (0 is reserved for
    /// [`EntityId::INVALID`]), local ids at [`EntityId::LOCAL_BASE`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_replicated: 1,
            next_local: EntityId::LOCAL_BASE,
        }
    }

    /// Allocate the next replicated id for which `in_use` is false.
    ///
    /// Returns `None` only when the whole range is taken.
    pub fn next_replicated(&mut self, in_use: impl Fn(EntityId) -> bool) -> Option<EntityId> {
        let (id, cursor) = Self::scan(self.next_replicated, 1, EntityId::LOCAL_BASE - 1, in_use)?;
        self.next_replicated = cursor;
        Some(id)
    }

    /// Allocate the next local id for which `in_use` is false.
    ///
    /// Returns `None` only when the whole range is taken.
    pub fn next_local(&mut self, in_use: impl Fn(EntityId) -> bool) -> Option<EntityId> {
        let (id, cursor) = Self::scan(self.next_local, EntityId::LOCAL_BASE, u32::MAX, in_use)?;
        self.next_local = cursor;
        Some(id)
    }

    /// Walk `[low, high]` starting at `start`, wrapping once.
    fn scan(
        start: u32,
        low: u32,
        high: u32,
        in_use: impl Fn(EntityId) -> bool,
    ) -> Option<(EntityId, u32)> {
        let span = u64::from(high - low) + 1;
        let mut candidate = start.clamp(low, high);
        for _ in 0..span {
            let next = if candidate == high { low } else { candidate + 1 };
            if !in_use(EntityId(candidate)) {
                return Some((EntityId(candidate), next));
            }
            candidate = next;
        }
        None
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// A node of the scene tree.
///
/// Entities hold their components in insertion order. Parent/child links are
/// ids into the owning [`Scene`](crate::Scene), which keeps every entity of
/// the tree in one arena.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    temporary: bool,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    pub(crate) components: Vec<Component>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, parent: Option<EntityId>) -> Self {
        Self {
            id,
            temporary: false,
            parent,
            children: Vec::new(),
            components: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Whether the entity takes its id from the replicated range.
    #[must_use]
    pub fn is_replicated(&self) -> bool {
        self.id.is_replicated()
    }

    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn set_temporary(&mut self, temporary: bool) {
        self.temporary = temporary;
    }

    #[must_use]
    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Child entity ids in creation order.
    #[must_use]
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<EntityId> {
        &mut self.children
    }

    /// The human-readable name: the `name` attribute of the first `Name`
    /// component, if there is one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.components
            .iter()
            .find(|c| c.type_name() == crate::registry::NAME_COMPONENT)
            .and_then(|c| c.attribute_by_name("name"))
            .and_then(|attr| match attr.value() {
                crate::AttributeValue::String(s) => Some(s.as_str()),
                _ => None,
            })
    }

    /// All components in order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Mutable access to a component by index.
    pub fn component_mut(&mut self, index: usize) -> Option<&mut Component> {
        self.components.get_mut(index)
    }

    /// Components whose type name equals `type_name`, in order.
    pub fn components_of_type<'a>(
        &'a self,
        type_name: &'a str,
    ) -> impl Iterator<Item = (usize, &'a Component)> + 'a {
        self.components
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.type_name() == type_name)
    }

    /// Index of the first component of the given type.
    ///
    /// When several components share the type, the earliest one in the
    /// entity's component order is returned.
    #[must_use]
    pub fn first_component_of_type(&self, type_name: &str) -> Option<usize> {
        self.components_of_type(type_name).next().map(|(index, _)| index)
    }

    /// Index of the component with exactly this type and instance name.
    #[must_use]
    pub fn component_index(&self, type_name: &str, name: &str) -> Option<usize> {
        self.components
            .iter()
            .position(|c| c.type_name() == type_name && c.name() == name)
    }

    /// Remove and return the component at `index`.
    pub fn remove_component(&mut self, index: usize) -> Option<Component> {
        (index < self.components.len()).then(|| self.components.remove(index))
    }

    /// Drop every component.
    pub fn remove_all_components(&mut self) {
        self.components.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_ranges() {
        assert!(!EntityId::INVALID.is_valid());
        assert!(EntityId(42).is_replicated());
        assert!(!EntityId(42).is_local());
        assert!(EntityId(EntityId::LOCAL_BASE).is_local());
        assert!(!EntityId(EntityId::LOCAL_BASE).is_replicated());
    }

    #[test]
    fn test_allocator_produces_unique_ids() {
        let mut alloc = IdAllocator::new();
        let e1 = alloc.next_replicated(|_| false).unwrap();
        let e2 = alloc.next_replicated(|_| false).unwrap();
        let e3 = alloc.next_replicated(|_| false).unwrap();
        assert_eq!((e1.id(), e2.id(), e3.id()), (1, 2, 3));
    }

    #[test]
    fn test_allocator_skips_ids_in_use() {
        let mut alloc = IdAllocator::new();
        let taken = [EntityId(1), EntityId(2), EntityId(4)];
        let first = alloc.next_replicated(|id| taken.contains(&id)).unwrap();
        assert_eq!(first, EntityId(3));
        let second = alloc.next_replicated(|id| taken.contains(&id)).unwrap();
        assert_eq!(second, EntityId(5));
    }

    #[test]
    fn test_local_ids_come_from_local_range() {
        let mut alloc = IdAllocator::new();
        let id = alloc.next_local(|_| false).unwrap();
        assert_eq!(id, EntityId(EntityId::LOCAL_BASE));
        assert!(id.is_local());
    }

    #[test]
    fn test_local_cursor_wraps_within_range() {
        let mut alloc = IdAllocator {
            next_replicated: 1,
            next_local: u32::MAX,
        };
        assert_eq!(alloc.next_local(|_| false), Some(EntityId(u32::MAX)));
        assert_eq!(alloc.next_local(|_| false), Some(EntityId(EntityId::LOCAL_BASE)));
    }

    #[test]
    fn test_display_is_raw_number() {
        assert_eq!(EntityId(17).to_string(), "17");
    }
}
