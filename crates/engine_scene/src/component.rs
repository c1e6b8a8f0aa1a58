//! Components: typed, ordered bundles of attributes.
//!
//! A component is either [`ComponentKind::Fixed`], with the attribute set its
//! type declares, or [`ComponentKind::Dynamic`], which can gain and lose
//! attributes at runtime. Callers check [`Component::supports_dynamic_attributes`]
//! instead of inspecting the concrete type.

use crate::attribute::{Attribute, AttributeId, AttributeType};
use crate::error::SceneError;

/// Whether a component's attribute set can change at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Attribute set defined by the component type.
    Fixed,
    /// Attributes may be created and removed by name and type.
    Dynamic,
}

/// A typed bundle of attributes attached to an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    type_name: String,
    type_id: u32,
    name: String,
    replicated: bool,
    temporary: bool,
    kind: ComponentKind,
    attributes: Vec<Attribute>,
    /// `None` once the id space is used up.
    next_attribute_id: Option<AttributeId>,
}

impl Component {
    /// Create a component from an already built attribute list.
    #[must_use]
    pub fn new(
        type_name: impl Into<String>,
        type_id: u32,
        name: impl Into<String>,
        kind: ComponentKind,
        attributes: Vec<Attribute>,
    ) -> Self {
        let next_attribute_id = attributes.iter().try_fold(0, |next: AttributeId, a| {
            a.id().checked_add(1).map(|succ| next.max(succ))
        });
        Self {
            type_name: type_name.into(),
            type_id,
            name: name.into(),
            replicated: true,
            temporary: false,
            kind,
            attributes,
            next_attribute_id,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn type_id(&self) -> u32 {
        self.type_id
    }

    /// The instance name; empty for unnamed components.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    #[must_use]
    pub fn supports_dynamic_attributes(&self) -> bool {
        self.kind == ComponentKind::Dynamic
    }

    #[must_use]
    pub fn is_replicated(&self) -> bool {
        self.replicated
    }

    pub fn set_replicated(&mut self, replicated: bool) {
        self.replicated = replicated;
    }

    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn set_temporary(&mut self, temporary: bool) {
        self.temporary = temporary;
    }

    /// Attributes in declaration (or creation) order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    #[must_use]
    pub fn attribute_by_id(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.id() == id)
    }

    pub fn attribute_by_id_mut(&mut self, id: AttributeId) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.id() == id)
    }

    #[must_use]
    pub fn attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    /// The id an address key resolves to, trying id match before name match.
    #[must_use]
    pub fn resolve_attribute_id(&self, key: &str) -> Option<AttributeId> {
        key.trim()
            .parse::<AttributeId>()
            .ok()
            .and_then(|id| self.attribute_by_id(id))
            .or_else(|| self.attribute_by_name(key))
            .map(Attribute::id)
    }

    /// Create a new attribute on a dynamic component.
    ///
    /// `requested_id` is honoured when it is free; otherwise the next unused
    /// id is allocated. Ids of removed attributes are never handed out again.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::FixedAttributes`] on a fixed component,
    /// [`SceneError::DuplicateAttribute`] if `name` is already taken and
    /// [`SceneError::AttributeIdsExhausted`] once no id is left.
    pub fn create_attribute(
        &mut self,
        ty: AttributeType,
        name: &str,
        requested_id: Option<AttributeId>,
    ) -> Result<&mut Attribute, SceneError> {
        if !self.supports_dynamic_attributes() {
            return Err(SceneError::FixedAttributes(self.type_name.clone()));
        }
        if self.attribute_by_name(name).is_some() {
            return Err(SceneError::DuplicateAttribute {
                component: self.type_name.clone(),
                name: name.to_string(),
            });
        }

        let next = self
            .next_attribute_id
            .ok_or_else(|| SceneError::AttributeIdsExhausted(self.type_name.clone()))?;
        let id = match requested_id {
            // The last id is only handed out by the cursor itself.
            Some(id) if id >= next && id < AttributeId::MAX && self.attribute_by_id(id).is_none() => id,
            _ => next,
        };
        self.next_attribute_id = id.checked_add(1);

        self.attributes.push(Attribute::new(id, name, ty.default_value()));
        let index = self.attributes.len() - 1;
        Ok(&mut self.attributes[index])
    }

    /// Remove an attribute from a dynamic component.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::FixedAttributes`] on a fixed component and
    /// [`SceneError::AttributeNotFound`] if no attribute has this id.
    pub fn remove_attribute(&mut self, id: AttributeId) -> Result<Attribute, SceneError> {
        if !self.supports_dynamic_attributes() {
            return Err(SceneError::FixedAttributes(self.type_name.clone()));
        }
        let index = self
            .attributes
            .iter()
            .position(|a| a.id() == id)
            .ok_or_else(|| SceneError::AttributeNotFound {
                component: self.type_name.clone(),
                id,
            })?;
        Ok(self.attributes.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeValue;

    fn fixed() -> Component {
        Component::new(
            "RigidBody",
            23,
            "",
            ComponentKind::Fixed,
            vec![
                Attribute::new(0, "mass", AttributeValue::Real(1.0)),
                Attribute::new(1, "friction", AttributeValue::Real(0.5)),
            ],
        )
    }

    fn dynamic() -> Component {
        Component::new("DynamicComponent", 25, "", ComponentKind::Dynamic, Vec::new())
    }

    #[test]
    fn test_resolve_prefers_id_then_name() {
        let comp = fixed();
        assert_eq!(comp.resolve_attribute_id("1"), Some(1));
        assert_eq!(comp.resolve_attribute_id("mass"), Some(0));
        assert!(comp.resolve_attribute_id("7").is_none());
        assert!(comp.resolve_attribute_id("speed").is_none());
    }

    #[test]
    fn test_numeric_name_falls_back_to_name_match() {
        let mut comp = dynamic();
        comp.create_attribute(AttributeType::Int, "42", None).unwrap();
        // No attribute has id 42, so the key resolves by name.
        assert_eq!(comp.resolve_attribute_id("42"), Some(0));
    }

    #[test]
    fn test_fixed_component_rejects_attribute_changes() {
        let mut comp = fixed();
        assert!(matches!(
            comp.create_attribute(AttributeType::Bool, "extra", None),
            Err(SceneError::FixedAttributes(_))
        ));
        assert!(matches!(comp.remove_attribute(0), Err(SceneError::FixedAttributes(_))));
        assert_eq!(comp.attributes().len(), 2);
    }

    #[test]
    fn test_dynamic_attribute_ids_are_not_reused() {
        let mut comp = dynamic();
        let a = comp.create_attribute(AttributeType::Real, "speed", None).unwrap().id();
        let b = comp.create_attribute(AttributeType::String, "label", None).unwrap().id();
        assert_eq!((a, b), (0, 1));

        comp.remove_attribute(b).unwrap();
        let c = comp.create_attribute(AttributeType::Bool, "flag", None).unwrap().id();
        assert_eq!(c, 2);
    }

    #[test]
    fn test_dynamic_attribute_honours_free_requested_id() {
        let mut comp = dynamic();
        let id = comp.create_attribute(AttributeType::Int, "score", Some(10)).unwrap().id();
        assert_eq!(id, 10);
        let next = comp.create_attribute(AttributeType::Int, "lives", Some(10)).unwrap().id();
        assert_eq!(next, 11);
    }

    #[test]
    fn test_dynamic_attribute_names_are_unique() {
        let mut comp = dynamic();
        comp.create_attribute(AttributeType::Int, "score", None).unwrap();
        assert!(matches!(
            comp.create_attribute(AttributeType::Real, "score", None),
            Err(SceneError::DuplicateAttribute { .. })
        ));
    }

    #[test]
    fn test_new_attributes_hold_type_default() {
        let mut comp = dynamic();
        let attr = comp.create_attribute(AttributeType::Color, "tint", None).unwrap();
        assert_eq!(attr.value(), &AttributeType::Color.default_value());
    }

    #[test]
    fn test_attribute_ids_exhaust_without_wrapping() {
        let mut comp = dynamic();
        let near_end = comp
            .create_attribute(AttributeType::Int, "a", Some(AttributeId::MAX - 1))
            .unwrap()
            .id();
        assert_eq!(near_end, AttributeId::MAX - 1);
        let last = comp.create_attribute(AttributeType::Int, "b", None).unwrap().id();
        assert_eq!(last, AttributeId::MAX);
        assert!(matches!(
            comp.create_attribute(AttributeType::Int, "c", None),
            Err(SceneError::AttributeIdsExhausted(_))
        ));
        assert_eq!(comp.attributes().len(), 2);
    }

    #[test]
    fn test_requested_last_id_is_not_taken_directly() {
        let mut comp = dynamic();
        let id = comp.create_attribute(AttributeType::Int, "a", Some(AttributeId::MAX)).unwrap().id();
        assert_eq!(id, 0);
    }

    #[test]
    fn test_component_with_last_id_is_exhausted() {
        let mut comp = Component::new(
            "Sound",
            900,
            "",
            ComponentKind::Dynamic,
            vec![Attribute::new(AttributeId::MAX, "v", AttributeValue::Real(1.0))],
        );
        assert!(matches!(
            comp.create_attribute(AttributeType::Int, "w", None),
            Err(SceneError::AttributeIdsExhausted(_))
        ));
    }
}
