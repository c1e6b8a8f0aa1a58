//! Component type registry.
//!
//! Maps component type names (and numeric type ids) to a [`ComponentSchema`]
//! describing how to build a fresh instance. Besides the built-in types, the
//! registry accepts *placeholder* types: schemas assembled at runtime from a
//! scene document that names a type this process does not know.

use std::collections::HashMap;

use engine_math::{Transform, Vec3};
use tracing::{debug, warn};

use crate::attribute::{Attribute, AttributeId, AttributeType, AttributeValue};
use crate::component::{Component, ComponentKind};
use crate::error::SceneError;

/// Type name of the component that carries an entity's human-readable name.
pub const NAME_COMPONENT: &str = "Name";

/// Type name of the schema-free component.
pub const DYNAMIC_COMPONENT: &str = "DynamicComponent";

/// Placeholder types without a usable id of their own are numbered from here.
const FIRST_PLACEHOLDER_TYPE_ID: u32 = 0x1_0000;

/// One attribute slot of a fixed component type.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub id: AttributeId,
    pub name: String,
    /// Initial value; also determines the attribute's type.
    pub default: AttributeValue,
}

/// How to build a component of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentSchema {
    pub type_name: String,
    pub type_id: u32,
    pub kind: ComponentKind,
    pub attributes: Vec<AttributeSpec>,
    /// Registered at runtime from a document rather than built in.
    pub placeholder: bool,
}

impl ComponentSchema {
    /// A fixed-schema type with no attributes yet.
    #[must_use]
    pub fn fixed(type_name: impl Into<String>, type_id: u32) -> Self {
        Self {
            type_name: type_name.into(),
            type_id,
            kind: ComponentKind::Fixed,
            attributes: Vec::new(),
            placeholder: false,
        }
    }

    /// A dynamic type; instances start empty.
    #[must_use]
    pub fn dynamic(type_name: impl Into<String>, type_id: u32) -> Self {
        Self {
            kind: ComponentKind::Dynamic,
            ..Self::fixed(type_name, type_id)
        }
    }

    /// Append an attribute slot. Ids follow declaration order.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, default: AttributeValue) -> Self {
        let id = self.attributes.len() as AttributeId;
        self.attributes.push(AttributeSpec {
            id,
            name: name.into(),
            default,
        });
        self
    }

    /// Build a fresh instance with default attribute values.
    #[must_use]
    pub fn instantiate(&self, name: &str) -> Component {
        let attributes = self
            .attributes
            .iter()
            .map(|spec| Attribute::new(spec.id, spec.name.clone(), spec.default.clone()))
            .collect();
        Component::new(self.type_name.clone(), self.type_id, name, self.kind, attributes)
    }
}

/// Registry of every component type the scene can instantiate.
#[derive(Debug, Default, Clone)]
pub struct ComponentRegistry {
    /// Schemas keyed by type name.
    types: HashMap<String, ComponentSchema>,
    /// Type id to type name.
    ids: HashMap<u32, String>,
}

impl ComponentRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in component types.
    #[must_use]
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();
        for schema in builtin_types() {
            registry.register(schema);
        }
        registry
    }

    /// Register (or replace) a component type.
    pub fn register(&mut self, schema: ComponentSchema) {
        if let Some(previous) = self.types.get(&schema.type_name) {
            self.ids.remove(&previous.type_id);
        }
        self.ids.insert(schema.type_id, schema.type_name.clone());
        self.types.insert(schema.type_name.clone(), schema);
    }

    /// Register a placeholder type described by a document.
    ///
    /// `attributes` lists `(requested id, name, type)` triples. Requested ids
    /// below `AttributeId::MAX` are used when free; the rest continue after
    /// the highest id seen, and are dropped once no id is left. The
    /// requested type id is used when it is not taken by another type.
    pub fn register_placeholder(
        &mut self,
        type_name: &str,
        type_id: Option<u32>,
        attributes: impl IntoIterator<Item = (Option<AttributeId>, String, AttributeType)>,
    ) -> &ComponentSchema {
        let type_id = match type_id {
            Some(id) if !self.ids.contains_key(&id) => id,
            _ => self.next_free_type_id(),
        };

        let mut schema = ComponentSchema {
            placeholder: true,
            ..ComponentSchema::fixed(type_name, type_id)
        };
        let mut pending = Vec::new();
        for (requested, name, ty) in attributes {
            if schema.attributes.iter().any(|spec| spec.name == name) {
                continue;
            }
            match requested {
                Some(id) if id < AttributeId::MAX && !schema.attributes.iter().any(|spec| spec.id == id) => {
                    schema.attributes.push(AttributeSpec {
                        id,
                        name,
                        default: ty.default_value(),
                    });
                }
                _ => pending.push((name, ty)),
            }
        }
        let mut next = schema
            .attributes
            .iter()
            .try_fold(0, |next: AttributeId, spec| spec.id.checked_add(1).map(|succ| next.max(succ)));
        for (name, ty) in pending {
            let Some(id) = next else {
                warn!(type_name, attribute = %name, "no attribute id left for placeholder attribute, skipping");
                continue;
            };
            schema.attributes.push(AttributeSpec {
                id,
                name,
                default: ty.default_value(),
            });
            next = id.checked_add(1);
        }

        debug!(
            type_name,
            type_id,
            attributes = schema.attributes.len(),
            "registered placeholder component type"
        );
        self.register(schema);
        &self.types[type_name]
    }

    fn next_free_type_id(&self) -> u32 {
        (FIRST_PLACEHOLDER_TYPE_ID..)
            .find(|id| !self.ids.contains_key(id))
            .unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&ComponentSchema> {
        self.types.get(type_name)
    }

    #[must_use]
    pub fn get_by_id(&self, type_id: u32) -> Option<&ComponentSchema> {
        self.ids.get(&type_id).and_then(|name| self.types.get(name))
    }

    #[must_use]
    pub fn is_registered(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Build a new instance of a registered type.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::UnknownComponentType`] if the type is not
    /// registered.
    pub fn create(&self, type_name: &str, name: &str) -> Result<Component, SceneError> {
        self.get(type_name)
            .map(|schema| schema.instantiate(name))
            .ok_or_else(|| SceneError::UnknownComponentType(type_name.to_string()))
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over all registered schemas.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentSchema> {
        self.types.values()
    }
}

fn builtin_types() -> Vec<ComponentSchema> {
    use AttributeValue as V;
    vec![
        ComponentSchema::fixed("Mesh", 17)
            .with_attribute("meshRef", V::AssetReference(String::new()))
            .with_attribute("skeletonRef", V::AssetReference(String::new()))
            .with_attribute("materialRefs", V::String(String::new()))
            .with_attribute("castShadows", V::Bool(false))
            .with_attribute("drawDistance", V::Real(0.0)),
        ComponentSchema::fixed("Placeable", 20)
            .with_attribute("transform", V::Transform(Transform::IDENTITY))
            .with_attribute("drawDebug", V::Bool(false))
            .with_attribute("visible", V::Bool(true))
            .with_attribute("selectionLayer", V::Int(1))
            .with_attribute("parentRef", V::EntityReference(String::new()))
            .with_attribute("parentBone", V::String(String::new())),
        ComponentSchema::fixed("RigidBody", 23)
            .with_attribute("mass", V::Real(0.0))
            .with_attribute("shapeType", V::Int(0))
            .with_attribute("size", V::Float3(Vec3::ONE))
            .with_attribute("friction", V::Real(0.5))
            .with_attribute("restitution", V::Real(0.0))
            .with_attribute("linearVelocity", V::Float3(Vec3::ZERO))
            .with_attribute("angularVelocity", V::Float3(Vec3::ZERO))
            .with_attribute("phantom", V::Bool(false)),
        ComponentSchema::dynamic(DYNAMIC_COMPONENT, 25),
        ComponentSchema::fixed(NAME_COMPONENT, 26)
            .with_attribute("name", V::String(String::new()))
            .with_attribute("description", V::String(String::new()))
            .with_attribute("group", V::String(String::new())),
    ]
}
