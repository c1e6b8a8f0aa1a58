//! Typed attribute values and their text form.
//!
//! Every [`AttributeValue`] renders to a string with [`std::fmt::Display`] and
//! parses back with [`AttributeValue::parse`]. The pair is lossless: floats use
//! Rust's shortest round-trip formatting, vectors are whitespace separated and
//! a `Transform` is nine comma separated numbers.

use std::fmt;

use engine_math::{Quat, Transform, Vec2, Vec3, Vec4};
use thiserror::Error;

/// Stable identifier of an attribute within its component.
pub type AttributeId = u32;

/// Errors raised when converting text into attribute values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttributeError {
    /// The text is not a valid rendering of the requested type.
    #[error("cannot parse {text:?} as {ty}: {reason}")]
    Parse {
        ty: AttributeType,
        text: String,
        reason: String,
    },

    /// A value of one type was assigned to an attribute of another.
    #[error("type mismatch: attribute is {expected}, value is {actual}")]
    TypeMismatch {
        expected: AttributeType,
        actual: AttributeType,
    },
}

/// The type tag carried by every attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Bool,
    Int,
    UInt,
    Real,
    String,
    Float2,
    Float3,
    Float4,
    Color,
    Quat,
    Transform,
    EntityReference,
    AssetReference,
}

impl AttributeType {
    /// Every supported type, in declaration order.
    pub const ALL: [AttributeType; 13] = [
        AttributeType::Bool,
        AttributeType::Int,
        AttributeType::UInt,
        AttributeType::Real,
        AttributeType::String,
        AttributeType::Float2,
        AttributeType::Float3,
        AttributeType::Float4,
        AttributeType::Color,
        AttributeType::Quat,
        AttributeType::Transform,
        AttributeType::EntityReference,
        AttributeType::AssetReference,
    ];

    /// The name used for this type in scene documents.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            AttributeType::Bool => "bool",
            AttributeType::Int => "int",
            AttributeType::UInt => "uint",
            AttributeType::Real => "real",
            AttributeType::String => "string",
            AttributeType::Float2 => "float2",
            AttributeType::Float3 => "float3",
            AttributeType::Float4 => "float4",
            AttributeType::Color => "Color",
            AttributeType::Quat => "Quat",
            AttributeType::Transform => "Transform",
            AttributeType::EntityReference => "EntityReference",
            AttributeType::AssetReference => "AssetReference",
        }
    }

    /// Look a type up by its document name. Case-insensitive.
    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.type_name().eq_ignore_ascii_case(name))
    }

    /// The value a freshly created attribute of this type holds.
    #[must_use]
    pub fn default_value(self) -> AttributeValue {
        match self {
            AttributeType::Bool => AttributeValue::Bool(false),
            AttributeType::Int => AttributeValue::Int(0),
            AttributeType::UInt => AttributeValue::UInt(0),
            AttributeType::Real => AttributeValue::Real(0.0),
            AttributeType::String => AttributeValue::String(String::new()),
            AttributeType::Float2 => AttributeValue::Float2(Vec2::ZERO),
            AttributeType::Float3 => AttributeValue::Float3(Vec3::ZERO),
            AttributeType::Float4 => AttributeValue::Float4(Vec4::ZERO),
            AttributeType::Color => AttributeValue::Color(Vec4::new(0.0, 0.0, 0.0, 1.0)),
            AttributeType::Quat => AttributeValue::Quat(Quat::IDENTITY),
            AttributeType::Transform => AttributeValue::Transform(Transform::IDENTITY),
            AttributeType::EntityReference => AttributeValue::EntityReference(String::new()),
            AttributeType::AssetReference => AttributeValue::AssetReference(String::new()),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Bool(bool),
    Int(i32),
    UInt(u32),
    Real(f32),
    String(String),
    Float2(Vec2),
    Float3(Vec3),
    Float4(Vec4),
    Color(Vec4),
    Quat(Quat),
    Transform(Transform),
    EntityReference(String),
    AssetReference(String),
}

impl AttributeValue {
    /// The type tag of this value.
    #[must_use]
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            AttributeValue::Bool(_) => AttributeType::Bool,
            AttributeValue::Int(_) => AttributeType::Int,
            AttributeValue::UInt(_) => AttributeType::UInt,
            AttributeValue::Real(_) => AttributeType::Real,
            AttributeValue::String(_) => AttributeType::String,
            AttributeValue::Float2(_) => AttributeType::Float2,
            AttributeValue::Float3(_) => AttributeType::Float3,
            AttributeValue::Float4(_) => AttributeType::Float4,
            AttributeValue::Color(_) => AttributeType::Color,
            AttributeValue::Quat(_) => AttributeType::Quat,
            AttributeValue::Transform(_) => AttributeType::Transform,
            AttributeValue::EntityReference(_) => AttributeType::EntityReference,
            AttributeValue::AssetReference(_) => AttributeType::AssetReference,
        }
    }

    /// Parse the text form of a value of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Parse`] if `text` is not a valid rendering.
    pub fn parse(ty: AttributeType, text: &str) -> Result<Self, AttributeError> {
        let fail = |reason: String| AttributeError::Parse {
            ty,
            text: text.to_string(),
            reason,
        };

        let value = match ty {
            AttributeType::Bool => {
                AttributeValue::Bool(parse_bool(text).ok_or_else(|| fail("expected a boolean".into()))?)
            }
            AttributeType::Int => {
                AttributeValue::Int(text.trim().parse().map_err(|e| fail(format!("{e}")))?)
            }
            AttributeType::UInt => {
                AttributeValue::UInt(text.trim().parse().map_err(|e| fail(format!("{e}")))?)
            }
            AttributeType::Real => {
                AttributeValue::Real(text.trim().parse().map_err(|e| fail(format!("{e}")))?)
            }
            AttributeType::String => AttributeValue::String(text.to_string()),
            AttributeType::Float2 => {
                let [x, y] = parse_floats::<2>(text).map_err(fail)?;
                AttributeValue::Float2(Vec2::new(x, y))
            }
            AttributeType::Float3 => AttributeValue::Float3(Vec3::from_array(
                parse_floats::<3>(text).map_err(fail)?,
            )),
            AttributeType::Float4 => AttributeValue::Float4(Vec4::from_array(
                parse_floats::<4>(text).map_err(fail)?,
            )),
            AttributeType::Color => AttributeValue::Color(Vec4::from_array(
                parse_floats::<4>(text).map_err(fail)?,
            )),
            AttributeType::Quat => {
                let [x, y, z, w] = parse_floats::<4>(text).map_err(fail)?;
                AttributeValue::Quat(Quat::from_xyzw(x, y, z, w))
            }
            AttributeType::Transform => AttributeValue::Transform(Transform::from_array(
                parse_floats::<9>(text).map_err(fail)?,
            )),
            AttributeType::EntityReference => AttributeValue::EntityReference(text.trim().to_string()),
            AttributeType::AssetReference => AttributeValue::AssetReference(text.trim().to_string()),
        };
        Ok(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{v}"),
            AttributeValue::Int(v) => write!(f, "{v}"),
            AttributeValue::UInt(v) => write!(f, "{v}"),
            AttributeValue::Real(v) => write!(f, "{v}"),
            AttributeValue::String(v)
            | AttributeValue::EntityReference(v)
            | AttributeValue::AssetReference(v) => f.write_str(v),
            AttributeValue::Float2(v) => write_joined(f, &v.to_array(), " "),
            AttributeValue::Float3(v) => write_joined(f, &v.to_array(), " "),
            AttributeValue::Float4(v) | AttributeValue::Color(v) => {
                write_joined(f, &v.to_array(), " ")
            }
            AttributeValue::Quat(q) => write_joined(f, &q.to_array(), " "),
            AttributeValue::Transform(t) => write_joined(f, &t.to_array(), ","),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, values: &[f32], separator: &str) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{v}")?;
    }
    Ok(())
}

/// Split on commas and whitespace and parse exactly `N` floats.
fn parse_floats<const N: usize>(text: &str) -> Result<[f32; N], String> {
    let parts: Vec<&str> = text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if parts.len() != N {
        return Err(format!("expected {N} numbers, found {}", parts.len()));
    }

    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse().map_err(|e| format!("{part:?}: {e}"))?;
    }
    Ok(out)
}

/// Parse a permissive boolean: `true/false`, `1/0`, `yes/no`, `on/off`.
#[must_use]
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse an optional boolean document attribute, falling back to `default`
/// when it is absent or unparseable.
#[must_use]
pub fn parse_bool_or(text: Option<&str>, default: bool) -> bool {
    text.and_then(parse_bool).unwrap_or(default)
}

/// A named, typed value owned by a component.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    id: AttributeId,
    name: String,
    value: AttributeValue,
}

impl Attribute {
    /// Create an attribute holding `value`.
    #[must_use]
    pub fn new(id: AttributeId, name: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            id,
            name: name.into(),
            value,
        }
    }

    #[must_use]
    pub fn id(&self) -> AttributeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    #[must_use]
    pub fn attribute_type(&self) -> AttributeType {
        self.value.attribute_type()
    }

    /// Replace the value. The new value must have the attribute's type.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::TypeMismatch`] on a type change.
    pub fn set_value(&mut self, value: AttributeValue) -> Result<(), AttributeError> {
        let expected = self.attribute_type();
        if value.attribute_type() != expected {
            return Err(AttributeError::TypeMismatch {
                expected,
                actual: value.attribute_type(),
            });
        }
        self.value = value;
        Ok(())
    }

    /// Parse `text` as this attribute's type and store it. The attribute is
    /// left untouched on failure.
    ///
    /// # Errors
    ///
    /// Returns [`AttributeError::Parse`] if `text` does not parse.
    pub fn set_from_str(&mut self, text: &str) -> Result<(), AttributeError> {
        self.value = AttributeValue::parse(self.attribute_type(), text)?;
        Ok(())
    }
}
