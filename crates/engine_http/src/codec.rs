//! XML wire format for scenes, entities and components.
//!
//! Encoding writes indented documents with `quick-xml`. Decoding parses with
//! `roxmltree` into owned descriptors; applying descriptors to a scene lives
//! in [`crate::apply`].
//!
//! ```xml
//! <entity id="5" sync="true" temporary="false">
//!   <component type="Placeable" typeId="20" name="" sync="true" temporary="false">
//!     <attribute id="2" name="visible" type="bool" value="true"/>
//!   </component>
//!   <entity id="6" sync="true" temporary="false"/>
//! </entity>
//! ```

use std::fmt::Display;

use engine_scene::{Component, Entity, EntityId, Scene, parse_bool_or};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use roxmltree::{Document, Node};
use thiserror::Error;

pub const SCENE_ELEMENT: &str = "scene";
pub const ENTITY_ELEMENT: &str = "entity";
pub const COMPONENT_ELEMENT: &str = "component";
pub const ATTRIBUTE_ELEMENT: &str = "attribute";

/// Deepest element nesting accepted in a body.
pub const MAX_DOCUMENT_DEPTH: usize = 128;

/// Errors raised while encoding or decoding documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The body is not well-formed XML, not UTF-8 or nested too deeply.
    #[error("XML decode error {message} at line {line} column {column}")]
    Malformed {
        message: String,
        line: u32,
        column: u32,
    },

    #[error("expected <{expected}> document, found <{found}>")]
    UnexpectedRoot {
        expected: &'static str,
        found: String,
    },

    #[error("failed to write XML: {0}")]
    Write(String),
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Serialize a whole scene: a `scene` root holding every root entity.
///
/// # Errors
///
/// Returns [`CodecError::Write`] if the writer fails.
pub fn encode_scene(scene: &Scene) -> Result<String, CodecError> {
    let mut xml = XmlWriter::new()?;
    xml.start(BytesStart::new(SCENE_ELEMENT))?;
    for entity in scene.root_entities() {
        xml.entity(scene, entity)?;
    }
    xml.end(SCENE_ELEMENT)?;
    xml.finish()
}

/// Serialize one entity with its components and child entities.
///
/// Returns `Ok(None)` if the entity does not exist.
///
/// # Errors
///
/// Returns [`CodecError::Write`] if the writer fails.
pub fn encode_entity(scene: &Scene, id: EntityId) -> Result<Option<String>, CodecError> {
    let Some(entity) = scene.entity(id) else {
        return Ok(None);
    };
    let mut xml = XmlWriter::new()?;
    xml.entity(scene, entity)?;
    xml.finish().map(Some)
}

/// Serialize one component.
///
/// # Errors
///
/// Returns [`CodecError::Write`] if the writer fails.
pub fn encode_component(component: &Component) -> Result<String, CodecError> {
    let mut xml = XmlWriter::new()?;
    xml.component(component)?;
    xml.finish()
}

fn write_error(err: impl Display) -> CodecError {
    CodecError::Write(err.to_string())
}

struct XmlWriter {
    writer: Writer<Vec<u8>>,
}

impl XmlWriter {
    fn new() -> Result<Self, CodecError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_error)?;
        Ok(Self { writer })
    }

    fn start(&mut self, element: BytesStart<'_>) -> Result<(), CodecError> {
        self.writer.write_event(Event::Start(element)).map_err(write_error)
    }

    fn end(&mut self, name: &str) -> Result<(), CodecError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(write_error)
    }

    fn entity(&mut self, scene: &Scene, entity: &Entity) -> Result<(), CodecError> {
        let id = entity.id().to_string();
        let element = BytesStart::new(ENTITY_ELEMENT).with_attributes([
            ("id", id.as_str()),
            ("sync", bool_str(entity.is_replicated())),
            ("temporary", bool_str(entity.is_temporary())),
        ]);
        self.start(element)?;
        for component in entity.components() {
            self.component(component)?;
        }
        for child in entity.children() {
            if let Some(child) = scene.entity(*child) {
                self.entity(scene, child)?;
            }
        }
        self.end(ENTITY_ELEMENT)
    }

    fn component(&mut self, component: &Component) -> Result<(), CodecError> {
        let type_id = component.type_id().to_string();
        let element = BytesStart::new(COMPONENT_ELEMENT).with_attributes([
            ("type", component.type_name()),
            ("typeId", type_id.as_str()),
            ("name", component.name()),
            ("sync", bool_str(component.is_replicated())),
            ("temporary", bool_str(component.is_temporary())),
        ]);
        self.start(element)?;
        for attr in component.attributes() {
            let id = attr.id().to_string();
            let value = attr.value().to_string();
            let element = BytesStart::new(ATTRIBUTE_ELEMENT).with_attributes([
                ("id", id.as_str()),
                ("name", attr.name()),
                ("type", attr.attribute_type().type_name()),
                ("value", value.as_str()),
            ]);
            self.writer
                .write_event(Event::Empty(element))
                .map_err(write_error)?;
        }
        self.end(COMPONENT_ELEMENT)
    }

    fn finish(self) -> Result<String, CodecError> {
        String::from_utf8(self.writer.into_inner()).map_err(write_error)
    }
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// One `attribute` element of a body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// Raw `id` attribute; preferred for lookup when present.
    pub id: Option<String>,
    pub name: Option<String>,
    /// Type name, used when the attribute has to be created.
    pub type_name: Option<String>,
    pub value: String,
}

impl AttributeDescriptor {
    /// The key used for lookup: the id if present, else the name.
    #[must_use]
    pub fn key(&self) -> &str {
        self.id
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    /// The `id` attribute as a numeric attribute id, if it is one.
    #[must_use]
    pub fn numeric_id(&self) -> Option<u32> {
        self.id.as_deref().and_then(|id| id.trim().parse().ok())
    }
}

/// One `component` element of a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    /// Type name; empty when only a type id was given.
    pub type_name: String,
    pub type_id: Option<u32>,
    pub name: String,
    pub replicated: bool,
    pub temporary: bool,
    pub attributes: Vec<AttributeDescriptor>,
}

/// One `entity` element of a body, with nested child entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Requested id; absent, unparsable and `0` all mean "allocate".
    pub id: Option<u32>,
    pub replicated: bool,
    pub temporary: bool,
    pub components: Vec<ComponentDescriptor>,
    pub children: Vec<EntityDescriptor>,
}

impl Default for EntityDescriptor {
    fn default() -> Self {
        Self {
            id: None,
            replicated: true,
            temporary: false,
            components: Vec::new(),
            children: Vec::new(),
        }
    }
}

/// Parse a body and return its root element name plus an entity descriptor
/// if the root is `entity`.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] for invalid UTF-8 or XML.
pub fn decode_entity(body: &[u8]) -> Result<Option<EntityDescriptor>, CodecError> {
    let text = body_text(body)?;
    let doc = parse_document(text)?;
    let root = doc.root_element();
    Ok((root.tag_name().name() == ENTITY_ELEMENT).then(|| entity_descriptor(root)))
}

/// Parse a body into a component descriptor if its root is `component`.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] for invalid UTF-8 or XML.
pub fn decode_component(body: &[u8]) -> Result<Option<ComponentDescriptor>, CodecError> {
    let text = body_text(body)?;
    let doc = parse_document(text)?;
    let root = doc.root_element();
    Ok((root.tag_name().name() == COMPONENT_ELEMENT).then(|| component_descriptor(root)))
}

/// Parse a scene document. A lone `entity` document is accepted as a scene
/// with one root entity.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] for invalid input and
/// [`CodecError::UnexpectedRoot`] for any other root element.
pub fn decode_scene(body: &[u8]) -> Result<Vec<EntityDescriptor>, CodecError> {
    let text = body_text(body)?;
    let doc = parse_document(text)?;
    let root = doc.root_element();
    match root.tag_name().name() {
        SCENE_ELEMENT => Ok(child_elements(root, ENTITY_ELEMENT).map(entity_descriptor).collect()),
        ENTITY_ELEMENT => Ok(vec![entity_descriptor(root)]),
        other => Err(CodecError::UnexpectedRoot {
            expected: SCENE_ELEMENT,
            found: other.to_string(),
        }),
    }
}

fn body_text(body: &[u8]) -> Result<&str, CodecError> {
    std::str::from_utf8(body).map_err(|err| {
        let (line, column) = line_column(&body[..err.valid_up_to()]);
        CodecError::Malformed {
            message: err.to_string(),
            line,
            column,
        }
    })
}

/// Line and column just past `prefix`, both 1-based.
fn line_column(prefix: &[u8]) -> (u32, u32) {
    let line = prefix.iter().filter(|b| **b == b'\n').count() + 1;
    let column = prefix.iter().rev().take_while(|b| **b != b'\n').count() + 1;
    (
        u32::try_from(line).unwrap_or(u32::MAX),
        u32::try_from(column).unwrap_or(u32::MAX),
    )
}

fn parse_document(text: &str) -> Result<Document<'_>, CodecError> {
    check_depth(text)?;
    Document::parse(text).map_err(|err| {
        let pos = err.pos();
        CodecError::Malformed {
            message: err.to_string(),
            line: pos.row,
            column: pos.col,
        }
    })
}

/// Reject bodies nested deeper than [`MAX_DOCUMENT_DEPTH`] with a streaming
/// pass, before any tree is built. Syntax errors are left to the parser.
fn check_depth(text: &str) -> Result<(), CodecError> {
    let mut reader = Reader::from_str(text);
    let mut depth = 0usize;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) => {
                depth += 1;
                if depth > MAX_DOCUMENT_DEPTH {
                    let offset = usize::try_from(reader.buffer_position()).unwrap_or(text.len());
                    let (line, column) = line_column(&text.as_bytes()[..offset.min(text.len())]);
                    return Err(CodecError::Malformed {
                        message: format!("elements nested deeper than {MAX_DOCUMENT_DEPTH} levels"),
                        line,
                        column,
                    });
                }
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) | Err(_) => return Ok(()),
            Ok(_) => {}
        }
    }
}

fn child_elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    tag: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |child| child.is_element() && child.tag_name().name() == tag)
}

fn entity_descriptor(node: Node<'_, '_>) -> EntityDescriptor {
    EntityDescriptor {
        id: node.attribute("id").and_then(|id| id.trim().parse().ok()),
        replicated: parse_bool_or(node.attribute("sync"), true),
        temporary: parse_bool_or(node.attribute("temporary"), false),
        components: child_elements(node, COMPONENT_ELEMENT)
            .map(component_descriptor)
            .collect(),
        children: child_elements(node, ENTITY_ELEMENT)
            .map(entity_descriptor)
            .collect(),
    }
}

fn component_descriptor(node: Node<'_, '_>) -> ComponentDescriptor {
    ComponentDescriptor {
        type_name: node.attribute("type").unwrap_or_default().to_string(),
        type_id: node.attribute("typeId").and_then(|id| id.trim().parse().ok()),
        name: node.attribute("name").unwrap_or_default().to_string(),
        replicated: parse_bool_or(node.attribute("sync"), true),
        temporary: parse_bool_or(node.attribute("temporary"), false),
        attributes: child_elements(node, ATTRIBUTE_ELEMENT)
            .map(|attr| AttributeDescriptor {
                id: non_empty(attr.attribute("id")),
                name: non_empty(attr.attribute("name")),
                type_name: non_empty(attr.attribute("type")),
                value: attr.attribute("value").unwrap_or_default().to_string(),
            })
            .collect(),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_scene::{AttributeType, DYNAMIC_COMPONENT};

    fn sample_scene() -> Scene {
        let mut scene = Scene::new("test");
        scene.create_entity(EntityId(1)).unwrap();
        scene.create_child(EntityId(1), EntityId(2)).unwrap();
        scene.set_entity_name(EntityId(1), "root & <co>").unwrap();
        let comp = scene
            .get_or_create_component(EntityId(2), DYNAMIC_COMPONENT, "state", false)
            .unwrap();
        comp.create_attribute(AttributeType::Float3, "velocity", None)
            .unwrap()
            .set_from_str("1 2.5 -3")
            .unwrap();
        scene
    }

    #[test]
    fn test_encode_empty_scene() {
        let xml = encode_scene(&Scene::new("empty")).unwrap();
        assert!(xml.starts_with("<?xml"));
        let doc = Document::parse(&xml).unwrap();
        assert_eq!(doc.root_element().tag_name().name(), SCENE_ELEMENT);
        assert_eq!(doc.descendants().filter(|n| n.has_tag_name(ENTITY_ELEMENT)).count(), 0);
    }

    #[test]
    fn test_encode_entity_nests_children_and_escapes() {
        let scene = sample_scene();
        let xml = encode_entity(&scene, EntityId(1)).unwrap().unwrap();
        let doc = Document::parse(&xml).unwrap();
        let root = doc.root_element();
        assert_eq!(root.attribute("id"), Some("1"));
        assert_eq!(root.attribute("sync"), Some("true"));

        let name = root
            .descendants()
            .find(|n| n.has_tag_name(ATTRIBUTE_ELEMENT) && n.attribute("name") == Some("name"))
            .unwrap();
        assert_eq!(name.attribute("value"), Some("root & <co>"));

        let child = child_elements(root, ENTITY_ELEMENT).next().unwrap();
        assert_eq!(child.attribute("id"), Some("2"));
    }

    #[test]
    fn test_encode_missing_entity() {
        assert_eq!(encode_entity(&Scene::new("s"), EntityId(9)).unwrap(), None);
    }

    #[test]
    fn test_component_document_carries_identity() {
        let scene = sample_scene();
        let comp = &scene.entity(EntityId(2)).unwrap().components()[0];
        let xml = encode_component(comp).unwrap();
        let doc = Document::parse(&xml).unwrap();
        let root = doc.root_element();
        assert_eq!(root.attribute("type"), Some(DYNAMIC_COMPONENT));
        assert_eq!(root.attribute("typeId"), Some("25"));
        assert_eq!(root.attribute("name"), Some("state"));
        assert_eq!(root.attribute("sync"), Some("false"));
        assert_eq!(root.attribute("temporary"), Some("false"));
    }

    #[test]
    fn test_decode_of_encoded_entity_keeps_values() {
        let mut scene = sample_scene();
        let placeable = scene.get_or_create_component(EntityId(1), "Placeable", "", true).unwrap();
        placeable
            .attribute_by_id_mut(0)
            .unwrap()
            .set_from_str("1,2,3,0,90,0,2,2,2")
            .unwrap();
        let xml = encode_entity(&scene, EntityId(1)).unwrap().unwrap();
        let desc = decode_entity(xml.as_bytes()).unwrap().unwrap();

        assert_eq!(desc.id, Some(1));
        assert_eq!(desc.children.len(), 1);
        assert!(!desc.children[0].components[0].replicated);

        let mut compared = 0;
        for entity_desc in [&desc, &desc.children[0]] {
            let entity = scene.entity(EntityId(entity_desc.id.unwrap())).unwrap();
            assert_eq!(entity_desc.components.len(), entity.components().len());
            for (comp_desc, comp) in entity_desc.components.iter().zip(entity.components()) {
                assert_eq!(comp_desc.type_name, comp.type_name());
                assert_eq!(comp_desc.attributes.len(), comp.attributes().len());
                for (attr_desc, attr) in comp_desc.attributes.iter().zip(comp.attributes()) {
                    assert_eq!(attr_desc.numeric_id(), Some(attr.id()));
                    assert_eq!(attr_desc.name.as_deref(), Some(attr.name()));
                    let ty = AttributeType::from_type_name(attr_desc.type_name.as_deref().unwrap()).unwrap();
                    let reparsed = engine_scene::AttributeValue::parse(ty, &attr_desc.value).unwrap();
                    assert_eq!(&reparsed, attr.value(), "{}.{}", comp.type_name(), attr.name());
                    compared += 1;
                }
            }
        }
        // Name (3) + Placeable (6) on the root, one dynamic attribute on the child.
        assert_eq!(compared, 10);
    }

    #[test]
    fn test_decode_defaults() {
        let desc = decode_entity(b"<entity><component type=\"Mesh\"/></entity>")
            .unwrap()
            .unwrap();
        assert_eq!(desc.id, None);
        assert!(desc.replicated);
        assert!(!desc.temporary);
        assert_eq!(desc.components[0].type_id, None);
        assert!(desc.components[0].replicated);
    }

    #[test]
    fn test_decode_wrong_root_is_none() {
        assert_eq!(decode_entity(b"<component/>").unwrap(), None);
        assert_eq!(decode_component(b"<entity/>").unwrap(), None);
    }

    #[test]
    fn test_malformed_reports_position() {
        let err = decode_component(b"<component>\n  <attribute name=\"a\">\n</component>").unwrap_err();
        let CodecError::Malformed { line, .. } = &err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(*line, 3);
        assert!(err.to_string().starts_with("XML decode error "));
        assert!(err.to_string().contains("at line 3"));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let err = decode_entity(b"<entity>\n<a \xff/></entity>").unwrap_err();
        assert!(matches!(err, CodecError::Malformed { line: 2, column: 4, .. }));
    }

    #[test]
    fn test_decode_scene_document() {
        let xml = encode_scene(&sample_scene()).unwrap();
        let roots = decode_scene(xml.as_bytes()).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].children[0].id, Some(2));
        assert!(matches!(
            decode_scene(b"<component/>"),
            Err(CodecError::UnexpectedRoot { .. })
        ));
    }

    fn nested(depth: usize) -> String {
        format!("{}{}", "<entity>".repeat(depth), "</entity>".repeat(depth))
    }

    #[test]
    fn test_nesting_limit() {
        let desc = decode_entity(nested(MAX_DOCUMENT_DEPTH).as_bytes()).unwrap().unwrap();
        assert_eq!(desc.children.len(), 1);

        let err = decode_entity(nested(MAX_DOCUMENT_DEPTH + 1).as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { line: 1, .. }), "{err:?}");
        assert!(err.to_string().contains("nested deeper than"));
    }

    #[test]
    fn test_huge_nesting_fails_without_building_a_tree() {
        let err = decode_scene(nested(200_000).as_bytes()).unwrap_err();
        assert!(err.to_string().contains("nested deeper than"));
    }

    #[test]
    fn test_depth_check_leaves_syntax_errors_to_the_parser() {
        let err = decode_entity(b"<entity><component></entity>").unwrap_err();
        assert!(!err.to_string().contains("nested deeper than"));
    }
}
