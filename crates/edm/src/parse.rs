use std::collections::BTreeMap;

use indexmap::IndexMap;
use roxmltree::{Document, Node};

use crate::annotations::{Annotation, AnnotationTargets, PropertyValue};
use crate::error::ParseError;
use crate::types::{
    ContainerEntry, EdmDocument, EnumMember, EnumType, Function, Member, MemberKind, Parameter,
    StructuredKind, StructuredType,
};

impl EdmDocument {
    /// Parses a CSDL XML document.
    ///
    /// Elements are matched by local name anywhere in the document, so both the `edmx` envelope
    /// and bare `Schema` documents are accepted. Elements this crate has no use for are ignored.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let document = Document::parse(text)?;
        let mut edm = EdmDocument::default();

        for node in document.descendants().filter(Node::is_element) {
            match node.tag_name().name() {
                "EnumType" => edm
                    .enum_types
                    .push(parse_enum_type(node, &mut edm.annotations)?),
                "EntityType" => edm.structured_types.push(parse_structured_type(
                    node,
                    StructuredKind::Entity,
                    &mut edm.annotations,
                )?),
                "ComplexType" => edm.structured_types.push(parse_structured_type(
                    node,
                    StructuredKind::Complex,
                    &mut edm.annotations,
                )?),
                "Function" => edm.functions.push(parse_function(node)?),
                "EntityContainer" => edm.container.extend(parse_container(node)?),
                "Annotations" => parse_annotations_block(node, &mut edm.annotations),
                _ => {}
            }
        }

        tracing::debug!(
            enum_types = edm.enum_types.len(),
            structured_types = edm.structured_types.len(),
            functions = edm.functions.len(),
            container_entries = edm.container.len(),
            "parsed metadata document"
        );
        Ok(edm)
    }
}

fn required<'a>(
    node: Node<'a, '_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<&'a str, ParseError> {
    node.attribute(attribute)
        .ok_or(ParseError::MissingAttribute { element, attribute })
}

fn flag(node: Node<'_, '_>, attribute: &str, default: bool) -> bool {
    node.attribute(attribute)
        .map_or(default, |value| value.eq_ignore_ascii_case("true"))
}

fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && child.has_tag_name(name))
}

fn parse_enum_type(
    node: Node<'_, '_>,
    annotations: &mut AnnotationTargets,
) -> Result<EnumType, ParseError> {
    let name = required(node, "EnumType", "Name")?;
    let members = children(node, "Member")
        .map(|member| {
            Ok(EnumMember {
                name: required(member, "Member", "Name")?.to_string(),
                value: member.attribute("Value").map(str::to_string),
            })
        })
        .collect::<Result<_, ParseError>>()?;
    collect_inline_annotations(node, name, "", annotations);

    Ok(EnumType {
        name: name.to_string(),
        is_flags: flag(node, "IsFlags", false),
        members,
    })
}

fn parse_structured_type(
    node: Node<'_, '_>,
    kind: StructuredKind,
    annotations: &mut AnnotationTargets,
) -> Result<StructuredType, ParseError> {
    let element = match kind {
        StructuredKind::Entity => "EntityType",
        StructuredKind::Complex => "ComplexType",
    };
    let name = required(node, element, "Name")?;
    collect_inline_annotations(node, name, "", annotations);

    let mut members = Vec::new();
    for child in node.children().filter(Node::is_element) {
        let (kind, element) = match child.tag_name().name() {
            "Property" => (MemberKind::Property, "Property"),
            "NavigationProperty" => (MemberKind::Navigation, "NavigationProperty"),
            _ => continue,
        };
        let member_name = required(child, element, "Name")?;
        collect_inline_annotations(child, name, member_name, annotations);
        members.push(Member {
            name: member_name.to_string(),
            type_name: required(child, element, "Type")?.to_string(),
            kind,
            nullable: flag(child, "Nullable", true),
        });
    }

    Ok(StructuredType {
        name: name.to_string(),
        kind,
        base_type: node.attribute("BaseType").map(str::to_string),
        is_abstract: flag(node, "Abstract", false),
        members,
    })
}

fn parse_function(node: Node<'_, '_>) -> Result<Function, ParseError> {
    let parameters = children(node, "Parameter")
        .map(|parameter| {
            Ok(Parameter {
                name: required(parameter, "Parameter", "Name")?.to_string(),
                type_name: required(parameter, "Parameter", "Type")?.to_string(),
                nullable: flag(parameter, "Nullable", true),
            })
        })
        .collect::<Result<_, ParseError>>()?;

    Ok(Function {
        name: required(node, "Function", "Name")?.to_string(),
        is_bound: flag(node, "IsBound", false),
        parameters,
        return_type: children(node, "ReturnType")
            .next()
            .map(|return_type| required(return_type, "ReturnType", "Type"))
            .transpose()?
            .map(str::to_string),
    })
}

fn parse_container(node: Node<'_, '_>) -> Result<Vec<ContainerEntry>, ParseError> {
    let mut entries = Vec::new();
    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "EntitySet" => entries.push(ContainerEntry::EntitySet {
                name: required(child, "EntitySet", "Name")?.to_string(),
                entity_type: required(child, "EntitySet", "EntityType")?.to_string(),
            }),
            "Singleton" => entries.push(ContainerEntry::Singleton {
                name: required(child, "Singleton", "Name")?.to_string(),
                type_name: required(child, "Singleton", "Type")?.to_string(),
            }),
            _ => {}
        }
    }
    Ok(entries)
}

fn parse_annotations_block(node: Node<'_, '_>, annotations: &mut AnnotationTargets) {
    let Some(target) = node.attribute("Target") else {
        return;
    };
    for annotation in children(node, "Annotation") {
        if let Some(annotation) = parse_annotation(annotation) {
            annotations.insert_for_target(target, annotation);
        }
    }
}

fn collect_inline_annotations(
    node: Node<'_, '_>,
    type_name: &str,
    property: &str,
    annotations: &mut AnnotationTargets,
) {
    for annotation in children(node, "Annotation") {
        if let Some(annotation) = parse_annotation(annotation) {
            annotations.insert(type_name, property, annotation);
        }
    }
}

/// Annotations without a `Term` carry nothing we can interpret and are dropped.
fn parse_annotation(node: Node<'_, '_>) -> Option<Annotation> {
    let term = node.attribute("Term")?;
    let value = node.children().find(Node::is_element);

    let (text, record) = match value {
        Some(value) if value.has_tag_name("Record") => (None, parse_record(value)),
        Some(value) => (value.text().map(|text| text.trim().to_string()), IndexMap::new()),
        None => (None, IndexMap::new()),
    };

    Some(Annotation {
        term: term.to_string(),
        attributes: attributes_of(node, &["Term", "Qualifier"]),
        text,
        record,
        raw: node.document().input_text()[node.range()].to_string(),
    })
}

fn parse_record(node: Node<'_, '_>) -> IndexMap<String, PropertyValue> {
    children(node, "PropertyValue")
        .filter_map(|property_value| {
            let property = property_value.attribute("Property")?;
            let text = property_value
                .children()
                .find(Node::is_element)
                .and_then(|child| child.text())
                .map(|text| text.trim().to_string());
            Some((
                property.to_string(),
                PropertyValue {
                    attributes: attributes_of(property_value, &["Property"]),
                    text,
                },
            ))
        })
        .collect()
}

fn attributes_of(node: Node<'_, '_>, skip: &[&str]) -> BTreeMap<String, String> {
    node.attributes()
        .filter(|attribute| !skip.contains(&attribute.name()))
        .map(|attribute| (attribute.name().to_string(), attribute.value().to_string()))
        .collect()
}
