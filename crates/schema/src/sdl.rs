//! Printing of type registries as GraphQL SDL.
//!
//! Directive usages attached by [`crate::AugmentTypes`] are printed as they are; declaring those
//! directives is left to whoever attached them.

use std::fmt::{self, Write};

use crate::registry::TypeRegistry;
use crate::types::{
    ArgumentDefinition, Directive, FieldDefinition, ObjectType, ScalarType, TypeDescriptor,
    TypeReference,
};

/// Order in which scalar definitions are printed.
const DECLARED_SCALARS: [ScalarType; 6] = [
    ScalarType::DateTime,
    ScalarType::DateTimeOffset,
    ScalarType::Seconds,
    ScalarType::TimeOnly,
    ScalarType::Date,
    ScalarType::Void,
];

impl TypeRegistry {
    /// The registry as a standalone schema document, rooted at the service's query and mutation
    /// roots.
    pub fn to_sdl(&self) -> String {
        let mut sdl = String::new();
        // writing into a `String` cannot fail
        let _ = write_schema(&mut sdl, self);
        sdl
    }
}

pub fn write_schema<W: Write>(w: &mut W, registry: &TypeRegistry) -> fmt::Result {
    writeln!(w, "schema {{")?;
    writeln!(w, "  query: {}", registry.query_root.name)?;
    writeln!(w, "  mutation: {}", registry.mutation_root.name)?;
    writeln!(w, "}}")?;
    writeln!(w)?;
    write_scalars(w, &referenced_scalars(registry))?;
    write_type_definitions(w, registry)
}

/// Non-builtin scalars used by any field or argument of the registry, roots included.
pub fn referenced_scalars(registry: &TypeRegistry) -> Vec<ScalarType> {
    let objects = registry
        .types
        .values()
        .filter_map(TypeDescriptor::as_object)
        .chain([&registry.query_root, &registry.mutation_root]);

    let mut used = Vec::new();
    for object in objects {
        for field in object.fields.values() {
            let references = std::iter::once(&field.field_type)
                .chain(field.arguments.values().map(|argument| &argument.argument_type));
            for reference in references {
                if let TypeReference::Scalar(scalar) = reference.underlying() {
                    if !used.contains(scalar) {
                        used.push(*scalar);
                    }
                }
            }
        }
    }
    DECLARED_SCALARS
        .into_iter()
        .filter(|scalar| used.contains(scalar))
        .collect()
}

pub fn write_scalars<W: Write>(w: &mut W, scalars: &[ScalarType]) -> fmt::Result {
    for scalar in scalars.iter().filter(|scalar| !scalar.is_builtin()) {
        write_description(w, scalar.description(), "")?;
        writeln!(w, "scalar {}", scalar.graphql_name())?;
        writeln!(w)?;
    }
    Ok(())
}

/// Every enum, object and union of the registry, followed by its query and mutation roots.
pub fn write_type_definitions<W: Write>(w: &mut W, registry: &TypeRegistry) -> fmt::Result {
    for descriptor in registry.types.values() {
        match descriptor {
            TypeDescriptor::Enum(enum_type) => {
                write_description(w, enum_type.description.as_deref(), "")?;
                write!(w, "enum {}", enum_type.name)?;
                write_directives(w, &enum_type.directives)?;
                writeln!(w, " {{")?;
                for value in &enum_type.values {
                    writeln!(w, "  {}", value.name)?;
                }
                writeln!(w, "}}")?;
            }
            TypeDescriptor::Object(object) => write_object(w, registry, object)?,
            TypeDescriptor::Union(union) => {
                write_description(w, union.description.as_deref(), "")?;
                write!(w, "union {}", union.name)?;
                write_directives(w, &union.directives)?;
                let members: Vec<String> = union
                    .members
                    .iter()
                    .map(|member| graphql_name(registry, member))
                    .collect();
                writeln!(w, " = {}", members.join(" | "))?;
            }
        }
        writeln!(w)?;
    }
    write_object(w, registry, &registry.query_root)?;
    writeln!(w)?;
    write_object(w, registry, &registry.mutation_root)
}

pub fn write_object<W: Write>(
    w: &mut W,
    registry: &TypeRegistry,
    object: &ObjectType,
) -> fmt::Result {
    write_description(w, object.description.as_deref(), "")?;
    write!(w, "type {}", object.name)?;
    write_directives(w, &object.directives)?;
    writeln!(w, " {{")?;
    for field in object.fields.values() {
        write_field(w, registry, field)?;
    }
    writeln!(w, "}}")
}

pub fn write_field<W: Write>(
    w: &mut W,
    registry: &TypeRegistry,
    field: &FieldDefinition,
) -> fmt::Result {
    write_description(w, field.description.as_deref(), "  ")?;
    write!(w, "  {}", field.name)?;
    write_arguments(w, registry, field.arguments.values())?;
    write!(w, ": {}", type_reference(registry, &field.field_type))?;
    write_directives(w, &field.directives)?;
    writeln!(w)
}

fn write_arguments<'a, W: Write>(
    w: &mut W,
    registry: &TypeRegistry,
    arguments: impl ExactSizeIterator<Item = &'a ArgumentDefinition>,
) -> fmt::Result {
    if arguments.len() == 0 {
        return Ok(());
    }
    writeln!(w, "(")?;
    for argument in arguments {
        write_description(w, argument.description.as_deref(), "    ")?;
        writeln!(
            w,
            "    {}: {}",
            argument.name,
            type_reference(registry, &argument.argument_type)
        )?;
    }
    write!(w, "  )")
}

fn write_directives<W: Write>(w: &mut W, directives: &[Directive]) -> fmt::Result {
    for directive in directives {
        write!(w, " @{}", directive.name)?;
        if directive.arguments.is_empty() {
            continue;
        }
        let arguments: Vec<String> = directive
            .arguments
            .iter()
            .map(|(name, value)| format!("{name}: {}", value_literal(value)))
            .collect();
        write!(w, "({})", arguments.join(", "))?;
    }
    Ok(())
}

/// Writes `description` as a block string, each line indented by `indent`.
pub fn write_description<W: Write>(
    w: &mut W,
    description: Option<&str>,
    indent: &str,
) -> fmt::Result {
    let Some(description) = description.filter(|description| !description.is_empty()) else {
        return Ok(());
    };
    writeln!(w, "{indent}\"\"\"")?;
    for line in description.replace("\"\"\"", "\\\"\"\"").lines() {
        if line.is_empty() {
            writeln!(w)?;
        } else {
            writeln!(w, "{indent}{line}")?;
        }
    }
    writeln!(w, "{indent}\"\"\"")
}

/// How a type reference is written in SDL, e.g. `[trippin_Person]` or `String!`.
pub fn type_reference(registry: &TypeRegistry, reference: &TypeReference) -> String {
    match reference {
        TypeReference::Scalar(scalar) => scalar.graphql_name().to_string(),
        TypeReference::Named(key) => graphql_name(registry, key),
        TypeReference::List(inner) => format!("[{}]", type_reference(registry, inner)),
        TypeReference::NonNull(inner) => format!("{}!", type_reference(registry, inner)),
    }
}

fn graphql_name(registry: &TypeRegistry, key: &str) -> String {
    registry
        .graphql_name(key)
        .map_or_else(|| key.to_string(), ToString::to_string)
}

/// A JSON value as a GraphQL input literal.
fn value_literal(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "null".to_string(),
        serde_json::Value::Bool(boolean) => boolean.to_string(),
        serde_json::Value::Number(number) => number.to_string(),
        // JSON string escapes are valid in GraphQL strings
        serde_json::Value::String(_) => value.to_string(),
        serde_json::Value::Array(items) => {
            let items: Vec<String> = items.iter().map(value_literal).collect();
            format!("[{}]", items.join(", "))
        }
        serde_json::Value::Object(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(name, value)| format!("{name}: {}", value_literal(value)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}
