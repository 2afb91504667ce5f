//! Schema-time type descriptors. These are immutable once a registry has been built; request-time
//! values live in the `execute` crate and only share names with these.

use std::fmt;

use indexmap::{IndexMap, IndexSet};

/// GraphQL name of a generated type, e.g. `trippin_Person` or `trippin_Person_Base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(pub String);

impl TypeName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    String,
    Int,
    Float,
    Boolean,
    DateTime,
    DateTimeOffset,
    /// ISO-8601 duration.
    Seconds,
    /// Time of day, serialized as `HH:mm:ss`.
    TimeOnly,
    /// Date without a time component.
    Date,
    /// Always null.
    Void,
}

impl ScalarType {
    /// Maps an EDM primitive type name (`Edm.Int32`, ...) to a scalar. Primitives without a
    /// mapping (e.g. `Edm.SByte`, geography types) yield `None` and the property is skipped.
    pub fn from_edm(qualified_name: &str) -> Option<Self> {
        Some(match qualified_name {
            "Edm.String" | "Edm.Guid" | "Edm.Stream" | "Edm.Binary" | "Edm.Byte" => Self::String,
            "Edm.DateTime" => Self::DateTime,
            "Edm.DateTimeOffset" => Self::DateTimeOffset,
            "Edm.Boolean" => Self::Boolean,
            "Edm.Int16" | "Edm.Int32" | "Edm.Int64" => Self::Int,
            "Edm.Double" | "Edm.Single" | "Edm.Decimal" => Self::Float,
            "Edm.Duration" => Self::Seconds,
            "Edm.TimeOfDay" => Self::TimeOnly,
            "Edm.Date" => Self::Date,
            _ => return None,
        })
    }

    pub fn graphql_name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
            Self::DateTime => "DateTime",
            Self::DateTimeOffset => "DateTimeOffset",
            Self::Seconds => "Seconds",
            Self::TimeOnly => "TimeOnly",
            Self::Date => "Date",
            Self::Void => "void",
        }
    }

    /// Scalars that every GraphQL schema has without declaring them.
    pub fn is_builtin(self) -> bool {
        matches!(self, Self::String | Self::Int | Self::Float | Self::Boolean)
    }

    pub fn description(self) -> Option<&'static str> {
        match self {
            Self::DateTime => Some("The `DateTime` scalar type represents a date and time."),
            Self::DateTimeOffset => Some(
                "The `DateTimeOffset` scalar type represents a date, time and offset from UTC.",
            ),
            Self::Seconds => Some("The `Seconds` scalar type represents a period of time."),
            Self::TimeOnly => Some(
                "The `TimeOnly` scalar type represents a time without a date to be formatted \
                 in accordance with the [ISO-8601](https://en.wikipedia.org/wiki/ISO_8601) standard.",
            ),
            Self::Date => Some("The `Date` scalar type represents a date without a time."),
            Self::Void => Some("Returns nothing"),
            Self::String | Self::Int | Self::Float | Self::Boolean => None,
        }
    }
}

/// Reference to a type from a field or an argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeReference {
    Scalar(ScalarType),
    /// An enum, object or union, by its key in the owning [`crate::TypeRegistry`].
    Named(String),
    List(Box<TypeReference>),
    NonNull(Box<TypeReference>),
}

impl TypeReference {
    pub fn list(inner: TypeReference) -> Self {
        Self::List(Box::new(inner))
    }

    pub fn non_null(inner: TypeReference) -> Self {
        Self::NonNull(Box::new(inner))
    }

    /// The innermost type, without list and non-null wrappers.
    pub fn underlying(&self) -> &TypeReference {
        match self {
            Self::List(inner) | Self::NonNull(inner) => inner.underlying(),
            other => other,
        }
    }

    /// Registry key of the innermost type, if it is a named type.
    pub fn registry_key(&self) -> Option<&str> {
        match self.underlying() {
            Self::Named(key) => Some(key),
            _ => None,
        }
    }

    /// Whether the outermost nullable type is a list.
    pub fn is_list(&self) -> bool {
        match self {
            Self::List(_) => true,
            Self::NonNull(inner) => inner.is_list(),
            Self::Scalar(_) | Self::Named(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub name: String,
    pub arguments: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDefinition {
    pub name: String,
    pub description: Option<String>,
    pub argument_type: TypeReference,
}

impl ArgumentDefinition {
    pub fn new(name: impl Into<String>, argument_type: TypeReference) -> Self {
        Self {
            name: name.into(),
            description: None,
            argument_type,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// How a field's value is obtained at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    /// Read from the parent entity's data; absent values are null.
    Property,
    /// Read from the parent entity's data if present, otherwise fetched from
    /// `{resourceUrl}/{field}`.
    Navigation,
    /// Root field listing an entity set.
    EntitySet,
    /// Root field reading a singleton.
    Singleton,
    /// Bound function, fetched from `{resourceUrl}/{field}({arguments})`.
    Function,
    /// The raw value of the entity, fetched from `{resourceUrl}/$value`.
    RawValue,
    /// Stand-in field of types that would otherwise have no fields. Always null.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    pub name: String,
    pub description: Option<String>,
    pub field_type: TypeReference,
    pub arguments: IndexMap<String, ArgumentDefinition>,
    pub resolver: ResolverKind,
    pub directives: Vec<Directive>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: TypeReference, resolver: ResolverKind) -> Self {
        Self {
            name: name.into(),
            description: None,
            field_type,
            arguments: IndexMap::new(),
            resolver,
            directives: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub name: TypeName,
    pub prefix: String,
    pub base_url: String,
    pub description: Option<String>,
    pub fields: IndexMap<String, FieldDefinition>,
    pub expandable: bool,
    pub selectable: bool,
    /// Query options accepted by fields that list or read this type from an entity set.
    pub arguments: IndexMap<String, ArgumentDefinition>,
    pub directives: Vec<Directive>,
}

impl ObjectType {
    pub fn new(name: TypeName, prefix: &str, base_url: &str) -> Self {
        Self {
            name,
            prefix: prefix.to_string(),
            base_url: base_url.to_string(),
            description: None,
            fields: IndexMap::new(),
            expandable: true,
            selectable: true,
            arguments: IndexMap::new(),
            directives: Vec::new(),
        }
    }

    pub fn add_field(&mut self, field: FieldDefinition) {
        self.fields.insert(field.name.clone(), field);
    }

    /// Fields that come from the metadata, as opposed to the raw-value and placeholder fields
    /// every object carries.
    pub fn has_declared_fields(&self) -> bool {
        self.fields.values().any(|field| {
            !matches!(
                field.resolver,
                ResolverKind::RawValue | ResolverKind::Placeholder
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    pub name: TypeName,
    pub description: Option<String>,
    /// Registry keys of the member objects.
    pub members: IndexSet<String>,
    pub directives: Vec<Directive>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: TypeName,
    pub description: Option<String>,
    pub values: Vec<EnumValue>,
    pub directives: Vec<Directive>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    Enum(EnumType),
    Object(ObjectType),
    Union(UnionType),
}

impl TypeDescriptor {
    pub fn name(&self) -> &TypeName {
        match self {
            Self::Enum(enum_type) => &enum_type.name,
            Self::Object(object) => &object.name,
            Self::Union(union) => &union.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Enum(enum_type) => enum_type.description.as_deref(),
            Self::Object(object) => object.description.as_deref(),
            Self::Union(union) => union.description.as_deref(),
        }
    }

    pub fn directives_mut(&mut self) -> &mut Vec<Directive> {
        match self {
            Self::Enum(enum_type) => &mut enum_type.directives,
            Self::Object(object) => &mut object.directives,
            Self::Union(union) => &mut union.directives,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            Self::Object(object) => Some(object),
            Self::Enum(_) | Self::Union(_) => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectType> {
        match self {
            Self::Object(object) => Some(object),
            Self::Enum(_) | Self::Union(_) => None,
        }
    }

    /// Whether values of this type need a sub-selection.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Union(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edm_primitives_map_to_scalars() {
        assert_eq!(ScalarType::from_edm("Edm.Guid"), Some(ScalarType::String));
        assert_eq!(ScalarType::from_edm("Edm.Byte"), Some(ScalarType::String));
        assert_eq!(ScalarType::from_edm("Edm.Int64"), Some(ScalarType::Int));
        assert_eq!(ScalarType::from_edm("Edm.Decimal"), Some(ScalarType::Float));
        assert_eq!(ScalarType::from_edm("Edm.Duration"), Some(ScalarType::Seconds));
        assert_eq!(ScalarType::from_edm("Edm.TimeOfDay"), Some(ScalarType::TimeOnly));
        assert_eq!(ScalarType::from_edm("Edm.SByte"), None);
        assert_eq!(ScalarType::from_edm("Edm.GeographyPoint"), None);
    }

    #[test]
    fn wrappers_are_seen_through() {
        let reference = TypeReference::non_null(TypeReference::list(TypeReference::Named(
            "Person".into(),
        )));
        assert!(reference.is_list());
        assert_eq!(reference.registry_key(), Some("Person"));
        assert!(!TypeReference::Scalar(ScalarType::Int).is_list());
    }
}
