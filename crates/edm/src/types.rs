use crate::annotations::AnnotationTargets;

/// A parsed metadata document. Only the elements that matter for schema generation are kept,
/// in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdmDocument {
    pub enum_types: Vec<EnumType>,
    pub structured_types: Vec<StructuredType>,
    pub functions: Vec<Function>,
    pub container: Vec<ContainerEntry>,
    pub annotations: AnnotationTargets,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    pub name: String,
    pub is_flags: bool,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    /// Declared `Value`; absent values default to the member's position.
    pub value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuredKind {
    Entity,
    Complex,
}

/// An `EntityType` or a `ComplexType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredType {
    pub name: String,
    pub kind: StructuredKind,
    /// Qualified name of the declared base type.
    pub base_type: Option<String>,
    pub is_abstract: bool,
    pub members: Vec<Member>,
}

impl StructuredType {
    /// Unqualified name of the base type, if one is declared.
    pub fn base_type_name(&self) -> Option<&str> {
        self.base_type
            .as_deref()
            .filter(|base_type| !base_type.is_empty())
            .map(local_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Property,
    Navigation,
}

/// A `Property` or a `NavigationProperty` of a structured type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub type_name: String,
    pub kind: MemberKind,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub is_bound: bool,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerEntry {
    EntitySet { name: String, entity_type: String },
    Singleton { name: String, type_name: String },
}

impl ContainerEntry {
    pub fn name(&self) -> &str {
        match self {
            Self::EntitySet { name, .. } | Self::Singleton { name, .. } => name,
        }
    }

    /// Qualified name of the element type.
    pub fn type_name(&self) -> &str {
        match self {
            Self::EntitySet { entity_type, .. } => entity_type,
            Self::Singleton { type_name, .. } => type_name,
        }
    }
}

/// A type reference as written in a `Type` attribute, with one level of `Collection(..)`
/// unwrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRef<'a> {
    pub is_collection: bool,
    pub qualified_name: &'a str,
}

impl<'a> TypeRef<'a> {
    pub fn parse(type_name: &'a str) -> Self {
        match type_name
            .strip_prefix("Collection(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            Some(element) => Self {
                is_collection: true,
                qualified_name: element,
            },
            None => Self {
                is_collection: false,
                qualified_name: type_name,
            },
        }
    }

    pub fn local_name(&self) -> &'a str {
        local_name(self.qualified_name)
    }
}

/// Strips the namespace (or alias) from a qualified name.
pub fn local_name(qualified_name: &str) -> &str {
    qualified_name
        .rsplit('.')
        .next()
        .unwrap_or(qualified_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_types_are_unwrapped_once() {
        let type_ref = TypeRef::parse("Collection(Trippin.Person)");
        assert!(type_ref.is_collection);
        assert_eq!(type_ref.qualified_name, "Trippin.Person");
        assert_eq!(type_ref.local_name(), "Person");

        let type_ref = TypeRef::parse("Edm.String");
        assert!(!type_ref.is_collection);
        assert_eq!(type_ref.local_name(), "String");
    }

    #[test]
    fn unqualified_names_are_their_own_local_name() {
        assert_eq!(local_name("Person"), "Person");
        assert_eq!(local_name("microsoft.graph.user"), "user");
    }
}
