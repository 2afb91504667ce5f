use indexmap::IndexMap;

use crate::types::{ObjectType, TypeDescriptor, TypeName};

/// Suffix of the object that keeps the fields of a base type once the base type's public name
/// has been taken over by a union.
pub const BASE_SUFFIX: &str = "_Base";

/// Maps the GraphQL name of a type to the path of the entity set its instances live in, so that
/// canonical resource URLs can be rebuilt for materialized entities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySetIndex(IndexMap<TypeName, String>);

impl EntitySetIndex {
    pub fn insert(&mut self, type_name: TypeName, entity_set: String) {
        self.0.insert(type_name, entity_set);
    }

    pub fn get(&self, type_name: &TypeName) -> Option<&str> {
        self.0.get(type_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Every generated type of one OData service.
///
/// Types are keyed by their unqualified EDM name, which is also what `@odata.type`
/// discriminators carry. The objects holding the fields of unionized base types are keyed
/// `{Name}_Base`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRegistry {
    pub prefix: String,
    pub base_url: String,
    pub types: IndexMap<String, TypeDescriptor>,
    pub entity_sets: EntitySetIndex,
    /// Object named after the prefix, with a field per entity set and singleton.
    pub query_root: ObjectType,
    /// Object named `{prefix}Mutations`.
    pub mutation_root: ObjectType,
}

impl TypeRegistry {
    pub fn get(&self, key: &str) -> Option<&TypeDescriptor> {
        self.types.get(key)
    }

    pub fn object(&self, key: &str) -> Option<&ObjectType> {
        self.types.get(key).and_then(TypeDescriptor::as_object)
    }

    /// The object that carries the fields for values of type `key`: the type itself for an
    /// object, the `_Base` variant for a union. `None` if that variant was pruned.
    pub fn concrete_object(&self, key: &str) -> Option<(&str, &ObjectType)> {
        match self.types.get_key_value(key)? {
            (key, TypeDescriptor::Object(object)) => Some((key.as_str(), object)),
            (key, TypeDescriptor::Union(_)) => {
                let (base_key, descriptor) =
                    self.types.get_key_value(&format!("{key}{BASE_SUFFIX}"))?;
                descriptor
                    .as_object()
                    .map(|object| (base_key.as_str(), object))
            }
            (_, TypeDescriptor::Enum(_)) => None,
        }
    }

    /// Looks a type up by its GraphQL name.
    pub fn find_by_graphql_name(&self, name: &str) -> Option<(&str, &TypeDescriptor)> {
        self.types
            .iter()
            .find(|(_, descriptor)| descriptor.name().as_str() == name)
            .map(|(key, descriptor)| (key.as_str(), descriptor))
    }

    /// Registry keys of the objects a value of type `key` can be: the object itself, or the
    /// members of a union.
    pub fn possible_types(&self, key: &str) -> Vec<&str> {
        match self.types.get_key_value(key) {
            Some((key, TypeDescriptor::Object(_))) => vec![key.as_str()],
            Some((_, TypeDescriptor::Union(union))) => {
                union.members.iter().map(String::as_str).collect()
            }
            Some((_, TypeDescriptor::Enum(_))) | None => Vec::new(),
        }
    }

    pub fn graphql_name(&self, key: &str) -> Option<&TypeName> {
        self.types.get(key).map(TypeDescriptor::name)
    }
}
