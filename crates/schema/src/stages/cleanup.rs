use crate::registry::BASE_SUFFIX;
use crate::types::{FieldDefinition, ResolverKind, ScalarType, TypeDescriptor, TypeReference};

use crate::PLACEHOLDER_FIELD;

use super::Types;

/// Gives objects without declared fields a placeholder field. Empty `_Base` variants are
/// dropped altogether, together with their membership in every union (unions list all
/// transitive descendants); a union left without members turns back into the object it
/// replaced.
pub(crate) fn resolve(types: &mut Types) {
    let empty: Vec<String> = types
        .iter()
        .filter_map(|(key, descriptor)| match descriptor {
            TypeDescriptor::Object(object) if !object.has_declared_fields() => Some(key.clone()),
            _ => None,
        })
        .collect();

    for key in empty {
        let Some(object) = types.get_mut(&key).and_then(TypeDescriptor::as_object_mut) else {
            continue;
        };
        object.add_field(placeholder());

        let Some(union_key) = key.strip_suffix(BASE_SUFFIX) else {
            continue;
        };
        if !matches!(types.get(union_key), Some(TypeDescriptor::Union(_))) {
            continue;
        }
        let Some(TypeDescriptor::Object(mut base_object)) = types.shift_remove(&key) else {
            continue;
        };

        let mut reverts = false;
        for (member_of, descriptor) in types.iter_mut() {
            let TypeDescriptor::Union(union) = descriptor else {
                continue;
            };
            if !union.members.shift_remove(&key) || !union.members.is_empty() {
                continue;
            }
            if member_of == union_key {
                base_object.name = union.name.clone();
                reverts = true;
            } else {
                tracing::warn!(type_name = %member_of, "union left without members");
            }
        }
        if reverts {
            types.insert(union_key.to_string(), TypeDescriptor::Object(base_object));
        }
        tracing::debug!(type_name = %key, "pruned empty base variant");
    }
}

fn placeholder() -> FieldDefinition {
    FieldDefinition::new(
        PLACEHOLDER_FIELD,
        TypeReference::Scalar(ScalarType::Void),
        ResolverKind::Placeholder,
    )
}

#[cfg(test)]
mod tests {
    use indexmap::IndexSet;

    use super::*;
    use crate::types::{ObjectType, TypeName, UnionType};

    fn object(name: &str, fields: &[&str]) -> TypeDescriptor {
        let mut object = ObjectType::new(TypeName(name.into()), "zoo", "http://localhost");
        for field in fields {
            object.add_field(FieldDefinition::new(
                *field,
                TypeReference::Scalar(ScalarType::String),
                ResolverKind::Property,
            ));
        }
        TypeDescriptor::Object(object)
    }

    fn union(name: &str, members: &[&str]) -> TypeDescriptor {
        TypeDescriptor::Union(UnionType {
            name: TypeName(name.into()),
            description: None,
            members: members.iter().map(ToString::to_string).collect::<IndexSet<_>>(),
            directives: Vec::new(),
        })
    }

    #[test]
    fn empty_objects_get_a_placeholder() {
        let mut types = Types::new();
        types.insert("Tag".into(), object("zoo_Tag", &[]));
        resolve(&mut types);

        let tag = types["Tag"].as_object().unwrap();
        assert_eq!(tag.fields.len(), 1);
        assert_eq!(tag.fields[PLACEHOLDER_FIELD].resolver, ResolverKind::Placeholder);
    }

    #[test]
    fn union_left_without_members_becomes_an_object_again() {
        let mut types = Types::new();
        types.insert("Thing".into(), union("zoo_Thing", &["Thing_Base"]));
        types.insert("Thing_Base".into(), object("zoo_Thing_Base", &[]));
        resolve(&mut types);

        assert!(!types.contains_key("Thing_Base"));
        let thing = types["Thing"].as_object().unwrap();
        assert_eq!(thing.name.as_str(), "zoo_Thing");
        assert!(thing.fields.contains_key(PLACEHOLDER_FIELD));
    }

    #[test]
    fn pruned_bases_leave_ancestor_unions_too() {
        let mut types = Types::new();
        types.insert(
            "Animal".into(),
            union("zoo_Animal", &["Dog_Base", "Puppy", "Animal_Base"]),
        );
        types.insert("Animal_Base".into(), object("zoo_Animal_Base", &[]));
        types.insert("Dog".into(), union("zoo_Dog", &["Puppy", "Dog_Base"]));
        types.insert("Dog_Base".into(), object("zoo_Dog_Base", &[]));
        types.insert("Puppy".into(), object("zoo_Puppy", &["Breed"]));
        resolve(&mut types);

        assert_eq!(
            types.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["Animal", "Dog", "Puppy"]
        );
        for key in ["Animal", "Dog"] {
            let Some(TypeDescriptor::Union(union)) = types.get(key) else {
                panic!("{key} should still be a union");
            };
            assert_eq!(union.members.iter().collect::<Vec<_>>(), vec!["Puppy"]);
        }
    }
}
