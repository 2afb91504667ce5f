use crate::types::{FieldDefinition, ResolverKind, ScalarType, TypeReference};

use super::{object_mut, Types};

/// Resolves an EDM type reference against the primitive table and the types built so far.
/// Returns `None` for types that cannot be represented.
pub(crate) fn resolve_type(type_name: &str, types: &Types) -> Option<TypeReference> {
    let type_ref = edm::TypeRef::parse(type_name);
    let element = match ScalarType::from_edm(type_ref.qualified_name) {
        Some(scalar) => TypeReference::Scalar(scalar),
        None => {
            let key = type_ref.local_name();
            types.contains_key(key).then(|| TypeReference::Named(key.to_string()))?
        }
    };
    Some(if type_ref.is_collection {
        TypeReference::list(element)
    } else {
        element
    })
}

/// Adds a field for every property and navigation property. Properties whose type cannot be
/// resolved are left out.
pub(crate) fn resolve(edm: &edm::EdmDocument, types: &mut Types) {
    for structured_type in &edm.structured_types {
        let known: &Types = types;
        let fields: Vec<FieldDefinition> = structured_type
            .members
            .iter()
            .filter_map(|member| {
                let Some(field_type) = resolve_type(&member.type_name, known) else {
                    tracing::debug!(
                        type_name = %structured_type.name,
                        field = %member.name,
                        edm_type = %member.type_name,
                        "skipping field of unsupported type"
                    );
                    return None;
                };
                let resolver = match member.kind {
                    edm::MemberKind::Property => ResolverKind::Property,
                    edm::MemberKind::Navigation => ResolverKind::Navigation,
                };
                Some(FieldDefinition::new(&member.name, field_type, resolver))
            })
            .collect();

        let Some(object) = object_mut(types, &structured_type.name) else {
            continue;
        };
        for field in fields {
            if !object.fields.contains_key(&field.name) {
                object.add_field(field);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ObjectType, TypeDescriptor, TypeName};

    #[test]
    fn resolves_primitives_collections_and_known_types() {
        let mut types = Types::new();
        types.insert(
            "Person".into(),
            TypeDescriptor::Object(ObjectType::new(
                TypeName("trippin_Person".into()),
                "trippin",
                "http://localhost",
            )),
        );

        assert_eq!(
            resolve_type("Edm.Int32", &types),
            Some(TypeReference::Scalar(ScalarType::Int))
        );
        assert_eq!(
            resolve_type("Collection(Edm.String)", &types),
            Some(TypeReference::list(TypeReference::Scalar(ScalarType::String)))
        );
        assert_eq!(
            resolve_type("Collection(Trippin.Person)", &types),
            Some(TypeReference::list(TypeReference::Named("Person".into())))
        );
        assert_eq!(resolve_type("Trippin.Airport", &types), None);
        assert_eq!(resolve_type("Edm.GeographyPoint", &types), None);
    }
}
