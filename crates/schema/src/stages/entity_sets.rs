use crate::registry::EntitySetIndex;
use crate::types::{
    FieldDefinition, ObjectType, ResolverKind, ScalarType, TypeName, TypeReference,
};

use crate::PLACEHOLDER_FIELD;

use super::{object, type_arguments, Service, Types};

pub(crate) struct EntitySetsOutput {
    pub query_root: ObjectType,
    pub entity_sets: EntitySetIndex,
}

/// Builds the service's query root from the entity container: entity sets become list fields
/// taking the element type's query options, singletons become plain fields.
///
/// Each entity set is also recorded as the home of its element type when the set name, minus
/// its last three characters, occurs in the type's GraphQL name (`Airlines` → `Airli` matches
/// `trippin_Airline`, `People` does not match `trippin_Person`).
pub(crate) fn resolve(
    service: Service<'_>,
    edm: &edm::EdmDocument,
    types: &Types,
) -> EntitySetsOutput {
    let mut query_root = ObjectType::new(
        TypeName(service.prefix.to_string()),
        service.prefix,
        service.base_url,
    );
    let mut entity_sets = EntitySetIndex::default();

    for entry in &edm.container {
        let key = edm::local_name(entry.type_name());
        let Some(descriptor) = types.get(key) else {
            tracing::warn!(
                name = entry.name(),
                type_name = entry.type_name(),
                "skipping container entry of unknown type"
            );
            continue;
        };
        if query_root.fields.contains_key(entry.name()) {
            continue;
        }

        match entry {
            edm::ContainerEntry::EntitySet { name, .. } => {
                let mut field = FieldDefinition::new(
                    name,
                    TypeReference::list(TypeReference::Named(key.to_string())),
                    ResolverKind::EntitySet,
                );
                // a pruned `_Base` variant leaves its arguments to the annotations
                field.arguments = object(types, key)
                    .map_or_else(|| type_arguments(edm, key), |element| element.arguments.clone());
                query_root.add_field(field);

                if entity_set_matches(name, descriptor.name()) {
                    entity_sets.insert(descriptor.name().clone(), name.clone());
                }
            }
            edm::ContainerEntry::Singleton { name, .. } => {
                query_root.add_field(FieldDefinition::new(
                    name,
                    TypeReference::Named(key.to_string()),
                    ResolverKind::Singleton,
                ));
            }
        }
    }

    EntitySetsOutput {
        query_root,
        entity_sets,
    }
}

/// Whether `entity_set` looks like the plural of `type_name`: the set name minus its last three
/// characters must occur in the type name. A three-character set name leaves an empty stem and
/// so matches any type; shorter names have no stem at all and never match.
fn entity_set_matches(entity_set: &str, type_name: &TypeName) -> bool {
    let Some(stem_length) = entity_set.chars().count().checked_sub(3) else {
        return false;
    };
    let stem: String = entity_set.chars().take(stem_length).collect();
    type_name.as_str().contains(&stem)
}

/// The service's mutation root. Write operations are not exposed, so it only carries a
/// placeholder.
pub(crate) fn mutation_root(service: Service<'_>) -> ObjectType {
    let mut mutation_root = ObjectType::new(
        TypeName(format!("{}Mutations", service.prefix)),
        service.prefix,
        service.base_url,
    );
    mutation_root.add_field(FieldDefinition::new(
        PLACEHOLDER_FIELD,
        TypeReference::Scalar(ScalarType::Void),
        ResolverKind::Placeholder,
    ));
    mutation_root
}
