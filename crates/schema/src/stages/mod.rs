//! Compilation of an EDM document into a [`TypeRegistry`], one stage per concern. Stages run in
//! a fixed order because later ones rely on the shape earlier ones leave behind: fields can only
//! reference types that exist, inherited fields include bound functions, and empty objects are
//! only known once every field has been placed.

mod annotations;
mod cleanup;
mod entity_sets;
mod enums;
mod fields;
mod functions;
mod inheritance;
mod object_types;

use indexmap::IndexMap;

use crate::augment::AugmentTypes;
use crate::error::Error;
use crate::registry::{TypeRegistry, BASE_SUFFIX};
use crate::types::{ObjectType, TypeDescriptor, TypeName};

pub(crate) use annotations::type_arguments;

/// Types being built, keyed like [`TypeRegistry::types`].
pub(crate) type Types = IndexMap<String, TypeDescriptor>;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Service<'a> {
    pub prefix: &'a str,
    pub base_url: &'a str,
}

impl Service<'_> {
    pub fn type_name(&self, edm_name: &str) -> TypeName {
        TypeName(format!("{}_{edm_name}", self.prefix))
    }
}

/// Compiles the metadata of the service at `base_url` into its type registry.
pub fn build(
    prefix: &str,
    base_url: &str,
    edm: &edm::EdmDocument,
    augment: Option<&dyn AugmentTypes>,
) -> Result<TypeRegistry, Error> {
    let service = Service { prefix, base_url };

    // fail on cyclic inheritance before anything is built
    let inheritance = inheritance::resolve(edm)?;

    let mut types = Types::new();
    enums::resolve(service, edm, &mut types);
    object_types::resolve(service, edm, &mut types);
    inheritance::synthesize_unions(service, &inheritance, &mut types);
    fields::resolve(edm, &mut types);
    functions::resolve(edm, &mut types);
    inheritance::propagate_fields(&inheritance, &mut types);
    cleanup::resolve(&mut types);
    annotations::resolve(edm, &mut types);

    let entity_sets::EntitySetsOutput {
        query_root,
        entity_sets,
    } = entity_sets::resolve(service, edm, &types);
    let mutation_root = entity_sets::mutation_root(service);

    let mut registry = TypeRegistry {
        prefix: prefix.to_string(),
        base_url: base_url.to_string(),
        types,
        entity_sets,
        query_root,
        mutation_root,
    };
    if let Some(augment) = augment {
        apply_augmentation(augment, &mut registry);
    }

    tracing::debug!(
        base_url,
        types = registry.types.len(),
        entity_sets = registry.entity_sets.len(),
        "built type registry"
    );
    Ok(registry)
}

/// The object holding the fields of the type `key`, looking through unions to their `_Base`
/// variant.
pub(crate) fn object_mut<'t>(types: &'t mut Types, key: &str) -> Option<&'t mut ObjectType> {
    let key = match types.get(key)? {
        TypeDescriptor::Union(_) => format!("{key}{BASE_SUFFIX}"),
        TypeDescriptor::Object(_) | TypeDescriptor::Enum(_) => key.to_string(),
    };
    types.get_mut(&key).and_then(TypeDescriptor::as_object_mut)
}

pub(crate) fn object<'t>(types: &'t Types, key: &str) -> Option<&'t ObjectType> {
    match types.get(key)? {
        TypeDescriptor::Union(_) => types
            .get(&format!("{key}{BASE_SUFFIX}"))
            .and_then(TypeDescriptor::as_object),
        descriptor => descriptor.as_object(),
    }
}

fn apply_augmentation(augment: &dyn AugmentTypes, registry: &mut TypeRegistry) {
    for descriptor in registry.types.values_mut() {
        augment.augment(descriptor);
    }
    for root in [&mut registry.query_root, &mut registry.mutation_root] {
        let mut descriptor = TypeDescriptor::Object(root.clone());
        augment.augment(&mut descriptor);
        if let TypeDescriptor::Object(augmented) = descriptor {
            *root = augmented;
        }
    }
}
