use indexmap::IndexMap;

use crate::types::{ArgumentDefinition, FieldDefinition, ResolverKind, TypeReference};

use super::fields::resolve_type;
use super::{object_mut, Types};

/// Attaches every bound function as a field of the type it is bound to, with the remaining
/// parameters as arguments. Functions with a parameter or return type that cannot be resolved
/// are skipped, and so are functions whose name is already taken by a field.
pub(crate) fn resolve(edm: &edm::EdmDocument, types: &mut Types) {
    // Functions bound to a collection land in a `List<..>` bucket. No type is keyed like that,
    // so they are never attached.
    let mut by_owner: IndexMap<String, Vec<FieldDefinition>> = IndexMap::new();

    for function in edm.functions.iter().filter(|function| function.is_bound) {
        let Some(binding) = function.parameters.iter().find(|parameter| {
            let name = parameter.name.to_lowercase();
            name == "bindingparameter" || name == "bindparameter"
        }) else {
            continue;
        };

        let Some(field) = function_field(function, &binding.name, types) else {
            tracing::debug!(function = %function.name, "skipping function with unsupported types");
            continue;
        };

        let binding_type = edm::TypeRef::parse(&binding.type_name);
        let owner = if binding_type.is_collection {
            format!("List<{}>", binding_type.local_name())
        } else {
            binding_type.local_name().to_string()
        };
        by_owner.entry(owner).or_default().push(field);
    }

    for (owner, functions) in by_owner {
        let Some(object) = object_mut(types, &owner) else {
            tracing::debug!(owner = %owner, "no type to attach bound functions to");
            continue;
        };
        for function in functions {
            if !object.fields.contains_key(&function.name) {
                object.add_field(function);
            }
        }
    }
}

fn function_field(
    function: &edm::Function,
    binding_parameter: &str,
    types: &Types,
) -> Option<FieldDefinition> {
    let return_type = resolve_type(function.return_type.as_deref()?, types)?;

    let mut arguments = IndexMap::new();
    for parameter in &function.parameters {
        if parameter.name == binding_parameter {
            continue;
        }
        let mut argument_type = resolve_type(&parameter.type_name, types)?;
        if !parameter.nullable {
            argument_type = TypeReference::non_null(argument_type);
        }
        arguments.insert(
            parameter.name.clone(),
            ArgumentDefinition::new(&parameter.name, argument_type),
        );
    }

    let mut field = FieldDefinition::new(&function.name, return_type, ResolverKind::Function);
    field.arguments = arguments;
    Some(field)
}
