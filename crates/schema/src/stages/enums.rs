use crate::types::{EnumType, EnumValue, TypeDescriptor};

use super::{Service, Types};

/// Creates an enum for every `EnumType`. Flag enums are exposed like plain enums.
pub(crate) fn resolve(service: Service<'_>, edm: &edm::EdmDocument, types: &mut Types) {
    for enum_type in &edm.enum_types {
        let values = enum_type
            .members
            .iter()
            .enumerate()
            .map(|(position, member)| EnumValue {
                name: member.name.clone(),
                value: member
                    .value
                    .clone()
                    .unwrap_or_else(|| position.to_string()),
            })
            .collect();

        types.insert(
            enum_type.name.clone(),
            TypeDescriptor::Enum(EnumType {
                name: service.type_name(&enum_type.name),
                description: None,
                values,
                directives: Vec::new(),
            }),
        );
    }
}
