use crate::types::{
    FieldDefinition, ObjectType, ResolverKind, ScalarType, TypeDescriptor, TypeReference,
};

use crate::RAW_VALUE_FIELD;

use super::{Service, Types};

/// Creates an object for every entity and complex type. Fields are populated by later stages,
/// once every type they can refer to exists; only the raw-value field is added here.
pub(crate) fn resolve(service: Service<'_>, edm: &edm::EdmDocument, types: &mut Types) {
    for structured_type in &edm.structured_types {
        let mut object = ObjectType::new(
            service.type_name(&structured_type.name),
            service.prefix,
            service.base_url,
        );
        let mut raw_value = FieldDefinition::new(
            RAW_VALUE_FIELD,
            TypeReference::Scalar(ScalarType::String),
            ResolverKind::RawValue,
        );
        raw_value.description = Some("Raw Value".to_string());
        object.add_field(raw_value);

        types.insert(structured_type.name.clone(), TypeDescriptor::Object(object));
    }
}
