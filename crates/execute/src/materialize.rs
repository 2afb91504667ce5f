use schema::{ScalarType, TypeDescriptor, TypeName, TypeRegistry};

use crate::error::FieldError;

const ODATA_TYPE: &str = "@odata.type";

/// An entity returned by an OData service, typed against the registry of that service.
///
/// Field values stay raw JSON until they are selected.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    /// Registry key of the object carrying the entity's fields, e.g. `Dog` or `Animal_Base`.
    pub type_key: String,
    /// GraphQL name of that object.
    pub type_name: TypeName,
    pub base_url: String,
    /// `{baseUrl}/{entitySet}/{id}`, when the entity set of the type is known and the entity
    /// has an id.
    pub canonical_url: Option<String>,
    /// The URL the entity was fetched from, if it was fetched on its own.
    pub origin_url: Option<String>,
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl ResolvedEntity {
    /// The URL navigation properties, functions and the raw value are requested under.
    pub fn resource_url(&self) -> Option<&str> {
        self.canonical_url
            .as_deref()
            .or(self.origin_url.as_deref())
    }
}

/// Types `data` as an instance of the registry type `declared_key`, or of the type named by its
/// `@odata.type` discriminator when the registry knows that type. A discriminator naming an
/// enum is an error.
pub fn materialize(
    registry: &TypeRegistry,
    declared_key: &str,
    data: serde_json::Map<String, serde_json::Value>,
    origin_url: Option<String>,
) -> Result<ResolvedEntity, FieldError> {
    let mut key = declared_key;
    if let Some(odata_type) = data.get(ODATA_TYPE).and_then(serde_json::Value::as_str) {
        let discriminated = discriminator_key(odata_type);
        match registry.get(discriminated) {
            Some(descriptor @ TypeDescriptor::Enum(_)) => {
                return Err(FieldError::NotAnObject {
                    odata_type: odata_type.to_string(),
                    type_name: descriptor.name().to_string(),
                });
            }
            Some(_) => key = discriminated,
            None => {}
        }
    }

    let unresolvable = || FieldError::UnresolvableField {
        type_name: registry
            .graphql_name(key)
            .map_or_else(|| key.to_string(), ToString::to_string),
    };
    let descriptor = registry.get(key).ok_or_else(unresolvable)?;
    let (type_key, object) = registry.concrete_object(key).ok_or_else(unresolvable)?;

    let canonical_url = registry
        .entity_sets
        .get(descriptor.name())
        .zip(data.get("id").and_then(id_segment))
        .map(|(entity_set, id)| {
            format!(
                "{}/{entity_set}/{id}",
                registry.base_url.trim_end_matches('/')
            )
        });

    Ok(ResolvedEntity {
        type_key: type_key.to_string(),
        type_name: object.name.clone(),
        base_url: registry.base_url.clone(),
        canonical_url,
        origin_url,
        data,
    })
}

/// `#Zoo.Dog` → `Dog`
fn discriminator_key(odata_type: &str) -> &str {
    let odata_type = odata_type.trim_start_matches('#');
    odata_type
        .rsplit_once('.')
        .map_or(odata_type, |(_, name)| name)
}

fn id_segment(id: &serde_json::Value) -> Option<String> {
    match id {
        serde_json::Value::String(id) => Some(id.clone()),
        serde_json::Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Whether values of `key` are objects to materialize rather than leaves.
pub(crate) fn is_composite(registry: &TypeRegistry, key: &str) -> bool {
    registry.get(key).is_some_and(TypeDescriptor::is_composite)
}

/// Adjusts a raw leaf value to its scalar: times of day are cut to `HH:mm:ss`.
pub(crate) fn coerce_leaf(scalar: ScalarType, value: serde_json::Value) -> serde_json::Value {
    match (scalar, value) {
        (ScalarType::TimeOnly, serde_json::Value::String(time)) => {
            serde_json::Value::String(format_time_only(&time))
        }
        (ScalarType::Void, _) => serde_json::Value::Null,
        (_, value) => value,
    }
}

fn format_time_only(time: &str) -> String {
    let time = time.split('.').next().unwrap_or(time);
    match time.split(':').count() {
        2 => format!("{time}:00"),
        _ => time.to_string(),
    }
}
