use schema::{ScalarType, TypeReference, TypeRegistry};
use serde::Deserialize;

use crate::client::Payload;
use crate::error::FieldError;
use crate::materialize::{is_composite, materialize, ResolvedEntity};

/// A payload decoded against the type of the field it was requested for.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Entities(Vec<ResolvedEntity>),
    Entity(ResolvedEntity),
    Text(String),
    /// First result requested, none returned.
    Nothing,
}

/// `{"value": [...]}`
#[derive(Debug, Deserialize)]
struct Collection {
    value: Vec<serde_json::Value>,
}

/// Decodes `payload`, fetched from `url`, as a value of `field_type`.
///
/// Lists, and any type when only the first result is wanted, are read from the `value` array
/// of a collection response. Objects and unions are read from the whole body. String fields
/// get the body verbatim. There is no way to decode anything else.
pub fn process_response(
    registry: &TypeRegistry,
    field_type: &TypeReference,
    payload: Payload,
    url: &str,
    first_result_only: bool,
) -> Result<Decoded, FieldError> {
    let element = field_type.underlying();

    if field_type.is_list() || first_result_only {
        let Some(key) = element
            .registry_key()
            .filter(|key| is_composite(registry, key))
        else {
            return Err(unresolvable(registry, field_type));
        };
        let Collection { value } = serde_json::from_str(&payload.0)?;
        let mut entities = value
            .into_iter()
            .map(|item| entity(registry, key, item, None))
            .collect::<Result<Vec<_>, _>>()?;
        if !first_result_only {
            return Ok(Decoded::Entities(entities));
        }
        return Ok(if entities.is_empty() {
            Decoded::Nothing
        } else {
            Decoded::Entity(entities.swap_remove(0))
        });
    }

    match element {
        TypeReference::Named(key) if is_composite(registry, key) => {
            let body: serde_json::Value = serde_json::from_str(&payload.0)?;
            entity(registry, key, body, Some(url.to_string())).map(Decoded::Entity)
        }
        TypeReference::Scalar(ScalarType::String) => Ok(Decoded::Text(payload.0)),
        _ => Err(unresolvable(registry, field_type)),
    }
}

fn entity(
    registry: &TypeRegistry,
    key: &str,
    value: serde_json::Value,
    origin_url: Option<String>,
) -> Result<ResolvedEntity, FieldError> {
    let data = serde_json::from_value(value)?;
    materialize(registry, key, data, origin_url)
}

fn unresolvable(registry: &TypeRegistry, field_type: &TypeReference) -> FieldError {
    FieldError::UnresolvableField {
        type_name: schema::sdl::type_reference(registry, field_type),
    }
}
