//! Resolution of selections against a service: every field of a selection set is resolved
//! concurrently, either from the data its parent entity already holds or by a request to the
//! service, and the results are joined by response key.

use std::sync::{Mutex, PoisonError};

use futures_util::future::{try_join_all, BoxFuture};
use futures_util::FutureExt;
use indexmap::IndexMap;
use schema::{FieldDefinition, ObjectType, ResolverKind, TypeReference, TypeRegistry};
use tokio_util::sync::CancellationToken;
use tracing_util::SpanVisibility;

use crate::client::{self, Payload};
use crate::decode::{process_response, Decoded};
use crate::error::{ExposeInternalErrors, FieldError};
use crate::hooks::{Hooks, ParseContext, RequestContext};
use crate::ir::{FieldSelection, SelectionSet};
use crate::materialize::{coerce_leaf, is_composite, materialize, ResolvedEntity};
use crate::response::{GraphQLError, Path, PathSegment};
use crate::url::{translate, CallStyle};

const TYPENAME: &str = "__typename";

type Object = serde_json::Map<String, serde_json::Value>;

/// Everything the resolution of one service's root field needs.
pub struct ExecutionContext<'a> {
    pub client: &'a reqwest::Client,
    pub registry: &'a TypeRegistry,
    pub hooks: &'a Hooks,
    pub cancellation: &'a CancellationToken,
    pub expose_internal_errors: ExposeInternalErrors,
    /// Recovered field errors, in the order they happened.
    errors: Mutex<Vec<GraphQLError>>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        client: &'a reqwest::Client,
        registry: &'a TypeRegistry,
        hooks: &'a Hooks,
        cancellation: &'a CancellationToken,
        expose_internal_errors: ExposeInternalErrors,
    ) -> Self {
        Self {
            client,
            registry,
            hooks,
            cancellation,
            expose_internal_errors,
            errors: Mutex::new(Vec::new()),
        }
    }

    pub fn into_errors(self) -> Vec<GraphQLError> {
        self.errors
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, error: GraphQLError) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(error);
    }

    fn request_context<'c>(&'c self, field_name: &'c str) -> RequestContext<'c> {
        RequestContext {
            prefix: &self.registry.prefix,
            base_url: &self.registry.base_url,
            field_name,
        }
    }

    async fn pre_parse(&self, field_name: &str, type_name: &str) -> Result<(), FieldError> {
        if let Some(pre_parse) = &self.hooks.pre_parse {
            pre_parse
                .pre_parse(ParseContext {
                    prefix: &self.registry.prefix,
                    base_url: &self.registry.base_url,
                    field_name,
                    type_name,
                })
                .await?;
        }
        Ok(())
    }
}

/// What the fields of a selection set are read from.
#[derive(Clone, Copy)]
enum Parent<'a> {
    Root(&'a ObjectType),
    Entity(&'a ResolvedEntity),
}

/// Resolves `selection_set` on the service's query root. `path` is where the root field sits
/// in the response.
pub async fn resolve_query_root(
    ctx: &ExecutionContext<'_>,
    selection_set: &SelectionSet,
    path: Path,
) -> Result<serde_json::Value, FieldError> {
    let root = &ctx.registry.query_root;
    let tracer = tracing_util::global_tracer();
    tracer
        .in_span_async(
            "resolve_service",
            format!("Resolve {}", root.name),
            SpanVisibility::User,
            || {
                Box::pin(async {
                    ctx.pre_parse(&ctx.registry.prefix, root.name.as_str())
                        .await?;
                    resolve_object(ctx, Parent::Root(root), selection_set, path)
                        .await
                        .map(serde_json::Value::Object)
                })
            },
        )
        .await
}

/// Resolves `selection_set` on the service's mutation root, whose only field is a placeholder.
pub async fn resolve_mutation_root(
    ctx: &ExecutionContext<'_>,
    selection_set: &SelectionSet,
    path: Path,
) -> Result<serde_json::Value, FieldError> {
    let root = &ctx.registry.mutation_root;
    resolve_object(ctx, Parent::Root(root), selection_set, path)
        .await
        .map(serde_json::Value::Object)
}

/// Invokes `function` on the service root. With `first_result_only`, the response is read as
/// a collection and its first element returned.
pub async fn call_function(
    ctx: &ExecutionContext<'_>,
    function: &str,
    parameters: &IndexMap<String, serde_json::Value>,
    first_result_only: bool,
) -> Result<serde_json::Value, FieldError> {
    let url = translate(
        &ctx.registry.base_url,
        function,
        parameters,
        CallStyle::Function,
        None,
    );
    let Some(Payload(body)) = client::entity_get(
        ctx.client,
        ctx.hooks,
        ctx.cancellation,
        ctx.request_context(function),
        url,
    )
    .await?
    else {
        return Ok(serde_json::Value::Null);
    };

    if first_result_only {
        #[derive(serde::Deserialize)]
        struct Collection {
            value: Vec<serde_json::Value>,
        }
        let Collection { value } = serde_json::from_str(&body)?;
        return Ok(value.into_iter().next().unwrap_or_default());
    }
    Ok(match serde_json::from_str(&body) {
        Ok(json) => json,
        // non-JSON results arrive as data URIs
        Err(_) => serde_json::Value::String(body),
    })
}

/// Resolves `selection_set` on a value the host obtained itself, typed as `value_type` of this
/// service. Objects in the value are materialized like entities returned by the service.
pub async fn resolve_value(
    ctx: &ExecutionContext<'_>,
    value_type: &TypeReference,
    value: serde_json::Value,
    selection_set: &SelectionSet,
    path: Path,
) -> Result<serde_json::Value, FieldError> {
    match complete_value(ctx, value_type, value, selection_set, path.clone()).await {
        Err(error) if error.is_recoverable() => {
            ctx.record(error.to_graphql_error(ctx.expose_internal_errors, Some(path)));
            Ok(serde_json::Value::Null)
        }
        result => result,
    }
}

fn resolve_object<'a>(
    ctx: &'a ExecutionContext<'_>,
    parent: Parent<'a>,
    selection_set: &'a SelectionSet,
    path: Path,
) -> BoxFuture<'a, Result<Object, FieldError>> {
    async move {
        let (object, type_key) = match parent {
            Parent::Root(object) => (object, None),
            Parent::Entity(entity) => {
                let object = ctx.registry.object(&entity.type_key).ok_or_else(|| {
                    FieldError::UnresolvableField {
                        type_name: entity.type_name.to_string(),
                    }
                })?;
                (object, Some(entity.type_key.as_str()))
            }
        };

        let resolutions = selection_set
            .fields
            .iter()
            .filter(|field| type_key.map_or(true, |type_key| field.applies_to(type_key)))
            .map(|field| {
                let path = child_path(&path, PathSegment::field(&field.alias));
                async move {
                    let value = resolve_field(ctx, object, parent, field, path).await?;
                    Ok::<_, FieldError>((field.alias.clone(), value))
                }
            });
        Ok(try_join_all(resolutions).await?.into_iter().collect())
    }
    .boxed()
}

/// Resolves one field. Errors the service reported for it are recorded and the field becomes
/// null; any other error is passed on.
async fn resolve_field(
    ctx: &ExecutionContext<'_>,
    object: &ObjectType,
    parent: Parent<'_>,
    field: &FieldSelection,
    path: Path,
) -> Result<serde_json::Value, FieldError> {
    match field_value(ctx, object, parent, field, &path).await {
        Err(error) if error.is_recoverable() => {
            ctx.record(error.to_graphql_error(ctx.expose_internal_errors, Some(path)));
            Ok(serde_json::Value::Null)
        }
        result => result,
    }
}

async fn field_value(
    ctx: &ExecutionContext<'_>,
    object: &ObjectType,
    parent: Parent<'_>,
    field: &FieldSelection,
    path: &Path,
) -> Result<serde_json::Value, FieldError> {
    if field.name == TYPENAME {
        return Ok(serde_json::Value::String(object.name.to_string()));
    }
    let definition = object
        .fields
        .get(&field.name)
        .ok_or_else(|| FieldError::UnresolvableField {
            type_name: format!("{}.{}", object.name, field.name),
        })?;

    match (definition.resolver, parent) {
        (ResolverKind::Placeholder, _) => Ok(serde_json::Value::Null),
        (ResolverKind::EntitySet | ResolverKind::Singleton, _) => {
            fetch(ctx, &ctx.registry.base_url, field, definition, CallStyle::Segment, path).await
        }
        (ResolverKind::Property, Parent::Entity(entity)) => {
            let value = entity.data.get(&field.name).cloned().unwrap_or_default();
            complete_value(
                ctx,
                &definition.field_type,
                value,
                &field.selection_set,
                path.clone(),
            )
            .await
        }
        (ResolverKind::Navigation, Parent::Entity(entity)) => {
            if let Some(value) = entity.data.get(&field.name) {
                return complete_value(
                    ctx,
                    &definition.field_type,
                    value.clone(),
                    &field.selection_set,
                    path.clone(),
                )
                .await;
            }
            let Some(resource) = resource_url(entity, field) else {
                return Ok(serde_json::Value::Null);
            };
            fetch(ctx, resource, field, definition, CallStyle::Segment, path).await
        }
        (ResolverKind::Function, Parent::Entity(entity)) => {
            let Some(resource) = resource_url(entity, field) else {
                return Ok(serde_json::Value::Null);
            };
            fetch(ctx, resource, field, definition, CallStyle::Function, path).await
        }
        (ResolverKind::RawValue, Parent::Entity(entity)) => {
            let Some(resource) = resource_url(entity, field) else {
                return Ok(serde_json::Value::Null);
            };
            fetch(ctx, resource, field, definition, CallStyle::Segment, path).await
        }
        (
            ResolverKind::Property
            | ResolverKind::Navigation
            | ResolverKind::Function
            | ResolverKind::RawValue,
            Parent::Root(_),
        ) => Err(FieldError::UnresolvableField {
            type_name: format!("{}.{}", object.name, field.name),
        }),
    }
}

fn resource_url<'e>(entity: &'e ResolvedEntity, field: &FieldSelection) -> Option<&'e str> {
    let resource = entity.resource_url();
    if resource.is_none() {
        tracing::debug!(
            type_name = %entity.type_name,
            field = %field.name,
            "entity has no resource URL to request the field from"
        );
    }
    resource
}

/// Requests `field` under `resource` and resolves the selection on what comes back.
async fn fetch(
    ctx: &ExecutionContext<'_>,
    resource: &str,
    field: &FieldSelection,
    definition: &FieldDefinition,
    call: CallStyle,
    path: &Path,
) -> Result<serde_json::Value, FieldError> {
    let element_key = definition
        .field_type
        .registry_key()
        .filter(|key| is_composite(ctx.registry, key));
    if let Some(key) = element_key {
        let type_name = ctx
            .registry
            .graphql_name(key)
            .map_or(key, schema::TypeName::as_str);
        ctx.pre_parse(&field.name, type_name).await?;
    }

    let select = match (definition.resolver, element_key) {
        (ResolverKind::EntitySet | ResolverKind::Singleton, Some(key)) => {
            select_list(ctx.registry, key, &field.selection_set)
        }
        _ => None,
    };
    let url = translate(
        resource,
        &field.name,
        &field.arguments,
        call,
        select.as_deref(),
    );

    let Some(payload) = client::entity_get(
        ctx.client,
        ctx.hooks,
        ctx.cancellation,
        ctx.request_context(&field.name),
        url.clone(),
    )
    .await?
    else {
        return Ok(serde_json::Value::Null);
    };

    match process_response(ctx.registry, &definition.field_type, payload, &url, false)? {
        Decoded::Entities(entities) => {
            let resolutions = entities.iter().enumerate().map(|(index, entity)| {
                resolve_object(
                    ctx,
                    Parent::Entity(entity),
                    &field.selection_set,
                    child_path(path, PathSegment::index(index)),
                )
            });
            let objects = try_join_all(resolutions).await?;
            Ok(serde_json::Value::Array(
                objects.into_iter().map(serde_json::Value::Object).collect(),
            ))
        }
        Decoded::Entity(entity) => {
            resolve_object(ctx, Parent::Entity(&entity), &field.selection_set, path.clone())
                .await
                .map(serde_json::Value::Object)
        }
        Decoded::Text(text) => Ok(serde_json::Value::String(text)),
        Decoded::Nothing => Ok(serde_json::Value::Null),
    }
}

/// The properties to `$select` for a selection on elements of `key`. Nothing is selected when
/// the type forbids it, or when a field is only declared on a subtype.
fn select_list(
    registry: &TypeRegistry,
    key: &str,
    selection_set: &SelectionSet,
) -> Option<Vec<String>> {
    let (_, object) = registry.concrete_object(key)?;
    if !object.selectable || selection_set.is_empty() {
        return None;
    }
    let mut properties = Vec::new();
    for field in &selection_set.fields {
        if field.name == TYPENAME {
            continue;
        }
        match object.fields.get(&field.name) {
            Some(definition) if definition.resolver == ResolverKind::Property => {
                properties.push(field.name.clone());
            }
            // requested on their own
            Some(_) => {}
            None => return None,
        }
    }
    Some(properties)
}

/// Completes a value the parent entity already holds: nested objects are materialized and
/// resolved in turn, leaves are coerced to their scalar.
fn complete_value<'a>(
    ctx: &'a ExecutionContext<'_>,
    field_type: &'a TypeReference,
    value: serde_json::Value,
    selection_set: &'a SelectionSet,
    path: Path,
) -> BoxFuture<'a, Result<serde_json::Value, FieldError>> {
    async move {
        if value.is_null() {
            return Ok(value);
        }
        match field_type {
            TypeReference::NonNull(inner) => {
                complete_value(ctx, inner, value, selection_set, path).await
            }
            TypeReference::List(inner) => {
                let serde_json::Value::Array(items) = value else {
                    return Ok(serde_json::Value::Null);
                };
                let completions = items.into_iter().enumerate().map(|(index, item)| {
                    complete_value(
                        ctx,
                        inner,
                        item,
                        selection_set,
                        child_path(&path, PathSegment::index(index)),
                    )
                });
                Ok(serde_json::Value::Array(try_join_all(completions).await?))
            }
            TypeReference::Named(key) if is_composite(ctx.registry, key) => {
                let serde_json::Value::Object(data) = value else {
                    return Ok(serde_json::Value::Null);
                };
                let entity = materialize(ctx.registry, key, data, None)?;
                resolve_object(ctx, Parent::Entity(&entity), selection_set, path)
                    .await
                    .map(serde_json::Value::Object)
            }
            TypeReference::Named(_) => Ok(value),
            TypeReference::Scalar(scalar) => Ok(coerce_leaf(*scalar, value)),
        }
    }
    .boxed()
}

fn child_path(path: &[PathSegment], segment: PathSegment) -> Path {
    let mut child = Vec::with_capacity(path.len() + 1);
    child.extend_from_slice(path);
    child.push(segment);
    child
}
