use execute::{ExecutionContext, FieldError, GraphQLError, Path, PathSegment, Response};
use futures_util::future::join_all;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing_util::SpanVisibility;

use crate::error::CallError;
use crate::host::ResolvedHostField;
use crate::normalize::{self, OperationKind, RootField, RootTarget};
use crate::types::{Engine, RawRequest, Service};

impl Engine {
    /// Executes a GraphQL request. Root fields are resolved concurrently. A root field whose
    /// resolution fails becomes null, with the failure listed in the errors of the response.
    ///
    /// Once `cancellation` is cancelled, pending requests to the services are abandoned.
    pub async fn execute_query(
        &self,
        request: RawRequest,
        cancellation: CancellationToken,
    ) -> Response {
        let tracer = tracing_util::global_tracer();
        tracer
            .in_span_async(
                "execute_query",
                "Execute query",
                SpanVisibility::User,
                || {
                    Box::pin(async {
                        let operation = match normalize::normalize(self, &request) {
                            Ok(operation) => operation,
                            Err(error) => {
                                tracing::debug!(error = %error, "invalid request");
                                return Response::request_error(GraphQLError::request(
                                    error.to_string(),
                                ));
                            }
                        };

                        let results = join_all(operation.root_fields.iter().map(|field| {
                            self.resolve_root_field(operation.kind, field, &cancellation)
                        }))
                        .await;

                        let mut data = serde_json::Map::new();
                        let mut errors = Vec::new();
                        for (field, (value, field_errors)) in
                            operation.root_fields.iter().zip(results)
                        {
                            data.insert(field.alias.clone(), value);
                            errors.extend(field_errors);
                        }
                        Response::new(data, errors)
                    })
                },
            )
            .await
    }

    async fn resolve_root_field(
        &self,
        kind: OperationKind,
        field: &RootField<'_>,
        cancellation: &CancellationToken,
    ) -> (serde_json::Value, Vec<GraphQLError>) {
        let path = vec![PathSegment::field(&field.alias)];
        match field.target {
            RootTarget::Typename => (
                serde_json::Value::String(kind.root_name().to_string()),
                Vec::new(),
            ),
            RootTarget::Service(service) => {
                let ctx = self.execution_context(service, cancellation);
                let result = match kind {
                    OperationKind::Query => {
                        execute::resolve_query_root(&ctx, &field.selection_set, path.clone()).await
                    }
                    OperationKind::Mutation => {
                        execute::resolve_mutation_root(&ctx, &field.selection_set, path.clone())
                            .await
                    }
                };
                self.finish(ctx, result, path)
            }
            RootTarget::Host {
                field: host,
                service,
            } => {
                let ctx = self.execution_context(service, cancellation);
                let result = resolve_host_field(&ctx, host, field, path.clone()).await;
                self.finish(ctx, result, path)
            }
        }
    }

    fn execution_context<'a>(
        &'a self,
        service: &'a Service,
        cancellation: &'a CancellationToken,
    ) -> ExecutionContext<'a> {
        ExecutionContext::new(
            self.cache.client(),
            &service.registry,
            &service.hooks,
            cancellation,
            self.expose_internal_errors,
        )
    }

    /// Pairs the value of a root field with the errors recovered while resolving it.
    fn finish(
        &self,
        ctx: ExecutionContext<'_>,
        result: Result<serde_json::Value, FieldError>,
        path: Path,
    ) -> (serde_json::Value, Vec<GraphQLError>) {
        let mut errors = ctx.into_errors();
        match result {
            Ok(value) => (value, errors),
            Err(error) => {
                tracing::warn!(error = %error, "root field failed");
                errors.push(error.to_graphql_error(self.expose_internal_errors, Some(path)));
                (serde_json::Value::Null, errors)
            }
        }
    }

    /// Calls `function` on the root of the service with `prefix`, outside of any GraphQL
    /// request. With `first_result_only`, the first element of the returned collection is
    /// returned, or null.
    pub async fn call_function(
        &self,
        prefix: &str,
        function: &str,
        parameters: &IndexMap<String, serde_json::Value>,
        first_result_only: bool,
    ) -> Result<serde_json::Value, CallError> {
        let service = self
            .services
            .get(prefix)
            .ok_or_else(|| CallError::UnknownService {
                prefix: prefix.to_string(),
            })?;
        let cancellation = CancellationToken::new();
        let ctx = self.execution_context(service, &cancellation);
        Ok(execute::call_function(&ctx, function, parameters, first_result_only).await?)
    }
}

async fn resolve_host_field(
    ctx: &ExecutionContext<'_>,
    host: &ResolvedHostField,
    field: &RootField<'_>,
    path: Path,
) -> Result<serde_json::Value, FieldError> {
    let value = host.resolver.resolve(&field.arguments).await?;
    execute::resolve_value(
        ctx,
        &host.definition.field_type,
        value,
        &field.selection_set,
        path,
    )
    .await
}
