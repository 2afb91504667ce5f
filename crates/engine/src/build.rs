use std::sync::Arc;

use execute::{ExposeInternalErrors, Hooks};
use futures_util::future::try_join_all;
use indexmap::IndexMap;
use schema::{AugmentTypes, RegistryCache};
use tracing_util::SpanVisibility;

use crate::config::{self, EngineConfig};
use crate::error::BuildError;
use crate::host::{HostField, ResolvedHostField};
use crate::types::{Engine, Service};

/// An OData service to expose, with the host's collaborators for it.
#[derive(Clone)]
pub struct ServiceDefinition {
    pub prefix: String,
    pub base_url: String,
    pub hooks: Hooks,
    pub augment: Option<Arc<dyn AugmentTypes>>,
}

impl ServiceDefinition {
    pub fn new(prefix: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            base_url: base_url.into(),
            hooks: Hooks::default(),
            augment: None,
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_augment(mut self, augment: Arc<dyn AugmentTypes>) -> Self {
        self.augment = Some(augment);
        self
    }
}

/// Collects services and host fields, then builds the [`Engine`] in two passes: first the
/// registry of every service, then the types of the host fields, which refer to types of
/// those registries.
pub struct EngineBuilder {
    client: reqwest::Client,
    services: Vec<ServiceDefinition>,
    host_fields: Vec<HostField>,
    expose_internal_errors: ExposeInternalErrors,
}

impl EngineBuilder {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            services: Vec::new(),
            host_fields: Vec::new(),
            expose_internal_errors: ExposeInternalErrors::default(),
        }
    }

    /// A builder with the services, client and error policy of `config`.
    pub fn from_config(config: &EngineConfig) -> Result<Self, BuildError> {
        let mut builder = Self::new(config.http_client()?)
            .expose_internal_errors(config.expose_internal_errors());
        for service in &config.services {
            builder = builder.service(ServiceDefinition::new(&service.prefix, &service.base_url));
        }
        Ok(builder)
    }

    pub fn service(mut self, service: ServiceDefinition) -> Self {
        self.services.push(service);
        self
    }

    /// Adds a field to the query root. Its type is looked up when the engine is built.
    pub fn host_field(mut self, field: HostField) -> Self {
        self.host_fields.push(field);
        self
    }

    pub fn expose_internal_errors(mut self, expose_internal_errors: ExposeInternalErrors) -> Self {
        self.expose_internal_errors = expose_internal_errors;
        self
    }

    pub async fn build(self) -> Result<Engine, BuildError> {
        let tracer = tracing_util::global_tracer();
        tracer
            .in_span_async(
                "build_engine",
                "Build engine",
                SpanVisibility::User,
                || Box::pin(self.build_inner()),
            )
            .await
    }

    async fn build_inner(self) -> Result<Engine, BuildError> {
        config::validate_services(
            self.services
                .iter()
                .map(|service| (service.prefix.as_str(), service.base_url.as_str())),
        )?;

        let cache = RegistryCache::new(self.client);
        let registries = try_join_all(self.services.iter().map(|service| {
            cache.get_or_build(&service.prefix, &service.base_url, service.augment.as_deref())
        }))
        .await?;

        let mut services = IndexMap::new();
        for (definition, registry) in self.services.into_iter().zip(registries) {
            tracing::debug!(
                prefix = %definition.prefix,
                base_url = %definition.base_url,
                types = registry.types.len(),
                "service registered"
            );
            services.insert(
                definition.prefix,
                Service {
                    registry,
                    hooks: definition.hooks,
                },
            );
        }

        // second pass: every registry exists, so forward references can be looked up
        let mut host_fields = IndexMap::new();
        for field in self.host_fields {
            if !config::is_graphql_name(&field.name) {
                return Err(BuildError::InvalidFieldName { name: field.name });
            }
            if services.contains_key(&field.name) || host_fields.contains_key(&field.name) {
                return Err(BuildError::DuplicateRootField { name: field.name });
            }
            let registry = cache.require(&field.forward.base_url)?;
            let name = field.name.clone();
            host_fields.insert(name, ResolvedHostField::new(field, &registry)?);
        }

        Ok(Engine {
            cache,
            services,
            host_fields,
            expose_internal_errors: self.expose_internal_errors,
        })
    }
}
