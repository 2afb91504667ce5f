use std::sync::Arc;

use execute::{ExposeInternalErrors, Hooks};
use indexmap::IndexMap;
use schema::{RegistryCache, TypeRegistry};
use serde::{Deserialize, Serialize};

use crate::host::ResolvedHostField;

/// A GraphQL request as received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<IndexMap<String, serde_json::Value>>,
}

impl RawRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: None,
        }
    }
}

/// One OData service, exposed under the root fields named after its prefix.
pub(crate) struct Service {
    pub registry: Arc<TypeRegistry>,
    pub hooks: Hooks,
}

/// The GraphQL facade over a set of OData services. Built by [`crate::EngineBuilder`].
///
/// The query root has a field per service, named after its prefix, plus the host's fields. The
/// mutation root has a field per service.
pub struct Engine {
    pub(crate) cache: RegistryCache,
    /// Keyed by prefix.
    pub(crate) services: IndexMap<String, Service>,
    /// Keyed by field name.
    pub(crate) host_fields: IndexMap<String, ResolvedHostField>,
    pub(crate) expose_internal_errors: ExposeInternalErrors,
}

impl Engine {
    /// Name of the host query root.
    pub const QUERY_ROOT: &'static str = "Query";
    /// Name of the host mutation root.
    pub const MUTATION_ROOT: &'static str = "Mutation";

    /// The types of the service with `prefix`.
    pub fn registry(&self, prefix: &str) -> Option<&Arc<TypeRegistry>> {
        self.services.get(prefix).map(|service| &service.registry)
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// The cache the registries were built with. Invalidating an entry there does not affect
    /// this engine, whose registries are fixed at build time.
    pub fn registry_cache(&self) -> &RegistryCache {
        &self.cache
    }
}
