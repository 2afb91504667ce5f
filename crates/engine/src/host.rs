//! Root fields contributed by the host, typed with types this engine generates.
//!
//! A host field names its type with a [`ForwardTypeRef`], since the type does not exist until
//! the metadata of its service has been compiled. The references are resolved once every
//! service's registry has been built.

use std::sync::Arc;

use execute::HookError;
use indexmap::IndexMap;
use schema::{ArgumentDefinition, FieldDefinition, ResolverKind, TypeReference, TypeRegistry};

/// A type of the service at `base_url`, by its EDM name (`Person`) or its GraphQL name
/// (`trippinPerson`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardTypeRef {
    pub base_url: String,
    pub type_name: String,
}

impl ForwardTypeRef {
    pub fn new(base_url: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            type_name: type_name.into(),
        }
    }

    /// Registry key of the referenced type.
    pub(crate) fn resolve<'r>(&self, registry: &'r TypeRegistry) -> Result<&'r str, schema::Error> {
        if let Some((key, _)) = registry.types.get_key_value(&self.type_name) {
            return Ok(key.as_str());
        }
        registry
            .find_by_graphql_name(&self.type_name)
            .map(|(key, _)| key)
            .ok_or_else(|| schema::Error::UnknownType {
                base_url: self.base_url.clone(),
                type_name: self.type_name.clone(),
            })
    }
}

/// Produces the value of a host field. Objects in the returned JSON are read as OData entities
/// of the field's type: an `@odata.type` annotation selects a derived type, and the selection
/// is then resolved like any other, fetching navigations from the service when needed.
#[async_trait::async_trait]
pub trait HostResolver: Send + Sync {
    async fn resolve(
        &self,
        arguments: &IndexMap<String, serde_json::Value>,
    ) -> Result<serde_json::Value, HookError>;
}

/// A root query field declared by the host.
#[derive(Clone)]
pub struct HostField {
    pub name: String,
    pub description: Option<String>,
    pub arguments: IndexMap<String, ArgumentDefinition>,
    pub forward: ForwardTypeRef,
    pub list: bool,
    pub resolver: Arc<dyn HostResolver>,
}

impl HostField {
    pub fn new(
        name: impl Into<String>,
        forward: ForwardTypeRef,
        resolver: Arc<dyn HostResolver>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: IndexMap::new(),
            forward,
            list: false,
            resolver,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_argument(mut self, argument: ArgumentDefinition) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }

    /// The field returns a list of values of the referenced type.
    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }
}

impl std::fmt::Debug for HostField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostField")
            .field("name", &self.name)
            .field("forward", &self.forward)
            .field("list", &self.list)
            .finish_non_exhaustive()
    }
}

/// A host field whose type has been found in the registry of the service with `prefix`.
pub(crate) struct ResolvedHostField {
    pub prefix: String,
    pub definition: FieldDefinition,
    pub resolver: Arc<dyn HostResolver>,
}

impl ResolvedHostField {
    pub(crate) fn new(field: HostField, registry: &TypeRegistry) -> Result<Self, schema::Error> {
        let key = field.forward.resolve(registry)?;
        let named = TypeReference::Named(key.to_string());
        let field_type = if field.list {
            TypeReference::list(named)
        } else {
            named
        };
        let mut definition = FieldDefinition::new(field.name, field_type, ResolverKind::Property);
        definition.description = field.description;
        definition.arguments = field.arguments;
        Ok(Self {
            prefix: registry.prefix.clone(),
            definition,
            resolver: field.resolver,
        })
    }
}
