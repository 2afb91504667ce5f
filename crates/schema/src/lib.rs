//! Compiles the metadata of OData v4 services into GraphQL type registries.
//!
//! Each service gets a [`TypeRegistry`]: its enums, objects and the unions standing in for EDM
//! inheritance, a query root with one field per entity set or singleton, a placeholder mutation
//! root, and the index used to rebuild canonical entity URLs. Registries are built once per base
//! URL and shared through the [`RegistryCache`].

mod augment;
mod cache;
mod error;
mod metadata;
mod registry;
pub mod sdl;
mod stages;
mod types;

pub use augment::AugmentTypes;
pub use cache::RegistryCache;
pub use error::Error;
pub use metadata::MetadataFetcher;
pub use registry::{EntitySetIndex, TypeRegistry, BASE_SUFFIX};
pub use stages::build;
pub use types::*;

/// Name of the raw-value field every object carries.
pub const RAW_VALUE_FIELD: &str = "_value";
/// Name of the field given to objects that would otherwise have none.
pub const PLACEHOLDER_FIELD: &str = "Placeholder";
