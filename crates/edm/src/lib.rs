//! The part of an OData v4 CSDL (`$metadata`) document that is needed to derive a GraphQL schema
//! from it: enum, entity and complex types, bound functions, the entity container and the
//! capability/core vocabulary annotations.
//!
//! The document is parsed once into owned values so that it can be cached and shared between
//! threads without keeping the XML text around.

mod annotations;
mod error;
mod parse;
mod types;

pub use annotations::{Annotation, AnnotationTargets, PropertyAnnotations, PropertyValue};
pub use error::ParseError;
pub use types::{
    local_name, ContainerEntry, EdmDocument, EnumMember, EnumType, Function, Member, MemberKind,
    Parameter, StructuredKind, StructuredType, TypeRef,
};
