//! GraphQL facade over OData v4 services.
//!
//! Every configured service is compiled from its `$metadata` into GraphQL types and exposed
//! under a root field named after its prefix. GraphQL requests are parsed and checked against
//! those types, then resolved by requests to the services.

mod build;
mod config;
mod error;
mod host;
mod normalize;
mod query;
mod sdl;
mod types;

pub use build::{EngineBuilder, ServiceDefinition};
pub use config::{ConfigError, EngineConfig, ServiceConfig};
pub use error::{BuildError, CallError, RequestError};
pub use host::{ForwardTypeRef, HostField, HostResolver};
pub use types::{Engine, RawRequest};

pub use execute::{
    ExposeInternalErrors, GraphQLError, HookError, Hooks, ODataRequest, ParseContext, PreParse,
    PreRequest, RequestContext, Response,
};
pub use tokio_util::sync::CancellationToken;
