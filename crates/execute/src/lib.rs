//! Request-time side of the bridge: GraphQL selections are translated into OData requests,
//! responses are classified and decoded, and the entities that come back are resolved field by
//! field.

mod client;
mod decode;
mod error;
mod hooks;
mod ir;
mod materialize;
mod resolve;
mod response;
mod url;

pub use client::Payload;
pub use decode::{process_response, Decoded};
pub use error::{ExposeInternalErrors, FieldError};
pub use hooks::{HookError, Hooks, ODataRequest, ParseContext, PreParse, PreRequest, RequestContext};
pub use ir::{FieldSelection, SelectionSet, TypeCondition};
pub use materialize::{materialize, ResolvedEntity};
pub use resolve::{
    call_function, resolve_mutation_root, resolve_query_root, resolve_value, ExecutionContext,
};
pub use response::{Extensions, GraphQLError, GraphQLErrors, Path, PathSegment, Response, ResponseData};
pub use url::{translate, CallStyle};
