//! Extension points for the host: decorating or vetoing outgoing OData requests, and observing
//! composite fields before they are resolved.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::HeaderMap;

/// Failure reported by a host hook, e.g. a token that could not be obtained.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// An outgoing GET request to an OData service.
#[derive(Debug, Clone)]
pub struct ODataRequest {
    pub url: String,
    pub headers: HeaderMap,
}

/// What an outgoing request is made for.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    pub prefix: &'a str,
    pub base_url: &'a str,
    /// Name of the field being resolved, or of the function a host invoked directly.
    pub field_name: &'a str,
}

/// The composite field about to be resolved.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub prefix: &'a str,
    pub base_url: &'a str,
    pub field_name: &'a str,
    /// GraphQL name of the field's type.
    pub type_name: &'a str,
}

/// Runs before every outgoing data request. Returning `None` drops the request and the field
/// resolves to null.
#[async_trait]
pub trait PreRequest: Send + Sync {
    async fn pre_request(
        &self,
        context: RequestContext<'_>,
        request: ODataRequest,
    ) -> Result<Option<ODataRequest>, HookError>;
}

/// Runs before a composite field is resolved.
#[async_trait]
pub trait PreParse: Send + Sync {
    async fn pre_parse(&self, context: ParseContext<'_>) -> Result<(), HookError>;
}

/// The hooks of one service.
#[derive(Clone, Default)]
pub struct Hooks {
    pub pre_request: Option<Arc<dyn PreRequest>>,
    pub pre_parse: Option<Arc<dyn PreParse>>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("pre_request", &self.pre_request.is_some())
            .field("pre_parse", &self.pre_parse.is_some())
            .finish()
    }
}
