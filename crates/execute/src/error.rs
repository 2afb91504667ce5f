use reqwest::StatusCode;
use tracing_util::{ErrorVisibility, TraceableError};

use crate::hooks::HookError;
use crate::response::{Extensions, GraphQLError, Path};

/// Whether internal errors are shown to clients or replaced by a generic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExposeInternalErrors {
    Expose,
    #[default]
    Censor,
}

/// Errors raised while resolving a field.
///
/// Only the errors reported by the OData service for a data request are recoverable: the field
/// becomes null and the error is listed in the response. Every other error ends the resolution
/// of the root field it happened under.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("access to {url} was denied by the OData service")]
    Unauthorized {
        url: String,
        details: serde_json::Value,
    },

    #[error("OData request to {url} failed with status {status}")]
    Remote {
        url: String,
        status: StatusCode,
        details: serde_json::Value,
    },

    #[error("no way to resolve a value of type {type_name}")]
    UnresolvableField { type_name: String },

    #[error("entity discriminator {odata_type} names {type_name}, which is not an object type")]
    NotAnObject {
        odata_type: String,
        type_name: String,
    },

    #[error("request hook failed: {0}")]
    Hook(#[from] HookError),

    #[error("OData request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected OData response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid OData request URL {url}")]
    InvalidUrl { url: String },

    #[error("the request was cancelled")]
    Cancelled,

    #[error("{0}")]
    Schema(#[from] schema::Error),
}

impl FieldError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Remote { .. })
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Unauthorized { details, .. } | Self::Remote { details, .. } => {
                Some(details.clone())
            }
            Self::UnresolvableField { .. }
            | Self::NotAnObject { .. }
            | Self::Hook(_)
            | Self::Transport(_)
            | Self::Decode(_)
            | Self::InvalidUrl { .. }
            | Self::Cancelled
            | Self::Schema(_) => None,
        }
    }

    pub fn to_graphql_error(
        &self,
        expose_internal_errors: ExposeInternalErrors,
        path: Option<Path>,
    ) -> GraphQLError {
        match (self.visibility(), expose_internal_errors) {
            (ErrorVisibility::Internal, ExposeInternalErrors::Censor) => GraphQLError {
                message: "internal error".into(),
                path,
                // extensions of internal errors may leak service internals
                extensions: None,
            },
            _ => GraphQLError {
                message: self.to_string(),
                path,
                extensions: self.details().map(|details| Extensions { details }),
            },
        }
    }
}

impl TraceableError for FieldError {
    fn visibility(&self) -> ErrorVisibility {
        match self {
            Self::Unauthorized { .. }
            | Self::Remote { .. }
            | Self::Hook(_)
            | Self::InvalidUrl { .. }
            | Self::Cancelled => ErrorVisibility::User,
            Self::Schema(error) => error.visibility(),
            Self::UnresolvableField { .. }
            | Self::NotAnObject { .. }
            | Self::Transport(_)
            | Self::Decode(_) => ErrorVisibility::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::response::PathSegment;

    #[test]
    fn only_remote_errors_are_recoverable() {
        let denied = FieldError::Unauthorized {
            url: "http://localhost/People".into(),
            details: serde_json::json!({"code": "Authorization_RequestDenied"}),
        };
        assert!(denied.is_recoverable());
        assert!(!FieldError::Cancelled.is_recoverable());
        assert!(!FieldError::UnresolvableField {
            type_name: "Int".into()
        }
        .is_recoverable());
    }

    #[test]
    fn internal_errors_are_censored() {
        let error = FieldError::UnresolvableField {
            type_name: "Int".into(),
        };
        let path = Some(vec![PathSegment::field("zoo")]);

        let censored = error.to_graphql_error(ExposeInternalErrors::Censor, path.clone());
        assert_eq!(censored.message, "internal error");
        assert_eq!(censored.path, path);

        let exposed = error.to_graphql_error(ExposeInternalErrors::Expose, None);
        assert_eq!(exposed.message, "no way to resolve a value of type Int");
    }

    #[test]
    fn remote_errors_carry_their_details() {
        let error = FieldError::Remote {
            url: "http://localhost/People".into(),
            status: StatusCode::BAD_REQUEST,
            details: serde_json::json!({"code": "BadRequest"}),
        };
        let graphql_error = error.to_graphql_error(ExposeInternalErrors::Censor, None);
        assert_eq!(
            graphql_error.message,
            "OData request to http://localhost/People failed with status 400 Bad Request"
        );
        assert_eq!(
            graphql_error.extensions,
            Some(Extensions {
                details: serde_json::json!({"code": "BadRequest"})
            })
        );
    }
}
