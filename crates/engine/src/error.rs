use execute::FieldError;
use tracing_util::{ErrorVisibility, TraceableError};

use crate::config::ConfigError;

/// Errors building an engine. All of them are configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("unable to create the HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("unable to build the schema: {0}")]
    Schema(#[from] schema::Error),
    #[error("the root field {name} is declared more than once")]
    DuplicateRootField { name: String },
    #[error("the host field name {name:?} is not a valid GraphQL name")]
    InvalidFieldName { name: String },
}

impl TraceableError for BuildError {
    fn visibility(&self) -> ErrorVisibility {
        match self {
            Self::HttpClient(_) => ErrorVisibility::Internal,
            Self::Schema(error) => error.visibility(),
            Self::Config(_) | Self::DuplicateRootField { .. } | Self::InvalidFieldName { .. } => {
                ErrorVisibility::User
            }
        }
    }
}

/// Errors in a GraphQL request, found before anything is sent to a service.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{0}")]
    Parse(#[from] async_graphql_parser::Error),
    #[error("no operation named {0} in the document")]
    OperationNotFound(String),
    #[error("the operation name is required when the document has more than one operation")]
    OperationNameRequired,
    #[error("subscriptions are not supported")]
    SubscriptionsNotSupported,
    #[error("invalid variables: {0}")]
    InvalidVariables(#[source] serde_json::Error),
    #[error("the variable ${0} is required")]
    MissingVariable(String),
    #[error("the variable ${0} is not defined by the operation")]
    UndefinedVariable(String),
    #[error("no fragment named {0} in the document")]
    FragmentNotFound(String),
    #[error("the fragment {0} spreads itself")]
    FragmentCycle(String),
    #[error("unknown type {0}")]
    UnknownType(String),
    #[error("a fragment on {condition} can never apply to a value of type {type_name}")]
    InvalidTypeCondition {
        condition: String,
        type_name: String,
    },
    #[error("the type {type_name} has no field {field_name}")]
    UnknownField {
        type_name: String,
        field_name: String,
    },
    #[error("the field {field_name} has no argument {argument}")]
    UnknownArgument { field_name: String, argument: String },
    #[error("the argument {argument} of the field {field_name} is required")]
    MissingArgument { field_name: String, argument: String },
    #[error("the field {field_name} must have a selection of subfields")]
    SelectionRequired { field_name: String },
    #[error("the field {field_name} of a leaf type cannot have subfields")]
    SelectionNotAllowed { field_name: String },
    #[error("the directive @{directive} needs a boolean argument 'if'")]
    InvalidDirective { directive: String },
    #[error("invalid argument value: {0}")]
    InvalidValue(#[source] serde_json::Error),
}

impl TraceableError for RequestError {
    fn visibility(&self) -> ErrorVisibility {
        ErrorVisibility::User
    }
}

/// Errors of functions called directly by the host.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("no OData service with the prefix {prefix}")]
    UnknownService { prefix: String },
    #[error(transparent)]
    Field(#[from] FieldError),
}

impl TraceableError for CallError {
    fn visibility(&self) -> ErrorVisibility {
        match self {
            Self::UnknownService { .. } => ErrorVisibility::User,
            Self::Field(error) => error.visibility(),
        }
    }
}
