use nonempty::NonEmpty;
use serde::Serialize;
use tracing_util::{ErrorVisibility, Traceable, TraceableError};

/// A list of path segments starting at the root of the response and
/// ending with the field associated with the error.
/// <https://spec.graphql.org/October2021/#sel-HAPHRPHABABC3vT>
pub type Path = Vec<PathSegment>;

/// A path segment is either a field name or an index into a list.
/// <https://spec.graphql.org/October2021/#sel-HAPHRPJABABEyoB>
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum PathSegment {
    /// Path segment that represent a field.
    Field(String),
    /// Path segment that represent list indices as 0-indexed integer.
    Index(usize),
}

impl PathSegment {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn index(index: usize) -> Self {
        Self::Index(index)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Extensions {
    /// Details of any error
    pub details: serde_json::Value,
}

/// A GraphQL error as it appears in the `errors` list of a response.
/// <https://spec.graphql.org/October2021/#sec-Errors.Error-result-format>
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GraphQLError {
    /// A string describing the error
    pub message: String,
    /// The path of the response field which experienced the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Path>,
    /// Extensions to the error with additional information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Extensions>,
}

impl GraphQLError {
    /// An error that is not attached to any field, e.g. a validation failure.
    pub fn request(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            extensions: None,
        }
    }
}

/// A GraphQL response body
/// Ref: <https://spec.graphql.org/October2021/#sec-Response-Format>
#[derive(Serialize, Debug, PartialEq)]
pub struct Response {
    #[serde(skip_serializing_if = "ResponseData::omit")]
    pub data: ResponseData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<NonEmpty<GraphQLError>>,
}

impl Response {
    pub fn new(data: serde_json::Map<String, serde_json::Value>, errors: Vec<GraphQLError>) -> Self {
        Self {
            data: ResponseData::Data(data),
            errors: NonEmpty::from_vec(errors),
        }
    }

    /// A request error shouldn't include "data" in the response
    /// Ref: <https://spec.graphql.org/October2021/#sec-Errors.Request-errors>
    pub fn request_error(error: GraphQLError) -> Self {
        Self {
            data: ResponseData::Omit,
            errors: Some(NonEmpty::new(error)),
        }
    }

    pub fn data(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match &self.data {
            ResponseData::Omit => None,
            ResponseData::Data(data) => Some(data),
        }
    }

    pub fn error_list(&self) -> Vec<&GraphQLError> {
        self.errors
            .as_ref()
            .map(|errors| errors.iter().collect())
            .unwrap_or_default()
    }

    pub fn does_contain_error(&self) -> bool {
        self.errors.is_some()
    }
}

/// `Omit` indicates the `"data"` field must be left out of the response, because an error was
/// raised before execution could begin.
#[derive(Debug, PartialEq)]
pub enum ResponseData {
    Omit,
    Data(serde_json::Map<String, serde_json::Value>),
}

impl ResponseData {
    fn omit(&self) -> bool {
        match self {
            Self::Omit => true,
            Self::Data(_) => false,
        }
    }
}

impl Serialize for ResponseData {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Omit => serializer.serialize_none(),
            Self::Data(data) => data.serialize(serializer),
        }
    }
}

/// A simple wrapper around a reference of GraphQL errors
#[derive(Debug)]
pub struct GraphQLErrors<'a>(pub &'a NonEmpty<GraphQLError>);

impl std::fmt::Display for GraphQLErrors<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages = self
            .0
            .iter()
            .map(|error| error.message.as_str())
            .collect::<Vec<_>>();
        write!(f, "{}", messages.join(", "))
    }
}

impl TraceableError for GraphQLErrors<'_> {
    fn visibility(&self) -> ErrorVisibility {
        // errors in the response body are shown to the client anyway
        ErrorVisibility::User
    }
}

impl Traceable for Response {
    type ErrorType<'a> = GraphQLErrors<'a>;

    fn get_error(&self) -> Option<GraphQLErrors<'_>> {
        self.errors.as_ref().map(GraphQLErrors)
    }
}
