use tracing_util::{ErrorVisibility, TraceableError};

/// Configuration errors: the schema of an OData service could not be obtained or compiled.
/// They are never retried.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to fetch metadata from {url}: {source}")]
    MetadataFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("metadata request to {url} failed with status {status}")]
    MetadataStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("invalid metadata document at {url}: {source}")]
    MetadataParse {
        url: String,
        #[source]
        source: edm::ParseError,
    },

    #[error("inheritance cycle between the types {}", types.join(", "))]
    InheritanceCycle { types: Vec<String> },

    #[error("no schema has been built for the OData service at {base_url}")]
    UnknownBaseUrl { base_url: String },

    #[error("the OData service at {base_url} has no type named {type_name}")]
    UnknownType { base_url: String, type_name: String },
}

impl TraceableError for Error {
    fn visibility(&self) -> ErrorVisibility {
        match self {
            Self::MetadataFetch { .. } => ErrorVisibility::Internal,
            Self::MetadataStatus { .. }
            | Self::MetadataParse { .. }
            | Self::InheritanceCycle { .. }
            | Self::UnknownBaseUrl { .. }
            | Self::UnknownType { .. } => ErrorVisibility::User,
        }
    }
}
