use tracing_util::{ErrorVisibility, TraceableError};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("metadata document is not well-formed XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("<{element}> element is missing the required '{attribute}' attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
}

impl TraceableError for ParseError {
    fn visibility(&self) -> ErrorVisibility {
        ErrorVisibility::User
    }
}
