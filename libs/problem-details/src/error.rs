use thiserror::Error;

/// Boxed error type used for response body failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while building, serializing or parsing problems.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ProblemError {
    /// An extension key collides with one of the reserved member names
    #[error("invalid field used in extensions: {field}")]
    ReservedField { field: String },

    /// JSON encoding failed
    #[error("Failed to serialize problem: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Reading the response body failed
    #[error("Failed to read response body: {0}")]
    Body(#[source] BoxError),

    /// The response body is not a valid problem document
    #[error("Malformed problem document: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The HTTP response could not be assembled
    #[error("Failed to build response: {0}")]
    Response(#[from] http::Error),

    /// The request context holds a non-string value under the trace key
    #[error("trace value under key '{key}' is not a string")]
    TraceNotString { key: String },

    /// Configured trace header is not a valid header name
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),
}

impl ProblemError {
    pub(crate) fn reserved(field: &str) -> Self {
        Self::ReservedField {
            field: field.to_owned(),
        }
    }
}
