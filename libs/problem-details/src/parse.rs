//! Reading problems back from HTTP responses.

use bytes::Bytes;
use http::Response;
use http_body::Body as HttpBody;
use http_body_util::BodyExt;

use crate::collection::ProblemCollection;
use crate::error::{BoxError, ProblemError};
use crate::problem::Problem;

async fn read_body<B>(response: Response<B>) -> Result<Bytes, ProblemError>
where
    B: HttpBody,
    B::Error: Into<BoxError>,
{
    let (_parts, body) = response.into_parts();
    let collected = body
        .collect()
        .await
        .map_err(|e| ProblemError::Body(e.into()))?;
    Ok(collected.to_bytes())
}

/// Read the full response body and decode it as a single problem.
///
/// The status line and headers are not consulted; the document's own
/// `status` member is authoritative.
///
/// # Errors
/// Returns `ProblemError::Body` if reading the body fails.
/// Returns `ProblemError::Malformed` if the body is not a problem document.
pub async fn parse_response<B>(response: Response<B>) -> Result<Problem, ProblemError>
where
    B: HttpBody,
    B::Error: Into<BoxError>,
{
    let body = read_body(response).await?;
    Problem::from_json(&body)
}

/// Read the full response body and decode it as a multi-status batch.
///
/// # Errors
/// Returns `ProblemError::Body` if reading the body fails.
/// Returns `ProblemError::Malformed` if the body is not an array of problems.
pub async fn parse_collection_response<B>(
    response: Response<B>,
) -> Result<ProblemCollection, ProblemError>
where
    B: HttpBody,
    B::Error: Into<BoxError>,
{
    let body = read_body(response).await?;
    serde_json::from_slice(&body).map_err(ProblemError::Malformed)
}
