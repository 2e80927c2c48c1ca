//! Multi-status batches of problems (RFC 4918 207 responses)

use axum::response::Response;
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::ProblemError;
use crate::problem::{Problem, problem_response};

/// Ordered sequence of problems reported together in one response.
///
/// The collection has no status of its own; its response is always
/// `207 Multi-Status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
#[must_use]
pub struct ProblemCollection {
    problems: Vec<Problem>,
}

impl ProblemCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.problems.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Problem> {
        self.problems.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Problem] {
        &self.problems
    }

    /// Encode the collection as a JSON array.
    ///
    /// # Errors
    /// Returns `ProblemError::ReservedField` if any element carries a reserved
    /// extension key; every element is checked before encoding starts.
    /// Returns `ProblemError::Serialization` if JSON encoding fails.
    pub fn to_json(&self) -> Result<Vec<u8>, ProblemError> {
        for problem in &self.problems {
            problem.validate_extensions()?;
        }
        serde_json::to_vec(&self.problems).map_err(ProblemError::Serialization)
    }

    /// Build a `207 Multi-Status` response regardless of the elements' statuses.
    ///
    /// # Errors
    /// Propagates any error from [`ProblemCollection::to_json`] or response assembly.
    pub fn to_response(&self) -> Result<Response, ProblemError> {
        let body = self.to_json()?;
        problem_response(StatusCode::MULTI_STATUS, body)
    }
}

impl From<Vec<Problem>> for ProblemCollection {
    fn from(problems: Vec<Problem>) -> Self {
        Self { problems }
    }
}

impl FromIterator<Problem> for ProblemCollection {
    fn from_iter<I: IntoIterator<Item = Problem>>(iter: I) -> Self {
        Self {
            problems: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ProblemCollection {
    type Item = Problem;
    type IntoIter = std::vec::IntoIter<Problem>;

    fn into_iter(self) -> Self::IntoIter {
        self.problems.into_iter()
    }
}

impl<'a> IntoIterator for &'a ProblemCollection {
    type Item = &'a Problem;
    type IntoIter = std::slice::Iter<'a, Problem>;

    fn into_iter(self) -> Self::IntoIter {
        self.problems.iter()
    }
}
