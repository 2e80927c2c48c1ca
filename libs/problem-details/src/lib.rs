//! RFC 7807 Problem Details for HTTP services
//!
//! This crate provides:
//! - the `Problem` entity with reserved-member validation and its wire format
//! - `ProblemCollection` for `207 Multi-Status` batches
//! - `ProblemFactory`, which stamps problems with a trace identifier taken
//!   from the request's `RequestContext`
//! - `RecoveryLayer`, a tower middleware that turns handler panics into
//!   `500` problem responses
//! - `parse_response` for reading problems back from responses
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod collection;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod parse;
pub mod problem;
pub mod recovery;

// Re-export commonly used types
pub use collection::ProblemCollection;
pub use config::ProblemsConfig;
pub use context::RequestContext;
pub use error::ProblemError;
pub use factory::ProblemFactory;
pub use parse::{parse_collection_response, parse_response};
pub use problem::{APPLICATION_PROBLEM_JSON, Problem, RESERVED_MEMBERS, is_reserved_member};
pub use recovery::{INTERNAL_ERROR_TITLE, RecoveryLayer, RecoveryService};
