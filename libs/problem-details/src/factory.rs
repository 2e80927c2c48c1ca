//! Problem construction with trace propagation from the request context.

use http::StatusCode;

use crate::config::ProblemsConfig;
use crate::context::RequestContext;
use crate::error::ProblemError;
use crate::problem::Problem;

/// Builds problems and stamps them with the request's trace identifier.
///
/// Immutable once built; share it by reference (usually `Arc<ProblemFactory>`)
/// across all request handling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProblemFactory {
    trace_key: Option<String>,
}

impl ProblemFactory {
    #[must_use]
    pub fn new(trace_key: Option<String>) -> Self {
        Self { trace_key }
    }

    /// Factory that reads trace identifiers from `trace_key`.
    #[must_use]
    pub fn with_trace_key(trace_key: impl Into<String>) -> Self {
        Self::new(Some(trace_key.into()))
    }

    #[must_use]
    pub fn from_config(cfg: &ProblemsConfig) -> Self {
        Self::new(cfg.trace_key.clone())
    }

    #[must_use]
    pub fn trace_key(&self) -> Option<&str> {
        self.trace_key.as_deref()
    }

    /// Build a problem and attach the trace found in `ctx`.
    ///
    /// # Panics
    /// Panics if `ctx` holds a non-string value under the trace key.
    pub fn create(
        &self,
        ctx: &RequestContext,
        type_url: impl Into<String>,
        title: impl Into<String>,
        status: StatusCode,
        detail: impl Into<String>,
    ) -> Problem {
        let mut problem = Problem::new(status, title, detail).with_type(type_url);
        self.attach_context(&mut problem, ctx);
        problem
    }

    /// Stamp the trace stored in `ctx` onto an already built problem.
    ///
    /// Repeated calls with the same context leave the problem unchanged.
    /// Without a configured trace key, or without a value in `ctx`, the
    /// problem's trace is left as is.
    ///
    /// # Panics
    /// Panics if `ctx` holds a non-string value under the trace key. Storing
    /// anything but a string there is a programming error.
    pub fn attach_context(&self, problem: &mut Problem, ctx: &RequestContext) {
        if let Err(e) = self.try_attach_context(problem, ctx) {
            panic!("{e}");
        }
    }

    /// Non-panicking form of [`ProblemFactory::attach_context`].
    ///
    /// # Errors
    /// Returns `ProblemError::TraceNotString` if the value under the trace key
    /// is not a string; the problem is left untouched.
    pub fn try_attach_context(
        &self,
        problem: &mut Problem,
        ctx: &RequestContext,
    ) -> Result<(), ProblemError> {
        let Some(key) = self.trace_key.as_deref() else {
            return Ok(());
        };
        if let Some(trace) = ctx.get_str(key)? {
            trace.clone_into(&mut problem.trace);
        }
        Ok(())
    }
}
