//! Convert handler panics into `500` problem responses.
//!
//! [`RecoveryLayer`] wraps any HTTP service. When the wrapped service panics,
//! whether in its readiness check, while being called or while its response
//! future is polled, the panic is caught once at this boundary and answered with an
//! `application/problem+json` document built by the configured
//! [`ProblemFactory`]:
//!
//! - `type`: `Internal Server Error`
//! - `title`: `An internal server error occurred.`
//! - `status`: `500`
//! - `detail`: the panic message
//! - `instance`: the request path
//!
//! The request's [`RequestContext`] (taken from request extensions, optionally
//! seeded from a trace header) supplies the trace identifier, which is
//! written to the error log record. Panics are never re-raised.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::response::Response;
use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use http::{HeaderName, Request, StatusCode};
use http_body::Body as HttpBody;
use tower::{Layer, Service};

use crate::config::ProblemsConfig;
use crate::context::RequestContext;
use crate::error::{BoxError, ProblemError};
use crate::factory::ProblemFactory;
use crate::problem::{Problem, bare_problem_response};

/// Title of every problem produced by the recovery path.
pub const INTERNAL_ERROR_TITLE: &str = "An internal server error occurred.";

const UNKNOWN_PANIC: &str = "handler panicked with a non-string payload";

/// Extract a human-readable message from a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(err) = payload.downcast_ref::<BoxError>() {
        err.to_string()
    } else if let Some(err) = payload.downcast_ref::<Box<dyn std::error::Error + Send>>() {
        err.to_string()
    } else if let Some(err) = payload.downcast_ref::<std::io::Error>() {
        err.to_string()
    } else if let Some(err) = payload.downcast_ref::<ProblemError>() {
        err.to_string()
    } else {
        UNKNOWN_PANIC.to_owned()
    }
}

/// Tower layer that applies [`RecoveryService`]
#[derive(Debug, Clone)]
pub struct RecoveryLayer {
    factory: Arc<ProblemFactory>,
    trace_header: Option<HeaderName>,
}

impl RecoveryLayer {
    #[must_use]
    pub fn new(factory: Arc<ProblemFactory>) -> Self {
        Self {
            factory,
            trace_header: None,
        }
    }

    /// Seed the factory's trace key from this request header when the
    /// request context does not already carry a trace.
    #[must_use]
    pub fn with_trace_header(mut self, header: HeaderName) -> Self {
        self.trace_header = Some(header);
        self
    }

    /// Build the layer and its factory from configuration.
    ///
    /// # Errors
    /// Returns `ProblemError::InvalidHeaderName` if `trace_header` is not a
    /// valid header name.
    pub fn from_config(cfg: &ProblemsConfig) -> Result<Self, ProblemError> {
        let mut layer = Self::new(Arc::new(ProblemFactory::from_config(cfg)));
        if let Some(name) = cfg.trace_header.as_deref() {
            layer.trace_header = Some(HeaderName::from_bytes(name.as_bytes())?);
        }
        Ok(layer)
    }

    #[must_use]
    pub fn factory(&self) -> &Arc<ProblemFactory> {
        &self.factory
    }
}

impl<S> Layer<S> for RecoveryLayer {
    type Service = RecoveryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RecoveryService {
            inner,
            factory: Arc::clone(&self.factory),
            trace_header: self.trace_header.clone(),
            ready_panic: None,
        }
    }
}

/// Service that turns panics of the inner service into problem responses
#[derive(Debug, Clone)]
pub struct RecoveryService<S> {
    inner: S,
    factory: Arc<ProblemFactory>,
    trace_header: Option<HeaderName>,
    // Message of a panic raised by `poll_ready`, answered by the next `call`
    ready_panic: Option<String>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RecoveryService<S>
where
    S: Service<Request<ReqBody>, Response = http::Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: HttpBody<Data = Bytes> + Send + 'static,
    ResBody::Error: Into<BoxError>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Response, S::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.ready_panic.is_some() {
            return Poll::Ready(Ok(()));
        }
        match std::panic::catch_unwind(AssertUnwindSafe(|| self.inner.poll_ready(cx))) {
            Ok(poll) => poll,
            Err(payload) => {
                self.ready_panic = Some(panic_message(&*payload));
                Poll::Ready(Ok(()))
            }
        }
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let recovery = Recovery::capture(&self.factory, self.trace_header.as_ref(), &mut req);

        if let Some(message) = self.ready_panic.take() {
            return Box::pin(std::future::ready(Ok(recovery.respond(message))));
        }

        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| self.inner.call(req))) {
            Ok(future) => future,
            Err(payload) => {
                let resp = recovery.respond(panic_message(&*payload));
                return Box::pin(std::future::ready(Ok(resp)));
            }
        };

        Box::pin(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(res) => res.map(|resp| resp.map(Body::new)),
                Err(payload) => Ok(recovery.respond(panic_message(&*payload))),
            }
        })
    }
}

/// Per-request state needed to answer a panic.
struct Recovery {
    factory: Arc<ProblemFactory>,
    ctx: RequestContext,
    path: String,
}

impl Recovery {
    fn capture<B>(
        factory: &Arc<ProblemFactory>,
        trace_header: Option<&HeaderName>,
        req: &mut Request<B>,
    ) -> Self {
        let mut ctx = req
            .extensions()
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default();

        if let Some(header) = trace_header
            && let Some(key) = factory.trace_key()
            && !ctx.contains_key(key)
            && let Some(value) = req.headers().get(header).and_then(|v| v.to_str().ok())
        {
            ctx.insert(key, value.to_owned());
        }

        // Handlers see the same context the recovery path will use
        req.extensions_mut().insert(ctx.clone());

        Self {
            factory: Arc::clone(factory),
            ctx,
            path: req.uri().path().to_owned(),
        }
    }

    fn problem(self, message: String) -> Problem {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let mut problem = Problem::new(status, INTERNAL_ERROR_TITLE, message)
            .with_type(status.canonical_reason().unwrap_or_default());

        if let Err(e) = self.factory.try_attach_context(&mut problem, &self.ctx) {
            tracing::warn!(error = %e, path = %self.path, "trace not attached to recovery problem");
        }
        problem.instance = self.path;
        problem
    }

    fn respond(self, message: String) -> Response {
        let problem = self.problem(message);

        tracing::error!(
            path = %problem.instance,
            trace_id = %problem.trace,
            detail = %problem.detail,
            "request handler panicked"
        );

        match problem.to_response() {
            Ok(resp) => resp,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %problem.instance,
                    "failed to serialize recovery problem"
                );
                bare_problem_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}
