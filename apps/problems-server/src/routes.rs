use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};
use problem_details::{Problem, ProblemCollection, ProblemFactory, RecoveryLayer, RequestContext};

const OUT_OF_CREDIT_TYPE: &str = "https://example.com/probs/out-of-credit";
const OUT_OF_CREDIT_TITLE: &str = "You do not have enough credit";

const ITEM_NOT_FOUND_TYPE: &str = "https://example.com/probs/item-not-found";
const ITEM_NOT_FOUND_TITLE: &str = "Item not found";

async fn healthz() -> &'static str {
    "ok"
}

async fn panic_route() -> &'static str {
    panic!("panic requested by client")
}

async fn out_of_credit(
    Extension(factory): Extension<Arc<ProblemFactory>>,
    Extension(ctx): Extension<RequestContext>,
) -> Problem {
    let mut problem = factory
        .create(
            &ctx,
            OUT_OF_CREDIT_TYPE,
            OUT_OF_CREDIT_TITLE,
            StatusCode::FORBIDDEN,
            "Your current balance is 30, but that costs 50",
        )
        .with_instance("/account/12345/msgs/abc");
    if let Err(e) = problem.set_extension("balance", &30) {
        tracing::warn!(error = %e, "dropping balance extension");
    }
    tracing::info!(trace_id = %problem.trace, "rejecting purchase");
    problem
}

async fn batch(
    Extension(factory): Extension<Arc<ProblemFactory>>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    let problems: ProblemCollection = ["1", "2"]
        .iter()
        .map(|id| {
            factory
                .create(
                    &ctx,
                    ITEM_NOT_FOUND_TYPE,
                    ITEM_NOT_FOUND_TITLE,
                    StatusCode::NOT_FOUND,
                    format!("item {id} does not exist"),
                )
                .with_instance(format!("/items/{id}"))
        })
        .collect();

    match problems.to_response() {
        Ok(resp) => resp,
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize problem batch");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Demo routes wrapped in the recovery layer.
pub fn router(recovery: RecoveryLayer) -> Router {
    let factory = Arc::clone(recovery.factory());
    Router::new()
        .route("/healthz", get(healthz))
        .route("/panic", get(panic_route))
        .route("/credit", get(out_of_credit))
        .route("/batch", get(batch))
        .layer(Extension(factory))
        .layer(recovery)
}
