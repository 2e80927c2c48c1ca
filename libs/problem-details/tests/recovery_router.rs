#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Drives `RecoveryLayer` through a real axum router and reads the
//! responses back with `parse_response`.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use problem_details::{
    APPLICATION_PROBLEM_JSON, INTERNAL_ERROR_TITLE, Problem, ProblemCollection, ProblemFactory,
    ProblemsConfig, RecoveryLayer, RequestContext, parse_collection_response, parse_response,
};
use tower::ServiceExt;

const TRACE_KEY: &str = "trace-id";

async fn boom() -> &'static str {
    panic!("test error")
}

async fn boom_owned() -> &'static str {
    let id = 7;
    panic!("order {id} vanished")
}

async fn fine() -> &'static str {
    "fine"
}

async fn out_of_credit(
    Extension(factory): Extension<Arc<ProblemFactory>>,
    Extension(ctx): Extension<RequestContext>,
) -> impl IntoResponse {
    let mut problem = factory.create(
        &ctx,
        "https://example.com/probs/out-of-credit",
        "You do not have enough credit",
        StatusCode::FORBIDDEN,
        "Your current balance is 30, but that costs 50",
    );
    problem.set_extension("balance", &30).expect("valid extension");
    let trace = problem.trace.clone();
    problem.set_extension("seen_trace", &trace).expect("valid extension");
    problem
}

async fn batch() -> impl IntoResponse {
    let problems: ProblemCollection = [
        Problem::new(StatusCode::NOT_FOUND, "Not Found", "item 1 missing"),
        Problem::new(StatusCode::OK, "OK", "item 2 stored"),
    ]
    .into_iter()
    .collect();
    problems.to_response().expect("valid collection")
}

fn app(cfg: &ProblemsConfig) -> Result<Router> {
    let layer = RecoveryLayer::from_config(cfg)?;
    let factory = Arc::clone(layer.factory());
    Ok(Router::new()
        .route("/test", get(boom))
        .route("/owned", get(boom_owned))
        .route("/fine", get(fine))
        .route("/credit", get(out_of_credit))
        .route("/batch", get(batch))
        .layer(Extension(factory))
        .layer(layer))
}

fn traced_config() -> ProblemsConfig {
    ProblemsConfig {
        trace_key: Some(TRACE_KEY.to_owned()),
        trace_header: Some("x-request-id".to_owned()),
    }
}

fn get_request(uri: &str) -> Result<Request<Body>> {
    Ok(Request::builder().uri(uri).body(Body::empty())?)
}

#[tokio::test]
async fn panicking_handler_yields_internal_error_problem() -> Result<()> {
    let factory = ProblemFactory::default();
    let res = app(&ProblemsConfig::default())?
        .oneshot(get_request("/test")?)
        .await?;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).unwrap(),
        APPLICATION_PROBLEM_JSON
    );

    let mut expected = factory.create(
        &RequestContext::new(),
        "Internal Server Error",
        INTERNAL_ERROR_TITLE,
        StatusCode::INTERNAL_SERVER_ERROR,
        "test error",
    );
    expected.instance = "/test".to_owned();

    let actual = parse_response(res).await?;
    assert_eq!(actual, expected);
    assert_eq!(actual.title, "An internal server error occurred.");
    assert_eq!(actual.type_url, "Internal Server Error");
    Ok(())
}

#[tokio::test]
async fn formatted_panic_message_becomes_detail() -> Result<()> {
    let res = app(&ProblemsConfig::default())?
        .oneshot(get_request("/owned")?)
        .await?;

    let problem = parse_response(res).await?;
    assert_eq!(problem.detail, "order 7 vanished");
    assert_eq!(problem.instance, "/owned");
    Ok(())
}

#[tokio::test]
async fn healthy_handler_is_untouched() -> Result<()> {
    let res = app(&traced_config())?
        .oneshot(get_request("/fine")?)
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body = axum::body::to_bytes(res.into_body(), usize::MAX).await?;
    assert_eq!(&body[..], b"fine");
    Ok(())
}

#[tokio::test]
async fn recovered_router_keeps_serving() -> Result<()> {
    let router = app(&ProblemsConfig::default())?;

    let first = router.clone().oneshot(get_request("/test")?).await?;
    assert_eq!(first.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let second = router.oneshot(get_request("/fine")?).await?;
    assert_eq!(second.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn handler_problem_uses_header_seeded_trace() -> Result<()> {
    let req = Request::builder()
        .uri("/credit")
        .header("x-request-id", "00000000-0000-0000-0000-000000000000")
        .body(Body::empty())?;
    let res = app(&traced_config())?.oneshot(req).await?;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let problem = parse_response(res).await?;
    assert_eq!(problem.title, "You do not have enough credit");
    assert_eq!(problem.extension("balance"), Some(&serde_json::json!(30)));
    assert_eq!(
        problem.extension("seen_trace"),
        Some(&serde_json::json!("00000000-0000-0000-0000-000000000000"))
    );
    assert!(problem.trace.is_empty(), "trace never travels on the wire");
    Ok(())
}

#[tokio::test]
async fn without_trace_key_header_is_ignored() -> Result<()> {
    let cfg = ProblemsConfig {
        trace_key: None,
        trace_header: Some("x-request-id".to_owned()),
    };
    let req = Request::builder()
        .uri("/credit")
        .header("x-request-id", "abc")
        .body(Body::empty())?;
    let res = app(&cfg)?.oneshot(req).await?;

    let problem = parse_response(res).await?;
    assert_eq!(problem.extension("seen_trace"), Some(&serde_json::json!("")));
    Ok(())
}

#[tokio::test]
async fn batch_is_multi_status() -> Result<()> {
    let res = app(&ProblemsConfig::default())?
        .oneshot(get_request("/batch")?)
        .await?;

    assert_eq!(res.status(), StatusCode::MULTI_STATUS);
    let problems = parse_collection_response(res).await?;
    assert_eq!(problems.len(), 2);
    let statuses: Vec<u16> = problems.iter().map(|p| p.status.as_u16()).collect();
    assert_eq!(statuses, vec![404, 200]);
    Ok(())
}
