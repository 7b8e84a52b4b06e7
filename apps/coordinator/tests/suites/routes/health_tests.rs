use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use coordinator::infra::state::build_state;
use coordinator::middleware::RequestTrace;
use coordinator::routes;
use coordinator_test_support::problem_details::{assert_problem_response, ExpectedProblem};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::support::{FakeFailure, FakeGateway};

#[actix_web::test]
async fn health_reports_registry_sizes() -> Result<(), Box<dyn std::error::Error>> {
    let gateway = FakeGateway::new();
    let state = build_state().with_gateway(gateway.clone()).build()?;
    let (tx, _rx) = mpsc::unbounded_channel();
    state.coordinator.connect(Uuid::new_v4(), tx);

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .wrap(RequestTrace)
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["connections"], 1);
    assert_eq!(body["players"], 0);
    assert_eq!(body["games"], 0);
    assert!(body["app_version"].as_str().is_some_and(|v| !v.is_empty()));
    assert!(body["time"].as_str().is_some());

    // Liveness never calls the backend.
    assert!(gateway.calls().is_empty());
    Ok(())
}

#[actix_web::test]
async fn ready_checks_the_backend() -> Result<(), Box<dyn std::error::Error>> {
    let gateway = FakeGateway::new();
    let state = build_state().with_gateway(gateway.clone()).build()?;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .wrap(RequestTrace)
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/health/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["backend"], "ok");

    gateway.fail_next("health_check", FakeFailure::Unreachable);
    let req = test::TestRequest::get().uri("/health/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_response(
        resp,
        ExpectedProblem {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "BACKEND_UNREACHABLE",
            detail_contains: None,
        },
    )
    .await;

    gateway.fail_next("health_check", FakeFailure::Garbage);
    let req = test::TestRequest::get().uri("/health/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_problem_response(
        resp,
        ExpectedProblem {
            status: StatusCode::BAD_GATEWAY,
            code: "BACKEND_PROTOCOL",
            detail_contains: Some("health_check"),
        },
    )
    .await;

    assert_eq!(gateway.count_calls("health_check"), 3);
    Ok(())
}

#[actix_web::test]
async fn incoming_request_id_is_echoed() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state().with_gateway(FakeGateway::new()).build()?;
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .wrap(RequestTrace)
            .configure(routes::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("x-request-id", "req-42"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.headers().get("x-request-id").unwrap(), "req-42");
    assert_eq!(resp.headers().get("x-trace-id").unwrap(), "req-42");
    Ok(())
}
