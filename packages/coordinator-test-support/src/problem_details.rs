//! Assertions for `application/problem+json` error bodies.
//!
//! The helpers only know the wire shape, so integration tests can check the
//! error contract without importing the coordinator's error types.

use actix_web::body::BoxBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::header::HeaderMap;
use actix_web::http::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ProblemBody {
    #[serde(rename = "type")]
    type_: String,
    title: String,
    status: u16,
    detail: String,
    code: String,
    trace_id: String,
}

/// Expected contents of a problem response.
#[derive(Debug, Clone, Copy)]
pub struct ExpectedProblem<'a> {
    pub status: StatusCode,
    pub code: &'a str,
    pub detail_contains: Option<&'a str>,
}

/// Check status, code, detail and that the body `trace_id` matches the
/// `x-trace-id` response header.
pub fn assert_problem_parts(
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
    expected: ExpectedProblem<'_>,
) {
    assert_eq!(status, expected.status, "unexpected HTTP status");

    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(
        content_type.starts_with("application/problem+json"),
        "expected problem+json content type, got '{content_type}'"
    );

    let problem: ProblemBody =
        serde_json::from_slice(body).expect("body should be problem+json");

    let header_trace = headers
        .get("x-trace-id")
        .expect("x-trace-id header should be present")
        .to_str()
        .expect("x-trace-id should be ascii");
    assert_eq!(problem.trace_id, header_trace, "trace id mismatch");

    assert_eq!(problem.code, expected.code);
    assert_eq!(problem.status, expected.status.as_u16());
    assert!(
        problem.type_.ends_with(&problem.code.to_ascii_lowercase().replace('_', "-")),
        "type '{}' should end with the code slug",
        problem.type_
    );
    assert!(!problem.title.is_empty(), "title should not be empty");

    if let Some(fragment) = expected.detail_contains {
        assert!(
            problem.detail.contains(fragment),
            "expected detail to contain '{fragment}', got '{}'",
            problem.detail
        );
    }
}

/// Same as [`assert_problem_parts`] for a `ServiceResponse` from `actix_web::test`.
pub async fn assert_problem_response(resp: ServiceResponse<BoxBody>, expected: ExpectedProblem<'_>) {
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = actix_web::test::read_body(resp).await;
    assert_problem_parts(status, &headers, &body, expected);
}
