//! Access log. One event per finished request; websocket upgrades are logged
//! as `ws_upgrade` and health checks only at debug.

use std::future::{ready, Ready};
use std::time::Instant;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::StatusCode;
use actix_web::{Error as ActixError, HttpMessage};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    HealthCheck,
    Ok,
    ClientFault,
    ServerFault,
}

fn classify(status: StatusCode, path: &str) -> Severity {
    if status.is_server_error() {
        Severity::ServerFault
    } else if status.is_client_error() {
        Severity::ClientFault
    } else if path == "/health" || path.starts_with("/health/") {
        Severity::HealthCheck
    } else {
        Severity::Ok
    }
}

fn event_kind(status: StatusCode) -> &'static str {
    if status == StatusCode::SWITCHING_PROTOCOLS {
        "ws_upgrade"
    } else {
        "request_completed"
    }
}

pub struct StructuredLogger;

impl<S, B> Transform<S, ServiceRequest> for StructuredLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type InitError = ();
    type Transform = StructuredLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StructuredLoggerMiddleware { service }))
    }
}

pub struct StructuredLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for StructuredLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().clone();
        let path = req.path().to_string();
        let peer = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("-")
            .to_string();
        let trace_id = req
            .extensions()
            .get::<String>()
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;

            let status = match &result {
                Ok(res) => res.status(),
                Err(err) => err.as_response_error().status_code(),
            };
            let kind = event_kind(status);
            let duration_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

            macro_rules! access {
                ($level:ident) => {
                    $level!(
                        kind,
                        http.method = %method,
                        url.path = %path,
                        http.status_code = status.as_u16(),
                        peer = %peer,
                        duration_us,
                        trace_id = %trace_id,
                        "{kind}"
                    )
                };
            }

            match classify(status, &path) {
                Severity::ServerFault => access!(error),
                Severity::ClientFault => access!(warn),
                Severity::HealthCheck => access!(debug),
                Severity::Ok => access!(info),
            }

            result
        })
    }
}
