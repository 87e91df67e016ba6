//! Turns a handler's outcome into a `(body, status)` pair.
//!
//! Client errors keep their message; server errors answer with a fixed
//! message and leave the detail in the logs. Panics count as unexpected
//! errors, so nothing escapes [`dispatch`].

use std::any::Any;
use std::backtrace::BacktraceStatus;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::FutureExt;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::core::{ServiceError, UnexpectedError};

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub body: Value,
    pub status: StatusCode,
}

impl DispatchResult {
    pub fn new(body: Value, status: StatusCode) -> Self {
        Self { body, status }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(body, StatusCode::OK)
    }

    fn error(status: StatusCode, detail: impl serde::Serialize) -> Self {
        Self::new(json!({ "error": detail }), status)
    }
}

impl IntoResponse for DispatchResult {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub type HandlerResult = Result<DispatchResult, ServiceError>;

/// Runs `handler` and normalises whatever it produces.
///
/// `name` identifies the handler in logs.
pub async fn dispatch<F, Fut>(name: &str, handler: F) -> DispatchResult
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = HandlerResult>,
{
    info!(handler = name, "handling request");
    let outcome = AssertUnwindSafe(async move { handler().await })
        .catch_unwind()
        .await;
    settle(name, outcome)
}

fn settle(name: &str, outcome: Result<HandlerResult, Box<dyn Any + Send>>) -> DispatchResult {
    match outcome {
        Ok(Ok(result)) => {
            debug!(
                handler = name,
                status = result.status.as_u16(),
                body = %result.body,
                "handler succeeded"
            );
            result
        }
        Ok(Err(err)) => translate(name, err),
        Err(payload) => {
            let message = format!("handler panicked: {}", panic_message(&*payload));
            translate(name, ServiceError::Unexpected(UnexpectedError::from_panic(message)))
        }
    }
}

fn translate(name: &str, err: ServiceError) -> DispatchResult {
    match err {
        ServiceError::Validation(detail) => {
            warn!(handler = name, error = %detail, "validation error");
            DispatchResult::error(StatusCode::BAD_REQUEST, detail)
        }
        ServiceError::Authentication(message) => {
            warn!(handler = name, error = %message, "authentication error");
            DispatchResult::error(StatusCode::UNAUTHORIZED, message)
        }
        ServiceError::Authorization(message) => {
            warn!(handler = name, error = %message, "authorization error");
            DispatchResult::error(StatusCode::FORBIDDEN, message)
        }
        ServiceError::Database(message) => {
            error!(handler = name, error = %message, "database error");
            DispatchResult::error(StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
        }
        ServiceError::Unexpected(err) => {
            if err.backtrace().status() == BacktraceStatus::Captured {
                error!(
                    handler = name,
                    error = %err,
                    backtrace = %err.backtrace(),
                    "unexpected error"
                );
            } else {
                // The unwind has already left the panic site; the panic hook
                // reported its location on stderr.
                error!(
                    handler = name,
                    error = %err,
                    "unexpected error, panic location in panic hook output"
                );
            }
            DispatchResult::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
