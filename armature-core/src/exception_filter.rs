//! Fault-to-response rendering.
//!
//! The [`ExceptionHandler`] is the last stop for an error raised while a
//! request is handled: it is first asked to `report` the error, then to
//! `render` it into a response the client can read.
//!
//! ```
//! use armature_core::exception_filter::{DefaultExceptionHandler, ExceptionHandler};
//! use armature_core::{Error, HttpRequest};
//!
//! let handler = DefaultExceptionHandler::new();
//! let request = HttpRequest::new("GET".into(), "/".into()).with_header("Accept", "application/json");
//! let response = handler.render(&request, &Error::NotFound("No such user".into()));
//!
//! assert_eq!(response.status, 404);
//! ```

use crate::logging::{error, warn};
use crate::{Error, HttpRequest, HttpResponse};
use serde_json::json;

pub trait ExceptionHandler: Send + Sync {
    /// Record the error. The default logs server errors at error level and
    /// client errors at warn level.
    fn report(&self, err: &Error) {
        if err.is_server_error() {
            error!(kind = err.kind(), error = %err, "Unhandled error while handling request");
        } else {
            warn!(kind = err.kind(), error = %err, "Request failed");
        }
    }

    /// Turn the error into a response.
    fn render(&self, request: &HttpRequest, err: &Error) -> HttpResponse;
}

/// Renders JSON for clients that accept it and a minimal HTML page otherwise.
///
/// Outside debug mode server errors hide their message behind `"Server Error"`.
#[derive(Debug, Clone, Default)]
pub struct DefaultExceptionHandler {
    debug: bool,
}

impl DefaultExceptionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn public_message(&self, err: &Error) -> String {
        if err.is_server_error() && !self.debug {
            "Server Error".to_string()
        } else {
            err.message()
        }
    }
}

impl ExceptionHandler for DefaultExceptionHandler {
    fn render(&self, request: &HttpRequest, err: &Error) -> HttpResponse {
        let status = err.http_status();
        let message = self.public_message(err);

        if request.wants_json() {
            let mut body = json!({ "message": message });
            if self.debug {
                body["exception"] = json!(err.kind());
                body["path"] = json!(request.path_only());
            }
            let bytes = serde_json::to_vec(&body).unwrap_or_default();
            return HttpResponse::new(status.code())
                .with_header("Content-Type", "application/json")
                .with_body(bytes);
        }

        let page = format!(
            "<!DOCTYPE html><html><head><title>{code} {reason}</title></head>\
             <body><h1>{code} {reason}</h1><p>{message}</p></body></html>",
            code = status.code(),
            reason = status.reason(),
            message = message,
        );
        HttpResponse::new(status.code())
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body(page.into_bytes())
    }
}
