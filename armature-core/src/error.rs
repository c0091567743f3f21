// Error types for the Armature framework

use crate::HttpStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable Entity: {0}")]
    UnprocessableEntity(String),

    #[error("Too Many Requests: {0}")]
    TooManyRequests(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),

    /// A handler or middleware panicked while serving the request.
    #[error("Handler panicked: {0}")]
    Panic(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.http_status().code()
    }

    pub fn http_status(&self) -> HttpStatus {
        match self {
            Error::RouteNotFound(_) | Error::NotFound(_) => HttpStatus::NotFound,
            Error::MethodNotAllowed(_) => HttpStatus::MethodNotAllowed,
            Error::Validation(_) | Error::Deserialization(_) | Error::BadRequest(_) => {
                HttpStatus::BadRequest
            }
            Error::Unauthorized(_) => HttpStatus::Unauthorized,
            Error::Forbidden(_) => HttpStatus::Forbidden,
            Error::Conflict(_) => HttpStatus::Conflict,
            Error::UnprocessableEntity(_) => HttpStatus::UnprocessableEntity,
            Error::TooManyRequests(_) => HttpStatus::TooManyRequests,
            Error::ServiceUnavailable(_) => HttpStatus::ServiceUnavailable,
            Error::Serialization(_) | Error::Panic(_) | Error::Internal(_) | Error::Io(_) => {
                HttpStatus::InternalServerError
            }
        }
    }

    /// Short variant name, used by exception handlers in debug mode.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::RouteNotFound(_) => "RouteNotFound",
            Error::MethodNotAllowed(_) => "MethodNotAllowed",
            Error::Serialization(_) => "Serialization",
            Error::Deserialization(_) => "Deserialization",
            Error::Validation(_) => "Validation",
            Error::BadRequest(_) => "BadRequest",
            Error::Unauthorized(_) => "Unauthorized",
            Error::Forbidden(_) => "Forbidden",
            Error::NotFound(_) => "NotFound",
            Error::Conflict(_) => "Conflict",
            Error::UnprocessableEntity(_) => "UnprocessableEntity",
            Error::TooManyRequests(_) => "TooManyRequests",
            Error::ServiceUnavailable(_) => "ServiceUnavailable",
            Error::Panic(_) => "Panic",
            Error::Internal(_) => "Internal",
            Error::Io(_) => "Io",
        }
    }

    /// The message carried by the error, without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Error::RouteNotFound(m)
            | Error::MethodNotAllowed(m)
            | Error::Serialization(m)
            | Error::Deserialization(m)
            | Error::Validation(m)
            | Error::BadRequest(m)
            | Error::Unauthorized(m)
            | Error::Forbidden(m)
            | Error::NotFound(m)
            | Error::Conflict(m)
            | Error::UnprocessableEntity(m)
            | Error::TooManyRequests(m)
            | Error::ServiceUnavailable(m)
            | Error::Panic(m)
            | Error::Internal(m) => m.clone(),
            Error::Io(e) => e.to_string(),
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::RouteNotFound("GET /x".into()).status_code(), 404);
        assert_eq!(Error::Unauthorized("no user".into()).status_code(), 401);
        assert_eq!(Error::Validation("bad".into()).status_code(), 400);
        assert_eq!(Error::Panic("boom".into()).status_code(), 500);
    }

    #[test]
    fn test_error_classes() {
        assert!(Error::BadRequest("x".into()).is_client_error());
        assert!(Error::Internal("x".into()).is_server_error());
        assert_eq!(Error::Forbidden("x".into()).kind(), "Forbidden");
        assert_eq!(Error::Unauthorized("Unauthenticated.".into()).message(), "Unauthenticated.");
    }
}
