// Core library for the Armature HTTP framework
// Request/response model, routing, middleware, the kernel and its host services

pub mod application;
pub mod auth;
pub mod docs;
pub mod error;
pub mod exception_filter;
pub mod headers;
pub mod http;
pub mod kernel;
pub mod logging;
pub mod middleware;
pub mod routing;
pub mod status;

// Re-export commonly used types
pub use application::*;
pub use auth::*;
pub use docs::HandlerDocs;
pub use error::*;
pub use exception_filter::{DefaultExceptionHandler, ExceptionHandler};
pub use headers::HeaderMap;
pub use http::*;
pub use kernel::{HttpKernel, Kernel};
pub use middleware::*;
pub use routing::{HandlerRef, Route, RouteMiddleware, Router, handler_fn};
pub use status::*;
