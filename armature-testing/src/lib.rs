//! Testing utilities for Armature applications.
//!
//! - **TestAppBuilder / TestApp** - boot an application with routes, guards and docs
//! - **TestClient** - send requests through the application's kernel, in process
//! - **Mocks** - recording user provider, terminator and a deliberately faulty kernel
//! - **Assertions** - status, header and body checks
//!
//! ## Quick Start
//!
//! ```
//! use armature_testing::*;
//! use armature_core::HttpResponse;
//!
//! # tokio_test::block_on(async {
//! let app = TestAppBuilder::new()
//!     .with_route("/hello", |_req| async {
//!         Ok(HttpResponse::ok().with_body(b"Hello!".to_vec()))
//!     })
//!     .build();
//!
//! let client = app.client();
//! let response = client.get("/hello").await;
//! assert_eq!(response.status(), 200);
//! assert_eq!(response.body_string(), Some("Hello!".to_string()));
//! # });
//! ```
//!
//! ## Acting as a user
//!
//! ```
//! use armature_testing::*;
//! use armature_core::{HttpMethod, HttpResponse, Principal, Route, Authenticate};
//!
//! # tokio_test::block_on(async {
//! let app = TestAppBuilder::new()
//!     .alias_middleware("auth", Authenticate)
//!     .route(Route::get("/api/me", |req| async move {
//!         Ok(HttpResponse::text(req.user().map(|u| u.id.clone()).unwrap_or_default()))
//!     }).middleware("auth"))
//!     .build();
//!
//! let request = TestRequestBuilder::new(HttpMethod::GET, "/api/me")
//!     .acting_as(Principal::new("7"))
//!     .build();
//! let response = app.client().send(request).await;
//! assert_eq!(response.body_string(), Some("7".to_string()));
//! # });
//! ```

mod assertions;
mod mock;
mod test_app;
mod test_client;

pub use assertions::{assert_body_contains, assert_header, assert_json, assert_status};
pub use mock::{Fault, FaultyKernel, MockUserProvider, RecordingTerminator};
pub use test_app::{TestApp, TestAppBuilder};
pub use test_client::{TestClient, TestRequestBuilder, TestResponse};
