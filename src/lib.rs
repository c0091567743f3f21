//! In-process API tester for Armature applications.
//!
//! Lists an application's API routes, with parameter metadata mined from
//! handler documentation, and calls any of them through the application's
//! own kernel without opening a socket.
//!
//! - **Route catalog** - API routes of the live router, optionally sorted
//! - **Parameter parser** - `@SWG\Parameter(...)` stanzas from handler docs
//! - **Request synthesizer** - method, URI, parameters and auth to a request
//! - **Dispatch engine** - kernel handle and terminate, faults rendered, user impersonation
//! - **Response formatter** - pretty JSON, headers, cookies and a summary message
//! - **Invocation ledger** - optional history of calls made
//!
//! ## Quick Start
//!
//! ```
//! use armature_api_tester::prelude::*;
//! use armature_core::{Application, HttpResponse, Route};
//!
//! # tokio_test::block_on(async {
//! let app = Application::builder()
//!     .route(
//!         Route::get("/api/users", |_req| async {
//!             HttpResponse::json(&serde_json::json!({ "message": "listed", "data": [] }))
//!         })
//!         .name("users.index")
//!         .action("UserController@index"),
//!     )
//!     .document("UserController", "index", Some("@SWG\\Parameter(\n  name=\"page\",\n  in=\"query\",\n)"))
//!     .build();
//!
//! let tester = ApiTester::new(app, ApiTesterConfig::default());
//!
//! let routes = tester.routes(None);
//! assert_eq!(routes[0].uri, "api/users");
//! assert_eq!(routes[0].parameters[0].name(), "page");
//!
//! let invocation = Invocation::new("GET", "/api/users")
//!     .param("page", "2")
//!     .auth(AuthMode::BearerToken { token: "secret".into() });
//! let result = tester.execute(&invocation).await.unwrap();
//!
//! assert_eq!(result.status.code, 200);
//! assert_eq!(result.message, "listed");
//! # });
//! ```

pub mod auth;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod doc_params;
pub mod error;
pub mod format;
pub mod ledger;
pub mod synth;
pub mod tester;

pub use auth::{AuthDirective, AuthMode, AuthTypeOption, auth_types};
pub use catalog::{RouteCatalog, RouteDescriptor, SortField, method_accent, resolve_parameters};
pub use config::{ApiTesterConfig, LedgerConfig, UserRetriever};
pub use controller::{ApiTesterController, IndexPayload};
pub use dispatch::{DispatchEngine, SimulatedResponse};
pub use doc_params::{ParameterDescriptor, extract_parameters};
pub use error::{ApiTesterError, LedgerError, Result};
pub use format::{FormattedResult, StatusLine, format, pretty_json};
pub use ledger::{
    FileLedger, InvocationLedger, LedgerEntry, LedgerParameter, LedgerRecord, MemoryLedger,
};
pub use synth::{Invocation, ParamValue, RequestSynthesizer, SyntheticRequest};
pub use tester::ApiTester;

pub mod prelude {
    pub use crate::auth::{AuthDirective, AuthMode};
    pub use crate::config::ApiTesterConfig;
    pub use crate::controller::ApiTesterController;
    pub use crate::error::{ApiTesterError, Result};
    pub use crate::ledger::{FileLedger, InvocationLedger, MemoryLedger};
    pub use crate::synth::{Invocation, ParamValue};
    pub use crate::tester::ApiTester;
}
