//! HTTP endpoints for the tester.
//!
//! [`ApiTesterController`] serves two routes on the host application:
//!
//! - `GET /api-tester` lists routes, auth modes and call history. The
//!   optional `_sort` query parameter orders the routes.
//! - `POST /api-tester/handle` runs one call from a submitted form and
//!   returns the formatted result.
//!
//! The routes are mounted before the application is built, and the
//! controller is bound to the built application afterwards:
//!
//! ```
//! use armature_api_tester::{ApiTesterConfig, ApiTesterController};
//! use armature_core::Application;
//!
//! let controller = ApiTesterController::new(ApiTesterConfig::default());
//! let app = controller.attach(Application::builder()).build();
//! controller.bind(app);
//!
//! assert!(controller.tester().is_some());
//! ```
//!
//! The handle form carries `method`, `uri`, `user`, `auth_type` and its
//! credential fields, plus parameters as parallel `key[i]` / `val[i]` arrays.

use crate::auth::{AuthDirective, AuthTypeOption};
use crate::catalog::RouteDescriptor;
use crate::config::ApiTesterConfig;
use crate::error::{ApiTesterError, Result};
use crate::format::FormattedResult;
use crate::ledger::{InvocationLedger, LedgerEntry};
use crate::synth::{Invocation, ParamValue};
use crate::tester::ApiTester;
use armature_core::logging::debug;
use armature_core::{
    Application, ApplicationBuilder, Error, HttpRequest, HttpResponse, Route, Router, UploadedFile,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use url::form_urlencoded;

pub const INDEX_PATH: &str = "/api-tester";
pub const HANDLE_PATH: &str = "/api-tester/handle";

#[derive(Debug, Clone, Serialize)]
pub struct IndexPayload {
    pub routes: Vec<RouteDescriptor>,
    pub auth_types: Vec<AuthTypeOption>,
    pub logs: Vec<LedgerEntry>,
}

#[derive(Clone)]
pub struct ApiTesterController {
    config: ApiTesterConfig,
    ledger: Option<Arc<dyn InvocationLedger>>,
    slot: Arc<OnceLock<ApiTester>>,
}

impl ApiTesterController {
    pub fn new(config: ApiTesterConfig) -> Self {
        Self {
            config,
            ledger: None,
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// A controller already bound to `tester`.
    pub fn for_tester(tester: ApiTester) -> Self {
        Self {
            config: tester.config().clone(),
            ledger: None,
            slot: Arc::new(OnceLock::from(tester)),
        }
    }

    /// Ledger to use once bound, instead of the configured one.
    pub fn with_ledger(mut self, ledger: Arc<dyn InvocationLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Bind to the built application. Returns `false` if already bound.
    pub fn bind(&self, app: Application) -> bool {
        let mut tester = ApiTester::new(app, self.config.clone());
        if let Some(ledger) = &self.ledger {
            tester = tester.with_ledger(ledger.clone());
        }
        self.slot.set(tester).is_ok()
    }

    pub fn tester(&self) -> Option<&ApiTester> {
        self.slot.get()
    }

    fn bound(&self) -> std::result::Result<&ApiTester, Error> {
        self.tester().ok_or_else(|| {
            Error::ServiceUnavailable("API tester is not bound to an application".to_string())
        })
    }

    pub async fn index(&self, sort: Option<&str>) -> std::result::Result<IndexPayload, Error> {
        let tester = self.bound()?;
        Ok(IndexPayload {
            routes: tester.routes(sort),
            auth_types: tester.auth_types(),
            logs: tester.history().await,
        })
    }

    /// Run the call described by a submitted form.
    pub async fn handle(&self, form: &[(String, String)]) -> std::result::Result<FormattedResult, Error> {
        self.handle_upload(form, &[]).await
    }

    /// Like [`handle`](Self::handle); uploads named `val[i]` become file parameters.
    pub async fn handle_upload(
        &self,
        form: &[(String, String)],
        files: &[(String, UploadedFile)],
    ) -> std::result::Result<FormattedResult, Error> {
        let invocation = invocation_from_form(form, files)?;
        let tester = self.bound()?;
        Ok(tester.execute(&invocation).await?)
    }

    /// The two tester routes, bound to this controller.
    pub fn routes(&self) -> Vec<Route> {
        let index = self.clone();
        let handle = self.clone();

        vec![
            Route::get(INDEX_PATH, move |req: HttpRequest| {
                let controller = index.clone();
                async move {
                    let payload = controller.index(req.query("_sort").map(String::as_str)).await?;
                    HttpResponse::json(&payload)
                }
            })
            .name("api-tester.index")
            .action("ApiTesterController@index"),
            Route::post(HANDLE_PATH, move |req: HttpRequest| {
                let controller = handle.clone();
                async move {
                    let form = form_fields(&req);
                    let result = controller.handle_upload(&form, &req.files).await?;
                    HttpResponse::json(&result)
                }
            })
            .name("api-tester.handle")
            .action("ApiTesterController@handle"),
        ]
    }

    pub fn mount(&self, router: &mut Router) {
        for route in self.routes() {
            router.add_route(route);
        }
    }

    /// [`mount`](Self::mount) for an application still being built.
    pub fn attach(&self, mut builder: ApplicationBuilder) -> ApplicationBuilder {
        for route in self.routes() {
            builder = builder.route(route);
        }
        builder
    }
}

/// Decoded form fields, reading a urlencoded body when nothing decoded it yet.
fn form_fields(req: &HttpRequest) -> Vec<(String, String)> {
    if !req.form.is_empty() || req.body.is_empty() {
        return req.form.clone();
    }
    form_urlencoded::parse(&req.body).into_owned().collect()
}

/// Read an [`Invocation`] from handle form fields.
pub fn invocation_from_form(
    form: &[(String, String)],
    files: &[(String, UploadedFile)],
) -> Result<Invocation> {
    let field = |name: &str| {
        form.iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };

    let method = field("method").map(str::trim).unwrap_or_default();
    let uri = field("uri").map(str::trim).unwrap_or_default();
    if method.is_empty() || uri.is_empty() {
        return Err(ApiTesterError::InvalidInvocation(
            "Method and URI are required.".to_string(),
        ));
    }

    let mut invocation = Invocation::new(method, uri).with_auth(AuthDirective::from_fields(field));
    for (name, value) in parameter_pairs(form, files) {
        invocation = invocation.param(name, value);
    }
    Ok(invocation)
}

/// Pair `key[i]` with `val[i]`, in index order, dropping blank keys.
fn parameter_pairs(form: &[(String, String)], files: &[(String, UploadedFile)]) -> Vec<(String, ParamValue)> {
    let keys = indexed(form.iter().map(|(k, v)| (k.as_str(), v.clone())), "key");
    let mut values: BTreeMap<usize, ParamValue> = indexed(form.iter().map(|(k, v)| (k.as_str(), v.clone())), "val")
        .into_iter()
        .map(|(index, value)| (index, ParamValue::Text(value)))
        .collect();
    for (index, file) in indexed(files.iter().map(|(k, f)| (k.as_str(), f.clone())), "val") {
        values.insert(index, ParamValue::File(file));
    }

    keys.into_iter()
        .filter_map(|(index, key)| {
            let key = key.trim().to_string();
            if key.is_empty() {
                debug!(index, "Skipping parameter without a name");
                return None;
            }
            let value = values
                .remove(&index)
                .unwrap_or_else(|| ParamValue::Text(String::new()));
            Some((key, value))
        })
        .collect()
}

/// Entries named `array[i]` (or `array[]`, numbered in order of appearance), sorted by index.
fn indexed<'a, T>(entries: impl Iterator<Item = (&'a str, T)>, array: &str) -> BTreeMap<usize, T> {
    let mut out = BTreeMap::new();
    let mut next = 0;
    for (name, value) in entries {
        let Some(index) = name
            .strip_prefix(array)
            .and_then(|rest| rest.strip_prefix('['))
            .and_then(|rest| rest.strip_suffix(']'))
        else {
            continue;
        };
        let index = if index.is_empty() {
            next
        } else {
            match index.parse::<usize>() {
                Ok(index) => index,
                Err(_) => continue,
            }
        };
        let Some(following) = index.checked_add(1) else {
            continue;
        };
        next = next.max(following);
        out.insert(index, value);
    }
    out
}
