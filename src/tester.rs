// The API tester facade

use crate::auth::{AuthTypeOption, auth_types};
use crate::catalog::{RouteCatalog, RouteDescriptor};
use crate::config::ApiTesterConfig;
use crate::dispatch::{DispatchEngine, SimulatedResponse};
use crate::error::Result;
use crate::format::{FormattedResult, format};
use crate::ledger::{FileLedger, InvocationLedger, LedgerEntry, LedgerRecord};
use crate::synth::{Invocation, RequestSynthesizer};
use armature_core::Application;
use armature_core::logging::info;
use std::sync::Arc;

/// Lists an application's API routes and calls them in process.
///
/// ```
/// use armature_api_tester::{ApiTester, ApiTesterConfig, Invocation};
/// use armature_core::{Application, HttpResponse, Route};
///
/// # tokio_test::block_on(async {
/// let app = Application::builder()
///     .route(Route::get("/api/ping", |_req| async { Ok(HttpResponse::text("pong")) }))
///     .build();
/// let tester = ApiTester::new(app, ApiTesterConfig::default());
///
/// assert_eq!(tester.routes(None).len(), 1);
///
/// let result = tester.execute(&Invocation::new("GET", "/api/ping")).await.unwrap();
/// assert_eq!(result.status.code, 200);
/// assert_eq!(result.content, "pong");
/// # });
/// ```
pub struct ApiTester {
    app: Application,
    config: ApiTesterConfig,
    synthesizer: RequestSynthesizer,
    dispatcher: DispatchEngine,
    ledger: Option<Arc<dyn InvocationLedger>>,
}

impl ApiTester {
    /// A file ledger is opened when `config.ledger.enabled` is set.
    pub fn new(app: Application, config: ApiTesterConfig) -> Self {
        let ledger: Option<Arc<dyn InvocationLedger>> = if config.ledger.enabled {
            Some(Arc::new(
                FileLedger::new(&config.ledger.path).with_max_entries(config.ledger.max_entries),
            ))
        } else {
            None
        };

        let synthesizer = RequestSynthesizer::new(config.base_url.clone());
        let dispatcher = DispatchEngine::new(app.clone(), config.guard.clone())
            .with_user_retriever(config.user_retriever.clone());

        Self {
            app,
            config,
            synthesizer,
            dispatcher,
            ledger,
        }
    }

    /// Record calls in `ledger` instead of the configured one.
    pub fn with_ledger(mut self, ledger: Arc<dyn InvocationLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn config(&self) -> &ApiTesterConfig {
        &self.config
    }

    pub fn application(&self) -> &Application {
        &self.app
    }

    pub fn catalog(&self) -> RouteCatalog<'_> {
        RouteCatalog::new(self.app.router(), self.app.docs(), &self.config.prefix)
    }

    /// API routes, optionally ordered by a route field.
    pub fn routes(&self, sort: Option<&str>) -> Vec<RouteDescriptor> {
        match sort.filter(|field| !field.is_empty()) {
            Some(field) => self.catalog().sorted(field),
            None => self.catalog().list(),
        }
    }

    /// Build and dispatch one call.
    pub async fn call(&self, invocation: &Invocation) -> Result<SimulatedResponse> {
        let request = self.synthesizer.build(invocation)?;
        Ok(self
            .dispatcher
            .dispatch(request, invocation.auth.impersonate.as_deref())
            .await)
    }

    pub fn parse_response(&self, response: &SimulatedResponse) -> FormattedResult {
        format(response)
    }

    /// Call, format, and record in the ledger when one is configured.
    pub async fn execute(&self, invocation: &Invocation) -> Result<FormattedResult> {
        let request = self.synthesizer.build(invocation)?;
        let method = request.method;
        let record = LedgerRecord::new(
            method.as_str(),
            invocation.uri.trim(),
            &request.parameters,
            invocation.auth.impersonate.as_deref(),
        );

        let response = self
            .dispatcher
            .dispatch(request, invocation.auth.impersonate.as_deref())
            .await;
        let result = self.parse_response(&response);

        info!(
            method = %method,
            uri = %record.uri,
            status = result.status.code,
            "API tester call"
        );

        if let Some(ledger) = &self.ledger {
            ledger.record(&record).await;
        }

        Ok(result)
    }

    pub fn auth_types(&self) -> Vec<AuthTypeOption> {
        auth_types()
    }

    /// Recorded calls, newest first; empty without a ledger.
    pub async fn history(&self) -> Vec<LedgerEntry> {
        match &self.ledger {
            Some(ledger) => ledger.history().await,
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::ledger::MemoryLedger;
    use armature_core::{HttpResponse, Route};

    fn app() -> Application {
        Application::builder()
            .route(Route::get("/api/users", |req| async move {
                let page = req.query("page").cloned().unwrap_or_else(|| "1".into());
                HttpResponse::json(&serde_json::json!({ "page": page }))
            }))
            .route(Route::post("/api/users", |_req| async {
                Ok(HttpResponse::created().with_body(b"{\"message\":\"created\"}".to_vec()))
            }))
            .route(Route::get("/health", |_req| async { Ok(HttpResponse::ok()) }))
            .build()
    }

    #[test]
    fn test_routes_with_and_without_sort() {
        let tester = ApiTester::new(app(), ApiTesterConfig::default());

        let methods: Vec<&str> = tester.routes(None).iter().map(|r| r.method.as_str()).collect();
        assert_eq!(methods, vec!["GET", "POST"]);

        let sorted = tester.routes(Some("method"));
        assert_eq!(sorted.len(), 2);
        assert_eq!(tester.routes(Some("")).len(), 2);
    }

    #[tokio::test]
    async fn test_execute_get_with_query() {
        let tester = ApiTester::new(app(), ApiTesterConfig::default());
        let result = tester
            .execute(&Invocation::new("GET", "/api/users").param("page", "3"))
            .await
            .unwrap();

        assert_eq!(result.status.code, 200);
        assert_eq!(result.content, "{\n    \"page\": \"3\"\n}");
        assert_eq!(result.message, "success");
    }

    #[tokio::test]
    async fn test_execute_records_in_ledger() {
        let ledger = MemoryLedger::new();
        let tester = ApiTester::new(app(), ApiTesterConfig::default()).with_ledger(Arc::new(ledger.clone()));

        let result = tester
            .execute(&Invocation::new("post", "/api/users").param("name", "ada").acting_as("7"))
            .await
            .unwrap();
        assert_eq!(result.message, "created");

        let history = tester.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].method, "POST");
        assert_eq!(history[0].uri, "/api/users");
        assert_eq!(history[0].user.as_deref(), Some("7"));
        assert_eq!(history[0].parameters[0].name, "name");
    }

    #[tokio::test]
    async fn test_invalid_invocation_is_not_recorded() {
        let ledger = MemoryLedger::new();
        let tester = ApiTester::new(app(), ApiTesterConfig::default()).with_ledger(Arc::new(ledger.clone()));

        assert!(tester.execute(&Invocation::new("", "/api/users")).await.is_err());
        assert!(ledger.records().await.is_empty());
    }

    #[tokio::test]
    async fn test_file_ledger_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api-tester.json");
        let config = ApiTesterConfig::default().with_ledger(LedgerConfig {
            enabled: true,
            path: path.to_string_lossy().into_owned(),
            max_entries: None,
        });
        let tester = ApiTester::new(app(), config);

        tester.execute(&Invocation::new("GET", "/api/users")).await.unwrap();
        assert!(path.exists());
        assert_eq!(tester.history().await.len(), 1);
    }

    #[tokio::test]
    async fn test_history_without_ledger_is_empty() {
        let tester = ApiTester::new(app(), ApiTesterConfig::default());
        tester.execute(&Invocation::new("GET", "/api/users")).await.unwrap();
        assert!(tester.history().await.is_empty());
        assert_eq!(tester.auth_types().len(), 3);
    }
}
