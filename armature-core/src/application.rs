// Application container: everything a host exposes to in-process tooling

use crate::auth::{AuthManager, UserProvider};
use crate::docs::HandlerDocs;
use crate::exception_filter::{DefaultExceptionHandler, ExceptionHandler};
use crate::kernel::{HttpKernel, Kernel};
use crate::logging::{LogConfig, info, warn};
use crate::middleware::{Middleware, MiddlewareChain, TerminableMiddleware};
use crate::{Route, Router};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

/// A booted host application.
///
/// Holds the route table, the kernel that serves requests, the guards used
/// to look up users, the handler documentation registry, and the exception
/// handler. All parts are shared, so cloning is cheap.
#[derive(Clone)]
pub struct Application {
    pub router: Arc<Router>,
    pub kernel: Arc<dyn HttpKernel>,
    pub auth: Arc<AuthManager>,
    pub docs: Arc<HandlerDocs>,
    pub exceptions: Arc<dyn ExceptionHandler>,
    /// Public base URL, e.g. `http://localhost`.
    pub url: String,
    /// Flushes buffered log lines when the last clone drops.
    log_guard: Option<Arc<WorkerGuard>>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn kernel(&self) -> &Arc<dyn HttpKernel> {
        &self.kernel
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    pub fn docs(&self) -> &HandlerDocs {
        &self.docs
    }

    /// Whether [`ApplicationBuilder::logging`] installed the global subscriber.
    pub fn logging_installed(&self) -> bool {
        self.log_guard.is_some()
    }

    pub fn exceptions(&self) -> &Arc<dyn ExceptionHandler> {
        &self.exceptions
    }
}

/// Builder for [`Application`].
pub struct ApplicationBuilder {
    router: Router,
    middleware: MiddlewareChain,
    terminators: Vec<Arc<dyn TerminableMiddleware>>,
    kernel: Option<Arc<dyn HttpKernel>>,
    auth: AuthManager,
    docs: HandlerDocs,
    exceptions: Option<Arc<dyn ExceptionHandler>>,
    debug: bool,
    url: String,
    logging: Option<LogConfig>,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self {
            router: Router::new(),
            middleware: MiddlewareChain::new(),
            terminators: Vec::new(),
            kernel: None,
            auth: AuthManager::new(),
            docs: HandlerDocs::new(),
            exceptions: None,
            debug: false,
            url: "http://localhost".to_string(),
            logging: None,
        }
    }
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Install the global log subscriber when the application is built.
    pub fn logging(mut self, config: LogConfig) -> Self {
        self.logging = Some(config);
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.router.add_route(route);
        self
    }

    /// Register middleware routes can refer to by name.
    pub fn alias_middleware<M: Middleware + 'static>(mut self, name: &str, middleware: M) -> Self {
        self.router.alias_middleware(name, middleware);
        self
    }

    /// Global middleware, run for every request before routing.
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.use_middleware(middleware);
        self
    }

    pub fn terminator(mut self, terminator: Arc<dyn TerminableMiddleware>) -> Self {
        self.terminators.push(terminator);
        self
    }

    /// Serve requests through a custom kernel instead of the default one.
    ///
    /// Global middleware and terminators given to this builder are ignored
    /// when a kernel is supplied.
    pub fn kernel(mut self, kernel: Arc<dyn HttpKernel>) -> Self {
        self.kernel = Some(kernel);
        self
    }

    pub fn guard<P: UserProvider + 'static>(mut self, name: &str, provider: P) -> Self {
        self.auth.register(name, Arc::new(provider));
        self
    }

    /// Document a controller method.
    pub fn document(mut self, controller: &str, method: &str, doc: Option<&str>) -> Self {
        self.docs.register(controller, method, doc);
        self
    }

    pub fn docs(mut self, docs: HandlerDocs) -> Self {
        self.docs = docs;
        self
    }

    pub fn exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.exceptions = Some(handler);
        self
    }

    pub fn build(self) -> Application {
        let log_guard = match self.logging {
            Some(config) => match config.init() {
                Ok(guard) => Some(Arc::new(guard)),
                Err(err) => {
                    warn!(error = %err, "Log subscriber not installed");
                    None
                }
            },
            None => None,
        };
        let router = Arc::new(self.router);
        let kernel: Arc<dyn HttpKernel> = match self.kernel {
            Some(kernel) => kernel,
            None => {
                let mut kernel = Kernel::new(router.clone()).with_chain(self.middleware);
                for terminator in self.terminators {
                    kernel = kernel.with_terminator(terminator);
                }
                Arc::new(kernel)
            }
        };
        let exceptions = self.exceptions.unwrap_or_else(|| {
            Arc::new(DefaultExceptionHandler::new().with_debug(self.debug))
        });

        info!(routes = router.routes().len(), url = %self.url, "Application booted");

        Application {
            router,
            kernel,
            auth: Arc::new(self.auth),
            docs: Arc::new(self.docs),
            exceptions,
            url: self.url,
            log_guard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{InMemoryUserProvider, Principal};
    use crate::{HttpRequest, HttpResponse};

    #[tokio::test]
    async fn test_builder_wires_kernel_to_routes() {
        let app = Application::builder()
            .route(Route::get("/api/ping", |_req| async { Ok(HttpResponse::text("pong")) }))
            .build();

        let res = app
            .kernel()
            .handle(HttpRequest::new("GET".into(), "/api/ping".into()))
            .await
            .unwrap();
        assert_eq!(res.body_string(), "pong");
        assert_eq!(app.router().routes().len(), 1);
        assert_eq!(app.url, "http://localhost");
    }

    #[tokio::test]
    async fn test_builder_registers_guards_and_docs() {
        let app = Application::builder()
            .guard("api", InMemoryUserProvider::new().with_user(Principal::new("7")))
            .document("UserController", "index", Some("List users."))
            .url("https://app.test")
            .build();

        assert!(app.auth().has_guard("api"));
        assert_eq!(app.docs().doc("UserController", "index"), Some("List users."));
        let user = app.auth().retrieve("api", "7").await.unwrap().unwrap();
        assert_eq!(user.guard.as_deref(), Some("api"));
    }
}
