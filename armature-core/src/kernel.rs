//! The HTTP kernel: the single entry point requests go through.
//!
//! `handle` runs global middleware and then the router. `terminate` is
//! called once the response has been produced and gives terminable
//! middleware (session writers, deferred loggers, ...) a chance to finish.
//!
//! ```
//! use armature_core::{HttpKernel, HttpRequest, HttpResponse, Kernel, Route, Router};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let router = Router::new().with_route(Route::get("/health", |_req| async {
//!     Ok(HttpResponse::text("up"))
//! }));
//! let kernel = Kernel::new(Arc::new(router));
//!
//! let request = HttpRequest::new("GET".into(), "/health".into());
//! let response = kernel.handle(request.clone()).await.unwrap();
//! kernel.terminate(&request, &response).await;
//!
//! assert_eq!(response.body_string(), "up");
//! # });
//! ```

use crate::logging::debug;
use crate::middleware::{BoxFuture, HandlerFn, Middleware, MiddlewareChain, TerminableMiddleware};
use crate::{Error, HttpRequest, HttpResponse, Router};
use async_trait::async_trait;
use std::sync::Arc;

/// Request pipeline of a host application.
#[async_trait]
pub trait HttpKernel: Send + Sync {
    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, Error>;

    /// Called after every `handle`, including when the response came from an
    /// exception handler.
    async fn terminate(&self, request: &HttpRequest, response: &HttpResponse);
}

/// Default kernel: global middleware around the router.
pub struct Kernel {
    router: Arc<Router>,
    middleware: MiddlewareChain,
    terminators: Vec<Arc<dyn TerminableMiddleware>>,
}

impl Kernel {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            middleware: MiddlewareChain::new(),
            terminators: Vec::new(),
        }
    }

    pub fn with_middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.use_middleware(middleware);
        self
    }

    /// Replace the global middleware chain.
    pub fn with_chain(mut self, chain: MiddlewareChain) -> Self {
        self.middleware = chain;
        self
    }

    pub fn with_terminator(mut self, terminator: Arc<dyn TerminableMiddleware>) -> Self {
        self.terminators.push(terminator);
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }
}

#[async_trait]
impl HttpKernel for Kernel {
    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let router = self.router.clone();
        let dispatch: HandlerFn = Arc::new(move |req: HttpRequest| -> BoxFuture {
            let router = router.clone();
            Box::pin(async move { router.route(req).await })
        });
        self.middleware.apply(request, dispatch).await
    }

    async fn terminate(&self, request: &HttpRequest, response: &HttpResponse) {
        debug!(
            terminators = self.terminators.len(),
            status = response.status,
            path = %request.path,
            "Terminating request"
        );
        for terminator in &self.terminators {
            terminator.terminate(request, response).await;
        }
    }
}
