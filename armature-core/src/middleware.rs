// Middleware system for request/response processing

use crate::logging::{debug, trace};
use crate::{Error, HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by handlers and middleware continuations.
pub type BoxFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// Type alias for the next handler in the middleware chain
pub type Next = Box<dyn FnOnce(HttpRequest) -> BoxFuture + Send>;

/// Type alias for handler functions
pub type HandlerFn = Arc<dyn Fn(HttpRequest) -> BoxFuture + Send + Sync>;

/// Middleware trait for processing requests before they reach the handler
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process the request and optionally pass to next middleware
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error>;
}

/// Middleware that needs to run after the response has been produced.
///
/// The kernel calls `terminate` once per request, after handling, whether the
/// handler succeeded or the response was rendered from a fault.
#[async_trait]
pub trait TerminableMiddleware: Send + Sync {
    async fn terminate(&self, req: &HttpRequest, res: &HttpResponse);
}

/// Adapter turning an async closure into a [`Middleware`].
pub struct FnMiddleware<F> {
    f: F,
}

impl<F, Fut> FnMiddleware<F>
where
    F: Fn(HttpRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(HttpRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        (self.f)(req, next).await
    }
}

/// Middleware chain executor
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            middlewares: Arc::new(middlewares),
        }
    }

    /// Add a middleware to the chain
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        let mut mws = (*self.middlewares).clone();
        mws.push(Arc::new(middleware));
        self.middlewares = Arc::new(mws);
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Execute the middleware chain with a handler
    pub async fn apply(&self, req: HttpRequest, handler: HandlerFn) -> Result<HttpResponse, Error> {
        debug!(
            middleware_count = self.middlewares.len(),
            path = %req.path,
            method = %req.method,
            "Executing middleware chain"
        );
        self.execute_from(0, req, handler).await
    }

    fn execute_from(&self, index: usize, req: HttpRequest, handler: HandlerFn) -> BoxFuture {
        if index >= self.middlewares.len() {
            trace!("Middleware chain complete, calling handler");
            handler(req)
        } else {
            let middleware = self.middlewares[index].clone();
            let chain = self.clone();
            let handler_clone = handler.clone();

            trace!(middleware_index = index, "Executing middleware");
            Box::pin(async move {
                middleware
                    .handle(
                        req,
                        Box::new(move |req| chain.execute_from(index + 1, req, handler_clone)),
                    )
                    .await
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tag(&'static str);

    #[async_trait]
    impl Middleware for Tag {
        async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
            let res = next(req).await?;
            let seen = res.headers.get("X-Trail").cloned().unwrap_or_default();
            Ok(res.with_header("X-Trail", format!("{}{}", seen, self.0)))
        }
    }

    fn ok_handler() -> HandlerFn {
        Arc::new(|_req: HttpRequest| -> BoxFuture { Box::pin(async { Ok(HttpResponse::ok()) }) })
    }

    #[tokio::test]
    async fn test_chain_runs_in_registration_order() {
        let mut chain = MiddlewareChain::new();
        chain.use_middleware(Tag("a"));
        chain.use_middleware(Tag("b"));

        let req = HttpRequest::new("GET".into(), "/".into());
        let res = chain.apply(req, ok_handler()).await.unwrap();

        // innermost middleware writes first
        assert_eq!(res.headers.get("X-Trail"), Some(&"ba".to_string()));
    }

    #[tokio::test]
    async fn test_fn_middleware_can_short_circuit() {
        let mut chain = MiddlewareChain::new();
        chain.use_middleware(FnMiddleware::new(|_req, _next| async {
            Err(Error::Forbidden("blocked".into()))
        }));

        let req = HttpRequest::new("GET".into(), "/".into());
        let err = chain.apply(req, ok_handler()).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
    }
}
