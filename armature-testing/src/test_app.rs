// Test Application Builder

use armature_core::{
    Application, ApplicationBuilder, ExceptionHandler, HttpKernel, HttpRequest, HttpResponse,
    InMemoryUserProvider, Middleware, Principal, Route, TerminableMiddleware, UserProvider,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// A booted application plus helpers for driving it from tests.
pub struct TestApp {
    pub app: Application,
}

impl TestApp {
    pub fn new(app: Application) -> Self {
        Self { app }
    }

    /// Client that sends requests through the application's kernel.
    pub fn client(&self) -> crate::TestClient {
        crate::TestClient::new(self.app.clone())
    }

    pub fn application(&self) -> &Application {
        &self.app
    }
}

/// Builder for test applications
#[derive(Default)]
pub struct TestAppBuilder {
    inner: ApplicationBuilder,
    users: HashMap<String, Vec<Principal>>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// GET route backed by an async closure.
    pub fn with_route<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, armature_core::Error>> + Send + 'static,
    {
        self.route(Route::get(path, handler))
    }

    pub fn route(mut self, route: Route) -> Self {
        self.inner = self.inner.route(route);
        self
    }

    pub fn alias_middleware<M: Middleware + 'static>(mut self, name: &str, middleware: M) -> Self {
        self.inner = self.inner.alias_middleware(name, middleware);
        self
    }

    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.inner = self.inner.middleware(middleware);
        self
    }

    pub fn terminator(mut self, terminator: Arc<dyn TerminableMiddleware>) -> Self {
        self.inner = self.inner.terminator(terminator);
        self
    }

    pub fn kernel(mut self, kernel: Arc<dyn HttpKernel>) -> Self {
        self.inner = self.inner.kernel(kernel);
        self
    }

    pub fn exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.inner = self.inner.exception_handler(handler);
        self
    }

    /// Register a custom user provider for `guard`.
    pub fn guard<P: UserProvider + 'static>(mut self, guard: &str, provider: P) -> Self {
        self.inner = self.inner.guard(guard, provider);
        self
    }

    /// Seed a user into an in-memory provider for `guard`.
    pub fn with_user(mut self, guard: &str, user: Principal) -> Self {
        self.users.entry(guard.to_string()).or_default().push(user);
        self
    }

    pub fn document(mut self, controller: &str, method: &str, doc: Option<&str>) -> Self {
        self.inner = self.inner.document(controller, method, doc);
        self
    }

    pub fn url(mut self, url: &str) -> Self {
        self.inner = self.inner.url(url);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.inner = self.inner.debug(debug);
        self
    }

    pub fn build(self) -> TestApp {
        let mut inner = self.inner;
        for (guard, users) in self.users {
            let provider = users
                .into_iter()
                .fold(InMemoryUserProvider::new(), |provider, user| provider.with_user(user));
            inner = inner.guard(&guard, provider);
        }
        TestApp::new(inner.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creation() {
        let app = TestAppBuilder::new().build();
        assert!(app.application().router().routes().is_empty());
    }

    #[tokio::test]
    async fn test_seeded_users_are_retrievable() {
        let app = TestAppBuilder::new()
            .with_user("api", Principal::new("1").with_name("Ada"))
            .with_user("api", Principal::new("2").with_name("Grace"))
            .build();

        let auth = app.application().auth();
        let grace = auth.retrieve("api", "2").await.unwrap().unwrap();
        assert_eq!(grace.name.as_deref(), Some("Grace"));
        assert!(auth.retrieve("api", "3").await.unwrap().is_none());
    }
}
