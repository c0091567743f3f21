// Routing system for HTTP requests

use crate::logging::debug;
use crate::middleware::{BoxFuture, FnMiddleware, HandlerFn, Middleware, MiddlewareChain, Next};
use crate::{Error, HttpMethod, HttpRequest, HttpResponse};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// What a route is bound to.
///
/// Parsed once when the route is registered from the action string:
/// `"Closure"` (or empty) for inline closures, `"Controller@method"` for a
/// controller method, and a bare `"Controller"` for a single-action
/// controller whose entry point is resolved later.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandlerRef {
    Closure,
    Method { controller: String, method: String },
    Invokable { controller: String },
}

impl HandlerRef {
    pub fn parse(action: &str) -> Self {
        let action = action.trim();
        if action.is_empty() || action == "Closure" {
            return HandlerRef::Closure;
        }
        match action.split_once('@') {
            Some((controller, method)) => HandlerRef::Method {
                controller: controller.to_string(),
                method: method.to_string(),
            },
            None => HandlerRef::Invokable {
                controller: action.to_string(),
            },
        }
    }

    pub fn is_closure(&self) -> bool {
        matches!(self, HandlerRef::Closure)
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerRef::Closure => f.write_str("Closure"),
            HandlerRef::Method { controller, method } => write!(f, "{}@{}", controller, method),
            HandlerRef::Invokable { controller } => f.write_str(controller),
        }
    }
}

/// Middleware attached to a single route.
#[derive(Clone)]
pub enum RouteMiddleware {
    /// Resolved through the router's alias table at dispatch time.
    Named(String),
    Inline(Arc<dyn Middleware>),
}

impl RouteMiddleware {
    /// Name shown in route listings; inline middleware is `"Closure"`.
    pub fn display_name(&self) -> &str {
        match self {
            RouteMiddleware::Named(name) => name,
            RouteMiddleware::Inline(_) => "Closure",
        }
    }
}

impl fmt::Debug for RouteMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Wrap an async closure as a [`HandlerFn`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(move |req| -> BoxFuture { Box::pin(f(req)) })
}

/// Route definition with handler
#[derive(Clone)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
    pub handler: HandlerFn,
    pub name: Option<String>,
    pub domain: Option<String>,
    pub action: HandlerRef,
    pub middleware: Vec<RouteMiddleware>,
}

impl Route {
    pub fn new(method: HttpMethod, path: &str, handler: HandlerFn) -> Self {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        Self {
            method,
            path,
            handler,
            name: None,
            domain: None,
            action: HandlerRef::Closure,
            middleware: Vec::new(),
        }
    }

    pub fn get<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        Self::new(HttpMethod::GET, path, handler_fn(f))
    }

    pub fn post<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        Self::new(HttpMethod::POST, path, handler_fn(f))
    }

    pub fn put<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        Self::new(HttpMethod::PUT, path, handler_fn(f))
    }

    pub fn patch<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        Self::new(HttpMethod::PATCH, path, handler_fn(f))
    }

    pub fn delete<F, Fut>(path: &str, f: F) -> Self
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        Self::new(HttpMethod::DELETE, path, handler_fn(f))
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Bind the route to a controller action, e.g. `"UserController@index"`.
    pub fn action(mut self, action: &str) -> Self {
        self.action = HandlerRef::parse(action);
        self
    }

    /// Attach a middleware registered on the router under `name`.
    pub fn middleware(mut self, name: impl Into<String>) -> Self {
        self.middleware.push(RouteMiddleware::Named(name.into()));
        self
    }

    /// Attach an inline closure middleware.
    pub fn layer<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HttpRequest, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.middleware
            .push(RouteMiddleware::Inline(Arc::new(FnMiddleware::new(f))));
        self
    }

    /// Methods this route answers; GET routes also answer HEAD.
    pub fn methods(&self) -> Vec<HttpMethod> {
        match self.method {
            HttpMethod::GET => vec![HttpMethod::GET, HttpMethod::HEAD],
            other => vec![other],
        }
    }

    /// Path pattern without its leading slash, e.g. `api/users/{id}`.
    pub fn uri(&self) -> &str {
        let trimmed = self.path.trim_start_matches('/');
        if trimmed.is_empty() { "/" } else { trimmed }
    }

    pub fn middleware_names(&self) -> Vec<String> {
        self.middleware
            .iter()
            .map(|m| m.display_name().to_string())
            .collect()
    }

    fn answers(&self, method: &str) -> bool {
        self.methods().iter().any(|m| m.as_str() == method)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("action", &self.action)
            .field("middleware", &self.middleware)
            .finish()
    }
}

/// Router for managing routes and dispatching requests
#[derive(Default)]
pub struct Router {
    pub routes: Vec<Route>,
    aliases: HashMap<String, Arc<dyn Middleware>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route to the router
    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Builder-style [`Router::add_route`].
    pub fn with_route(mut self, route: Route) -> Self {
        self.add_route(route);
        self
    }

    /// Register a middleware that routes can refer to by name.
    pub fn alias_middleware<M: Middleware + 'static>(&mut self, name: impl Into<String>, middleware: M) {
        self.aliases.insert(name.into(), Arc::new(middleware));
    }

    /// All routes, in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Find a route that matches the request
    pub async fn route(&self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        let (path, query_string) = request
            .path
            .split_once('?')
            .map(|(p, q)| (p.to_string(), Some(q.to_string())))
            .unwrap_or_else(|| (request.path.clone(), None));

        if let Some(query) = query_string {
            for (key, value) in parse_query_string(&query) {
                request.query_params.insert(key, value);
            }
        }

        let mut path_matched = false;
        for route in &self.routes {
            if !host_matches(route.domain.as_deref(), request.host.as_deref()) {
                continue;
            }
            let Some(params) = match_path(&route.path, &path) else {
                continue;
            };
            path_matched = true;
            if !route.answers(&request.method) {
                continue;
            }

            debug!(method = %request.method, path = %path, route = %route.path, "Route matched");
            request.path_params = params;
            let is_head = request.method == HttpMethod::HEAD.as_str();
            let chain = self.chain_for(route)?;
            let mut response = chain.apply(request, route.handler.clone()).await?;
            if is_head {
                response.body.clear();
            }
            return Ok(response);
        }

        if path_matched {
            Err(Error::MethodNotAllowed(format!("{} {}", request.method, path)))
        } else {
            Err(Error::RouteNotFound(format!("{} {}", request.method, path)))
        }
    }

    fn chain_for(&self, route: &Route) -> Result<MiddlewareChain, Error> {
        let mut middlewares = Vec::with_capacity(route.middleware.len());
        for middleware in &route.middleware {
            match middleware {
                RouteMiddleware::Named(name) => {
                    let resolved = self.aliases.get(name).ok_or_else(|| {
                        Error::Internal(format!("Middleware [{}] is not registered", name))
                    })?;
                    middlewares.push(resolved.clone());
                }
                RouteMiddleware::Inline(inline) => middlewares.push(inline.clone()),
            }
        }
        Ok(MiddlewareChain::from_vec(middlewares))
    }
}

fn host_matches(domain: Option<&str>, host: Option<&str>) -> bool {
    match (domain, host) {
        (None, _) => true,
        (Some(domain), Some(host)) => domain.eq_ignore_ascii_case(host),
        (Some(_), None) => false,
    }
}

/// Match a route path pattern against a request path.
///
/// Parameters are written `:name` or `{name}`.
fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();

    for (pattern_part, path_part) in pattern_parts.iter().zip(path_parts.iter()) {
        let param_name = pattern_part.strip_prefix(':').or_else(|| {
            pattern_part
                .strip_prefix('{')
                .and_then(|p| p.strip_suffix('}'))
        });
        if let Some(param_name) = param_name {
            params.insert(param_name.to_string(), decode(path_part));
        } else if pattern_part != path_part {
            return None;
        }
    }

    Some(params)
}

/// Parse a query string into key-value pairs, percent-decoding both sides.
fn parse_query_string(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let mut split = part.splitn(2, '=');
            let key = split.next()?;
            let value = split.next().unwrap_or("");
            Some((decode(key), decode(value)))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_ref_parse() {
        assert_eq!(HandlerRef::parse("Closure"), HandlerRef::Closure);
        assert_eq!(HandlerRef::parse(""), HandlerRef::Closure);
        assert_eq!(
            HandlerRef::parse("UserController@index"),
            HandlerRef::Method {
                controller: "UserController".into(),
                method: "index".into()
            }
        );
        assert_eq!(
            HandlerRef::parse("ShowProfile"),
            HandlerRef::Invokable {
                controller: "ShowProfile".into()
            }
        );
        assert_eq!(HandlerRef::parse("A@b").to_string(), "A@b");
    }

    #[test]
    fn test_match_path_static() {
        let result = match_path("/users", "/users");
        assert_eq!(result.map(|p| p.len()), Some(0));
    }

    #[test]
    fn test_match_path_with_param_styles() {
        let params = match_path("/users/:id", "/users/123").unwrap();
        assert_eq!(params.get("id"), Some(&"123".to_string()));

        let params = match_path("/users/{user}/posts/{post}", "/users/1/posts/2").unwrap();
        assert_eq!(params.get("user"), Some(&"1".to_string()));
        assert_eq!(params.get("post"), Some(&"2".to_string()));
    }

    #[test]
    fn test_match_path_no_match() {
        assert!(match_path("/users/:id", "/posts/123").is_none());
        assert!(match_path("/users", "/users/1").is_none());
    }

    #[test]
    fn test_parse_query_string_decodes() {
        let params = parse_query_string("name=john%20doe&tag=a+b&flag");
        assert_eq!(
            params,
            vec![
                ("name".to_string(), "john doe".to_string()),
                ("tag".to_string(), "a b".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_route_uri_and_methods() {
        let route = Route::get("api/users", |_req| async { Ok(HttpResponse::ok()) });
        assert_eq!(route.path, "/api/users");
        assert_eq!(route.uri(), "api/users");
        assert_eq!(route.methods(), vec![HttpMethod::GET, HttpMethod::HEAD]);
    }

    #[test]
    fn test_route_middleware_names() {
        let route = Route::post("/api/posts", |_req| async { Ok(HttpResponse::created()) })
            .middleware("auth")
            .layer(|req, next| async move { next(req).await })
            .middleware("throttle");

        assert_eq!(route.middleware_names(), vec!["auth", "Closure", "throttle"]);
    }

    #[tokio::test]
    async fn test_router_method_not_allowed() {
        let router = Router::new().with_route(Route::get("/items", |_req| async {
            Ok(HttpResponse::ok())
        }));

        let request = HttpRequest::new("POST".into(), "/items".into());
        let err = router.route(request).await.unwrap_err();
        assert_eq!(err.status_code(), 405);
    }

    #[tokio::test]
    async fn test_router_head_falls_back_to_get() {
        let router = Router::new().with_route(Route::get("/items", |_req| async {
            Ok(HttpResponse::text("body"))
        }));

        let response = router
            .route(HttpRequest::new("HEAD".into(), "/items".into()))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_router_unknown_middleware_alias() {
        let router = Router::new().with_route(
            Route::get("/secret", |_req| async { Ok(HttpResponse::ok()) }).middleware("missing"),
        );

        let err = router
            .route(HttpRequest::new("GET".into(), "/secret".into()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[tokio::test]
    async fn test_router_respects_domain() {
        let router = Router::new().with_route(
            Route::get("/", |_req| async { Ok(HttpResponse::ok()) }).domain("admin.app.test"),
        );

        let mut request = HttpRequest::new("GET".into(), "/".into());
        request.host = Some("app.test".into());
        assert!(router.route(request.clone()).await.is_err());

        request.host = Some("admin.app.test".into());
        assert!(router.route(request).await.is_ok());
    }
}
