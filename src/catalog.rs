//! Route catalog: the API-style routes of a live router, described for display.

use crate::doc_params::{ParameterDescriptor, extract_parameters};
use crate::error::{ApiTesterError, Result};
use armature_core::logging::debug;
use armature_core::{HandlerDocs, HandlerRef, HttpMethod, Route, Router};
use serde::Serialize;

/// Display accent for a method badge.
pub fn method_accent(method: HttpMethod) -> Option<&'static str> {
    match method {
        HttpMethod::GET => Some("success"),
        HttpMethod::HEAD => Some("secondary"),
        HttpMethod::POST => Some("primary"),
        HttpMethod::PUT => Some("warning"),
        HttpMethod::DELETE => Some("danger"),
        HttpMethod::PATCH => Some("info"),
        HttpMethod::OPTIONS => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteDescriptor {
    pub host: Option<String>,
    pub method: HttpMethod,
    pub uri: String,
    pub name: Option<String>,
    pub action: String,
    pub middleware: Vec<String>,
    pub parameters: Vec<ParameterDescriptor>,
    pub accent: &'static str,
}

/// Field to order a listing by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Host,
    Method,
    Uri,
    Name,
    Action,
    Middleware,
}

impl SortField {
    /// `None` for anything that is not a route field.
    pub fn parse(field: &str) -> Option<Self> {
        match field.trim().to_lowercase().as_str() {
            "host" | "domain" => Some(SortField::Host),
            "method" => Some(SortField::Method),
            "uri" => Some(SortField::Uri),
            "name" => Some(SortField::Name),
            "action" => Some(SortField::Action),
            "middleware" => Some(SortField::Middleware),
            _ => None,
        }
    }

    fn key(&self, route: &RouteInfo<'_>) -> String {
        match self {
            SortField::Host => route.host.unwrap_or_default().to_string(),
            SortField::Method => route.method.as_str().to_string(),
            SortField::Uri => route.uri.to_string(),
            SortField::Name => route.name.unwrap_or_default().to_string(),
            SortField::Action => route.handler.to_string(),
            SortField::Middleware => route.middleware.join(","),
        }
    }
}

/// A listed route before its parameters are resolved.
struct RouteInfo<'a> {
    host: Option<&'a str>,
    method: HttpMethod,
    uri: &'a str,
    name: Option<&'a str>,
    handler: &'a HandlerRef,
    middleware: Vec<String>,
}

impl<'a> RouteInfo<'a> {
    fn from_route(route: &'a Route) -> Self {
        Self {
            host: route.domain.as_deref(),
            method: route.method,
            uri: route.uri(),
            name: route.name.as_deref(),
            handler: &route.action,
            middleware: route.middleware_names(),
        }
    }
}

/// Reads a router and its handler docs. Nothing is cached; every call sees
/// the router as it is now.
pub struct RouteCatalog<'a> {
    router: &'a Router,
    docs: &'a HandlerDocs,
    prefix: &'a str,
}

impl<'a> RouteCatalog<'a> {
    pub fn new(router: &'a Router, docs: &'a HandlerDocs, prefix: &'a str) -> Self {
        Self { router, docs, prefix }
    }

    /// Listed routes in registration order.
    pub fn list(&self) -> Vec<RouteDescriptor> {
        self.describe(self.matching())
    }

    /// Listed routes ordered by `field`; an unknown field keeps registration order.
    pub fn sorted(&self, field: &str) -> Vec<RouteDescriptor> {
        let mut routes = self.matching();
        if let Some(field) = SortField::parse(field) {
            routes.sort_by_cached_key(|route| field.key(route));
        }
        self.describe(routes)
    }

    fn matching(&self) -> Vec<RouteInfo<'a>> {
        let prefix = self.prefix.trim_start_matches('/');
        self.router
            .routes()
            .iter()
            .filter(|route| method_accent(route.method).is_some())
            .filter(|route| route.path.trim_start_matches('/').starts_with(prefix))
            .map(RouteInfo::from_route)
            .collect()
    }

    // Unresolvable handlers are dropped only after ordering.
    fn describe(&self, routes: Vec<RouteInfo<'_>>) -> Vec<RouteDescriptor> {
        routes
            .into_iter()
            .filter_map(|route| match resolve_parameters(self.docs, route.handler) {
                Ok(parameters) => Some(RouteDescriptor {
                    host: route.host.map(str::to_string),
                    method: route.method,
                    uri: route.uri.to_string(),
                    name: route.name.map(str::to_string),
                    action: route.handler.to_string(),
                    middleware: route.middleware,
                    parameters,
                    accent: method_accent(route.method).unwrap_or_default(),
                }),
                Err(err) => {
                    debug!(uri = route.uri, error = %err, "Route dropped from catalog");
                    None
                }
            })
            .collect()
    }
}

/// Parameters documented on the handler a route is bound to.
pub fn resolve_parameters(docs: &HandlerDocs, handler: &HandlerRef) -> Result<Vec<ParameterDescriptor>> {
    match handler {
        HandlerRef::Closure => Ok(Vec::new()),
        HandlerRef::Method { controller, method } => {
            Ok(extract_parameters(docs.doc(controller, method)))
        }
        HandlerRef::Invokable { controller } => {
            if !docs.has_method(controller, HandlerDocs::INVOKE) {
                return Err(ApiTesterError::UnresolvedHandler(controller.clone()));
            }
            Ok(extract_parameters(docs.doc(controller, HandlerDocs::INVOKE)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armature_core::{HttpResponse, handler_fn};

    fn ok_route(method: HttpMethod, path: &str) -> Route {
        Route::new(method, path, handler_fn(|_req| async { Ok(HttpResponse::ok()) }))
    }

    fn router() -> Router {
        Router::new()
            .with_route(ok_route(HttpMethod::POST, "/api/users").name("users.store").action("UserController@store"))
            .with_route(ok_route(HttpMethod::GET, "/api/users").name("users.index").action("UserController@index").middleware("auth"))
            .with_route(ok_route(HttpMethod::GET, "/web/home"))
            .with_route(ok_route(HttpMethod::DELETE, "/api/profile").action("ShowProfile"))
            .with_route(ok_route(HttpMethod::GET, "/api/status"))
    }

    fn docs() -> HandlerDocs {
        HandlerDocs::new()
            .with("UserController", "index", Some("@SWG\\Parameter(\nname=page\n)"))
            .with("UserController", "store", None)
    }

    #[test]
    fn test_list_filters_by_prefix() {
        let (router, docs) = (router(), docs());
        let routes = RouteCatalog::new(&router, &docs, "api").list();

        let uris: Vec<&str> = routes.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(uris, vec!["api/users", "api/users", "api/status"]);
        assert_eq!(routes[1].parameters[0].name(), "page");
        assert_eq!(routes[1].middleware, vec!["auth"]);
        assert_eq!(routes[1].accent, "success");
        assert_eq!(routes[0].accent, "primary");

        assert!(RouteCatalog::new(&router, &docs, "nothing").list().is_empty());
    }

    #[test]
    fn test_invokable_without_entry_point_is_dropped() {
        let (router, docs) = (router(), docs());
        let routes = RouteCatalog::new(&router, &docs, "api").list();
        assert!(routes.iter().all(|r| r.uri != "api/profile"));

        let docs = docs.with("ShowProfile", HandlerDocs::INVOKE, None);
        let routes = RouteCatalog::new(&router, &docs, "api").list();
        let profile = routes.iter().find(|r| r.uri == "api/profile").unwrap();
        assert_eq!(profile.action, "ShowProfile");
        assert_eq!(profile.accent, "danger");
    }

    #[test]
    fn test_sort_then_drop_keeps_sorted_order() {
        let (router, docs) = (router(), docs());
        let routes = RouteCatalog::new(&router, &docs, "api").sorted("method");

        let methods: Vec<&str> = routes.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(methods, vec!["GET", "GET", "POST"]);
        // stable: registration order within GET
        assert_eq!(routes[0].uri, "api/users");
        assert_eq!(routes[1].uri, "api/status");
    }

    #[test]
    fn test_sort_by_name_treats_missing_as_empty() {
        let (router, docs) = (router(), docs());
        let routes = RouteCatalog::new(&router, &docs, "api").sorted("name");

        let names: Vec<Option<&str>> = routes.iter().map(|r| r.name.as_deref()).collect();
        assert_eq!(names, vec![None, Some("users.index"), Some("users.store")]);
    }

    #[test]
    fn test_unknown_sort_field_keeps_order() {
        let (router, docs) = (router(), docs());
        let catalog = RouteCatalog::new(&router, &docs, "api");

        let listed: Vec<String> = catalog.list().into_iter().map(|r| r.action).collect();
        let sorted: Vec<String> = catalog.sorted("colour").into_iter().map(|r| r.action).collect();
        assert_eq!(listed, sorted);
    }

    #[test]
    fn test_options_routes_are_not_listed() {
        let router = Router::new().with_route(ok_route(HttpMethod::OPTIONS, "/api/cors"));
        let docs = HandlerDocs::new();

        assert!(RouteCatalog::new(&router, &docs, "api").list().is_empty());
    }

    #[test]
    fn test_resolve_parameters() {
        let docs = docs();
        assert!(resolve_parameters(&docs, &HandlerRef::Closure).unwrap().is_empty());
        assert!(resolve_parameters(&docs, &HandlerRef::parse("Unknown@show")).unwrap().is_empty());
        assert!(matches!(
            resolve_parameters(&docs, &HandlerRef::parse("Missing")),
            Err(ApiTesterError::UnresolvedHandler(name)) if name == "Missing"
        ));
    }
}
