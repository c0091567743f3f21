//! Request synthesis.
//!
//! Turns a user's invocation (method, URI, parameters, auth) into a request
//! the host kernel can handle exactly as if it had arrived over the wire.

use crate::auth::{AuthDirective, AuthMode};
use crate::error::{ApiTesterError, Result};
use armature_core::logging::debug;
use armature_core::{HeaderMap, HttpMethod, HttpRequest, UploadedFile};
use url::Url;
use url::form_urlencoded;

/// A submitted parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    File(UploadedFile),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<UploadedFile> for ParamValue {
    fn from(file: UploadedFile) -> Self {
        ParamValue::File(file)
    }
}

/// One call a user wants to make.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub method: String,
    pub uri: String,
    pub parameters: Vec<(String, ParamValue)>,
    pub auth: AuthDirective,
}

impl Invocation {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            ..Default::default()
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    pub fn file(self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.param(name, file)
    }

    pub fn auth(mut self, mode: AuthMode) -> Self {
        self.auth.mode = mode;
        self
    }

    pub fn with_auth(mut self, auth: AuthDirective) -> Self {
        self.auth = auth;
        self
    }

    /// Impersonate the user with this id.
    pub fn acting_as(mut self, user_id: impl Into<String>) -> Self {
        self.auth.impersonate = Some(user_id.into());
        self
    }
}

/// A fabricated request, ready to hand to the kernel.
#[derive(Debug, Clone)]
pub struct SyntheticRequest {
    pub method: HttpMethod,
    pub url: Url,
    /// Scalar parameters; a repeated name keeps its first position and last value.
    pub parameters: Vec<(String, String)>,
    pub files: Vec<(String, UploadedFile)>,
    pub headers: HeaderMap,
}

impl SyntheticRequest {
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert to a host request.
    ///
    /// GET and HEAD carry parameters in the query string, after any query the
    /// URI already had. The other methods send them as a urlencoded form body.
    pub fn into_http_request(self) -> HttpRequest {
        let mut url = self.url;
        let carries_body = self.method.carries_form_body();

        if !carries_body && !self.parameters.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.parameters);
        }

        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        let mut request = HttpRequest::new(self.method.as_str().to_string(), path);
        for (name, value) in self.headers.iter() {
            request.headers.append(name.clone(), value.clone());
        }

        if let Some(host) = url.host_str() {
            let authority = match url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            };
            request.headers.insert("Host", authority);
            request.host = Some(host.to_string());
        }

        if carries_body {
            request.body = form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.parameters)
                .finish()
                .into_bytes();
            request
                .headers
                .insert("Content-Type", "application/x-www-form-urlencoded");
            request.form = self.parameters;
        }
        request.files = self.files;

        request
    }
}

/// Builds [`SyntheticRequest`]s against a base URL.
#[derive(Debug, Clone)]
pub struct RequestSynthesizer {
    base_url: String,
}

impl RequestSynthesizer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a URI. Absolute `http(s)` URIs are kept as they are.
    pub fn resolve_url(&self, uri: &str) -> String {
        let uri = uri.strip_prefix('/').unwrap_or(uri);
        let url = if uri.starts_with("http") {
            uri.to_string()
        } else {
            format!("{}/{}", self.base_url, uri)
        };
        url.trim_matches('/').to_string()
    }

    pub fn build(&self, invocation: &Invocation) -> Result<SyntheticRequest> {
        let method = invocation.method.trim();
        let uri = invocation.uri.trim();
        if method.is_empty() || uri.is_empty() {
            return Err(ApiTesterError::InvalidInvocation(
                "Method and URI are required.".to_string(),
            ));
        }

        let method = HttpMethod::from_str(method).ok_or_else(|| {
            ApiTesterError::InvalidInvocation(format!("Unsupported method [{}]", method))
        })?;

        let resolved = self.resolve_url(uri);
        let url = Url::parse(&resolved).map_err(|e| {
            ApiTesterError::InvalidInvocation(format!("Invalid URI [{}]: {}", uri, e))
        })?;

        let mut parameters: Vec<(String, String)> = Vec::new();
        let mut files: Vec<(String, UploadedFile)> = Vec::new();
        for (name, value) in &invocation.parameters {
            match value {
                ParamValue::Text(text) => upsert(&mut parameters, name, text.clone()),
                ParamValue::File(file) if file.is_valid() => upsert(&mut files, name, file.clone()),
                ParamValue::File(file) => {
                    debug!(name = %name, error = file.error, "Dropping failed upload");
                }
            }
        }

        let mut headers = HeaderMap::new();
        headers.insert("Accept", "application/json");
        if let Some(authorization) = invocation.auth.mode.authorization_header() {
            headers.insert("Authorization", authorization);
        }

        Ok(SyntheticRequest {
            method,
            url,
            parameters,
            files,
            headers,
        })
    }
}

fn upsert<T>(entries: &mut Vec<(String, T)>, name: &str, value: T) {
    match entries.iter_mut().find(|(k, _)| k == name) {
        Some(entry) => entry.1 = value,
        None => entries.push((name.to_string(), value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synth() -> RequestSynthesizer {
        RequestSynthesizer::new("http://app.test/")
    }

    #[test]
    fn test_resolve_url() {
        let s = synth();
        assert_eq!(s.resolve_url("/users"), "http://app.test/users");
        assert_eq!(s.resolve_url("api/users/"), "http://app.test/api/users");
        assert_eq!(s.resolve_url("https://other.test/x"), "https://other.test/x");
        assert_eq!(s.resolve_url("/http://other.test/x/"), "http://other.test/x");
    }

    #[test]
    fn test_missing_method_or_uri() {
        let err = synth().build(&Invocation::new("", "/users")).unwrap_err();
        assert!(matches!(err, ApiTesterError::InvalidInvocation(_)));

        let err = synth().build(&Invocation::new("GET", "  ")).unwrap_err();
        assert!(matches!(err, ApiTesterError::InvalidInvocation(_)));
    }

    #[test]
    fn test_unknown_method() {
        let err = synth().build(&Invocation::new("BREW", "/coffee")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid invocation: Unsupported method [BREW]");
    }

    #[test]
    fn test_headers_by_auth_mode() {
        let request = synth().build(&Invocation::new("get", "/users")).unwrap();
        assert_eq!(request.method, HttpMethod::GET);
        assert_eq!(request.headers.get("accept").map(String::as_str), Some("application/json"));
        assert!(request.headers.authorization().is_none());

        let invocation = Invocation::new("GET", "/users").auth(AuthMode::BasicAuth {
            username: "a".into(),
            password: "b".into(),
        });
        let request = synth().build(&invocation).unwrap();
        assert_eq!(request.headers.authorization().map(String::as_str), Some("Basic YTpi"));
    }

    #[test]
    fn test_parameters_last_write_wins() {
        let invocation = Invocation::new("POST", "/users")
            .param("name", "ada")
            .param("role", "admin")
            .param("name", "grace");
        let request = synth().build(&invocation).unwrap();

        assert_eq!(
            request.parameters,
            vec![
                ("name".to_string(), "grace".to_string()),
                ("role".to_string(), "admin".to_string()),
            ]
        );
    }

    #[test]
    fn test_failed_uploads_are_dropped() {
        let invocation = Invocation::new("POST", "/avatars")
            .file("avatar", UploadedFile::new("me.png", vec![1, 2, 3]))
            .file("broken", UploadedFile::new("x.png", vec![]).with_error(4));
        let request = synth().build(&invocation).unwrap();

        assert_eq!(request.files.len(), 1);
        assert_eq!(request.files[0].0, "avatar");
        assert!(request.parameters.is_empty());
    }

    #[test]
    fn test_get_puts_parameters_in_query() {
        let invocation = Invocation::new("GET", "/api/users?sort=name")
            .param("page", "2")
            .param("q", "ada lovelace");
        let request = synth().build(&invocation).unwrap().into_http_request();

        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/api/users?sort=name&page=2&q=ada+lovelace");
        assert_eq!(request.host.as_deref(), Some("app.test"));
        assert_eq!(request.header("host").map(String::as_str), Some("app.test"));
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_post_sends_form_body() {
        let invocation = Invocation::new("POST", "http://localhost:8080/api/users")
            .param("name", "Ada & co");
        let request = synth().build(&invocation).unwrap().into_http_request();

        assert_eq!(request.path, "/api/users");
        assert_eq!(request.body, b"name=Ada+%26+co".to_vec());
        assert_eq!(request.form_value("name").map(String::as_str), Some("Ada & co"));
        assert_eq!(
            request.header("content-type").map(String::as_str),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(request.header("host").map(String::as_str), Some("localhost:8080"));
    }
}
