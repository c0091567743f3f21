// Authentication directives for simulated requests

use base64::{Engine as _, engine::general_purpose};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    NoAuth,
    BasicAuth {
        username: String,
        password: String,
    },
    BearerToken {
        token: String,
    },
}

impl AuthMode {
    /// `Authorization` header value for this mode, if it sends one.
    pub fn authorization_header(&self) -> Option<String> {
        match self {
            AuthMode::NoAuth => None,
            AuthMode::BasicAuth { username, password } => {
                let credentials = format!("{}:{}", username, password);
                Some(format!("Basic {}", general_purpose::STANDARD.encode(credentials)))
            }
            AuthMode::BearerToken { token } => Some(format!("Bearer {}", token)),
        }
    }
}

/// How a simulated request authenticates, and who it acts as.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthDirective {
    pub mode: AuthMode,
    /// User id to impersonate.
    pub impersonate: Option<String>,
}

impl AuthDirective {
    pub fn new(mode: AuthMode) -> Self {
        Self { mode, impersonate: None }
    }

    pub fn impersonating(mut self, user_id: impl Into<String>) -> Self {
        self.impersonate = Some(user_id.into());
        self
    }

    /// Read `auth_type` and its credential fields from submitted form values.
    ///
    /// Unknown or missing `auth_type` is no auth; missing credentials are empty.
    pub fn from_fields<'a, F>(field: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let text = |name: &str| field(name).unwrap_or_default().to_string();
        let mode = match field("auth_type").unwrap_or_default() {
            "basic_auth" => AuthMode::BasicAuth {
                username: text("basic_auth_username"),
                password: text("basic_auth_password"),
            },
            "bearer_token" => AuthMode::BearerToken {
                token: text("bearer_token_token"),
            },
            _ => AuthMode::NoAuth,
        };
        let impersonate = field("user")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Self { mode, impersonate }
    }
}

/// An auth mode offered to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthTypeOption {
    pub value: &'static str,
    pub title: &'static str,
    pub select: bool,
}

pub fn auth_types() -> Vec<AuthTypeOption> {
    vec![
        AuthTypeOption {
            value: "no_auth",
            title: "No Auth",
            select: true,
        },
        AuthTypeOption {
            value: "basic_auth",
            title: "Basic Auth",
            select: false,
        },
        AuthTypeOption {
            value: "bearer_token",
            title: "Bearer Token",
            select: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn directive(pairs: &[(&str, &str)]) -> AuthDirective {
        let fields: HashMap<&str, &str> = pairs.iter().copied().collect();
        AuthDirective::from_fields(|name| fields.get(name).copied())
    }

    #[test]
    fn test_basic_auth_header() {
        let mode = AuthMode::BasicAuth {
            username: "a".into(),
            password: "b".into(),
        };
        assert_eq!(mode.authorization_header().as_deref(), Some("Basic YTpi"));
    }

    #[test]
    fn test_bearer_and_no_auth_headers() {
        let bearer = AuthMode::BearerToken { token: "t0k3n".into() };
        assert_eq!(bearer.authorization_header().as_deref(), Some("Bearer t0k3n"));
        assert_eq!(AuthMode::NoAuth.authorization_header(), None);
    }

    #[test]
    fn test_from_fields() {
        let basic = directive(&[
            ("auth_type", "basic_auth"),
            ("basic_auth_username", "ada"),
            ("user", " 7 "),
        ]);
        assert_eq!(
            basic.mode,
            AuthMode::BasicAuth {
                username: "ada".into(),
                password: String::new()
            }
        );
        assert_eq!(basic.impersonate.as_deref(), Some("7"));

        let bearer = directive(&[("auth_type", "bearer_token"), ("bearer_token_token", "xyz")]);
        assert_eq!(bearer.mode, AuthMode::BearerToken { token: "xyz".into() });
        assert_eq!(bearer.impersonate, None);
    }

    #[test]
    fn test_unknown_auth_type_is_no_auth() {
        assert_eq!(directive(&[("auth_type", "oauth2")]).mode, AuthMode::NoAuth);
        assert_eq!(directive(&[("user", "")]), AuthDirective::default());
    }

    #[test]
    fn test_auth_types_default_selection() {
        let types = auth_types();
        let values: Vec<&str> = types.iter().map(|t| t.value).collect();
        assert_eq!(values, vec!["no_auth", "basic_auth", "bearer_token"]);
        assert_eq!(types.iter().filter(|t| t.select).count(), 1);
        assert!(types[0].select);
    }
}
