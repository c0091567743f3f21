//! Principals, user providers and guards.
//!
//! A [`Principal`] is the authenticated identity attached to a request. The
//! [`AuthManager`] maps guard names (`"api"`, `"web"`, ...) to the
//! [`UserProvider`] that can look users up by id.
//!
//! The principal travels on the request itself, so there is no process-wide
//! "current user" to install or restore.

use crate::middleware::{Middleware, Next};
use crate::{Error, HttpRequest, HttpResponse};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
    /// Guard that produced this principal.
    pub guard: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            roles: Vec::new(),
            guard: None,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Looks users up for a guard.
#[async_trait]
pub trait UserProvider: Send + Sync {
    async fn retrieve_by_id(&self, id: &str) -> Result<Option<Principal>, Error>;
}

/// User provider backed by a map, for small hosts and tests.
#[derive(Default)]
pub struct InMemoryUserProvider {
    users: RwLock<HashMap<String, Principal>>,
}

impl InMemoryUserProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, principal: Principal) -> Self {
        self.insert(principal);
        self
    }

    pub fn insert(&self, principal: Principal) {
        self.users.write().insert(principal.id.clone(), principal);
    }
}

#[async_trait]
impl UserProvider for InMemoryUserProvider {
    async fn retrieve_by_id(&self, id: &str) -> Result<Option<Principal>, Error> {
        Ok(self.users.read().get(id).cloned())
    }
}

/// Registry of guards and their user providers.
#[derive(Clone, Default)]
pub struct AuthManager {
    providers: HashMap<String, Arc<dyn UserProvider>>,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` as the user source for `guard`.
    pub fn with_guard<P: UserProvider + 'static>(mut self, guard: impl Into<String>, provider: P) -> Self {
        self.providers.insert(guard.into(), Arc::new(provider));
        self
    }

    pub fn register(&mut self, guard: impl Into<String>, provider: Arc<dyn UserProvider>) {
        self.providers.insert(guard.into(), provider);
    }

    pub fn provider(&self, guard: &str) -> Option<Arc<dyn UserProvider>> {
        self.providers.get(guard).cloned()
    }

    pub fn has_guard(&self, guard: &str) -> bool {
        self.providers.contains_key(guard)
    }

    /// Look a user up through `guard`. Unknown guards are an error.
    pub async fn retrieve(&self, guard: &str, id: &str) -> Result<Option<Principal>, Error> {
        let provider = self
            .provider(guard)
            .ok_or_else(|| Error::Internal(format!("Auth guard [{}] is not defined", guard)))?;
        let principal = provider.retrieve_by_id(id).await?;
        Ok(principal.map(|p| p.with_guard(guard)))
    }
}

/// Rejects requests that carry no principal.
pub struct Authenticate;

#[async_trait]
impl Middleware for Authenticate {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        if req.principal.is_none() {
            return Err(Error::Unauthorized("Unauthenticated.".to_string()));
        }
        next(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_provider_lookup() {
        let provider = InMemoryUserProvider::new().with_user(Principal::new("7").with_name("Ada"));

        let found = provider.retrieve_by_id("7").await.unwrap();
        assert_eq!(found.and_then(|p| p.name), Some("Ada".to_string()));
        assert!(provider.retrieve_by_id("8").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_manager_tags_principal_with_guard() {
        let auth = AuthManager::new().with_guard(
            "api",
            InMemoryUserProvider::new().with_user(Principal::new("1")),
        );

        let principal = auth.retrieve("api", "1").await.unwrap().unwrap();
        assert_eq!(principal.guard.as_deref(), Some("api"));
    }

    #[tokio::test]
    async fn test_manager_unknown_guard() {
        let auth = AuthManager::new();
        assert!(auth.retrieve("admin", "1").await.is_err());
        assert!(!auth.has_guard("admin"));
    }

    #[test]
    fn test_principal_roles() {
        let p = Principal::new("1").with_role("admin");
        assert!(p.has_role("admin"));
        assert!(!p.has_role("editor"));
    }
}
