//! Tester configuration.
//!
//! Loaded from the `api_tester` section of a [`ConfigManager`] or from
//! `API_TESTER_*` environment variables:
//!
//! ```text
//! API_TESTER_PREFIX=api
//! API_TESTER_GUARD=api
//! API_TESTER_BASE_URL=http://localhost
//! API_TESTER_LEDGER__ENABLED=true
//! API_TESTER_LEDGER__PATH=storage/api-tester/api-tester.json
//! API_TESTER_LEDGER__MAX_ENTRIES=200
//! ```
//!
//! The user retriever hook cannot be expressed in a file and is set in code
//! with [`ApiTesterConfig::with_user_retriever`].

use armature_config::{ConfigManager, ConfigValidator, EnvLoader, Validate};
use armature_core::Principal;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_LEDGER_PATH: &str = "storage/api-tester/api-tester.json";

/// Looks up the principal to impersonate for a user id.
#[async_trait]
pub trait UserRetriever: Send + Sync {
    async fn retrieve(&self, id: &str) -> Option<Principal>;
}

#[async_trait]
impl<F> UserRetriever for F
where
    F: Fn(&str) -> Option<Principal> + Send + Sync,
{
    async fn retrieve(&self, id: &str) -> Option<Principal> {
        self(id)
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiTesterConfig {
    /// Only routes whose URI starts with this are listed.
    pub prefix: String,
    /// Guard whose user provider resolves impersonated users.
    pub guard: String,
    /// Prepended to relative URIs.
    pub base_url: String,
    pub ledger: LedgerConfig,
    #[serde(skip)]
    pub user_retriever: Option<Arc<dyn UserRetriever>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub enabled: bool,
    pub path: String,
    /// Newest entries returned by a read; all of them when unset.
    pub max_entries: Option<usize>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: DEFAULT_LEDGER_PATH.to_string(),
            max_entries: None,
        }
    }
}

impl Default for ApiTesterConfig {
    fn default() -> Self {
        Self {
            prefix: "api".to_string(),
            guard: "api".to_string(),
            base_url: "http://localhost".to_string(),
            ledger: LedgerConfig::default(),
            user_retriever: None,
        }
    }
}

impl fmt::Debug for ApiTesterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiTesterConfig")
            .field("prefix", &self.prefix)
            .field("guard", &self.guard)
            .field("base_url", &self.base_url)
            .field("ledger", &self.ledger)
            .field("user_retriever", &self.user_retriever.is_some())
            .finish()
    }
}

impl ApiTesterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_guard(mut self, guard: impl Into<String>) -> Self {
        self.guard = guard.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_ledger(mut self, ledger: LedgerConfig) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_user_retriever<R: UserRetriever + 'static>(mut self, retriever: R) -> Self {
        self.user_retriever = Some(Arc::new(retriever));
        self
    }

    /// Read the `api_tester` section, falling back to defaults when absent.
    pub fn from_config(config: &ConfigManager) -> armature_config::Result<Self> {
        if config.has("api_tester") {
            config.section("api_tester")
        } else {
            let defaults = Self::default();
            defaults.validate()?;
            Ok(defaults)
        }
    }

    /// Read `API_TESTER_*` variables over the defaults.
    pub fn from_env() -> armature_config::Result<Self> {
        let env = EnvLoader::prefixed("API_TESTER");
        let mut config = Self::default();

        if let Some(prefix) = env.load_parsed::<String>("prefix")? {
            config.prefix = prefix;
        }
        if let Some(guard) = env.load_parsed::<String>("guard")? {
            config.guard = guard;
        }
        if let Some(base_url) = env.load_parsed::<String>("base_url")? {
            config.base_url = base_url;
        }
        if let Some(enabled) = env.load_bool("ledger.enabled")? {
            config.ledger.enabled = enabled;
        }
        if let Some(path) = env.load_parsed::<String>("ledger.path")? {
            config.ledger.path = path;
        }
        if let Some(max) = env.load_parsed::<usize>("ledger.max_entries")? {
            config.ledger.max_entries = Some(max);
        }

        config.validate()?;
        Ok(config)
    }
}

impl Validate for ApiTesterConfig {
    fn validate(&self) -> armature_config::Result<()> {
        ConfigValidator::not_empty(&self.prefix, "api_tester.prefix")?;
        ConfigValidator::not_empty(&self.guard, "api_tester.guard")?;
        ConfigValidator::is_url(&self.base_url, "api_tester.base_url")?;
        if self.ledger.enabled {
            ConfigValidator::is_file_path(&self.ledger.path, "api_tester.ledger.path")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = ApiTesterConfig::default();
        assert_eq!(config.prefix, "api");
        assert_eq!(config.guard, "api");
        assert_eq!(config.base_url, "http://localhost");
        assert!(!config.ledger.enabled);
        assert_eq!(config.ledger.path, DEFAULT_LEDGER_PATH);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_config_section() {
        let manager = ConfigManager::new();
        manager
            .set(
                "api_tester",
                json!({
                    "prefix": "v2",
                    "base_url": "https://app.test",
                    "ledger": { "enabled": true, "max_entries": 50 }
                }),
            )
            .unwrap();

        let config = ApiTesterConfig::from_config(&manager).unwrap();
        assert_eq!(config.prefix, "v2");
        assert_eq!(config.guard, "api");
        assert_eq!(config.base_url, "https://app.test");
        assert!(config.ledger.enabled);
        assert_eq!(config.ledger.path, DEFAULT_LEDGER_PATH);
        assert_eq!(config.ledger.max_entries, Some(50));
    }

    #[test]
    fn test_from_config_without_section() {
        let config = ApiTesterConfig::from_config(&ConfigManager::new()).unwrap();
        assert_eq!(config.prefix, "api");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(ApiTesterConfig::new().with_base_url("ftp://x").validate().is_err());
        assert!(ApiTesterConfig::new().with_prefix("  ").validate().is_err());
        assert!(ApiTesterConfig::new().with_guard("").validate().is_err());

        let manager = ConfigManager::new();
        manager.set("api_tester.base_url", "localhost").unwrap();
        assert!(ApiTesterConfig::from_config(&manager).is_err());
    }

    #[tokio::test]
    async fn test_closure_user_retriever() {
        let config = ApiTesterConfig::new().with_user_retriever(|id: &str| {
            (id == "7").then(|| Principal::new("7").with_name("Ada"))
        });

        let retriever = config.user_retriever.clone().unwrap();
        assert_eq!(retriever.retrieve("7").await.unwrap().name.as_deref(), Some("Ada"));
        assert!(retriever.retrieve("8").await.is_none());
        assert!(format!("{:?}", config).contains("user_retriever: true"));
    }
}
