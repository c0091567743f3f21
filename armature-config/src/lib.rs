//! Configuration management for Armature applications.
//!
//! [`ConfigManager`] holds one JSON tree assembled from files (JSON, TOML,
//! `.env`) and environment variables. Keys are dotted paths into that tree,
//! so `api_tester.ledger.path` addresses a nested section value. Later
//! sources overwrite earlier ones key by key.
//!
//! ```
//! use armature_config::ConfigManager;
//!
//! let config = ConfigManager::new();
//! config.set("api_tester.prefix", "v1").unwrap();
//!
//! let prefix: String = config.get("api_tester.prefix").unwrap();
//! assert_eq!(prefix, "v1");
//! assert!(config.has("api_tester"));
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

/// Main configuration manager
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Value>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(Value::Object(Map::new()))),
            env_prefix: None,
        }
    }

    /// Manager whose [`load_env`](Self::load_env) only reads `PREFIX_*` variables.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: Some(prefix.into()),
            ..Self::new()
        }
    }

    /// Merge environment variables into the tree.
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let env_vars = loader.load()?;

        let mut config = self.config.write();
        for (key, value) in env_vars {
            insert_dotted(&mut config, &key, Value::String(value));
        }

        Ok(())
    }

    /// Load a `.env` file into the process environment, then merge the
    /// environment. A missing default `.env` is not an error.
    pub fn load_dotenv(&self, path: Option<&str>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env()
    }

    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        self.merge_value(data);
        Ok(())
    }

    /// Load a file, picking the format from its name.
    pub fn load_auto(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::auto(path)?.load_file(path)?;
        self.merge_value(data);
        Ok(())
    }

    fn merge_value(&self, data: Value) {
        let mut config = self.config.write();
        if let Value::Object(map) = data {
            for (key, value) in map {
                merge_into(&mut config, &key, value);
            }
        }
    }

    /// Set a value at a dotted key, creating intermediate sections.
    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        insert_dotted(&mut self.config.write(), key, json_value);
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .raw(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value)
            .map_err(|e| ConfigError::DeserializationError(format!("{}: {}", key, e)))
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Raw JSON value at a dotted key.
    pub fn raw(&self, key: &str) -> Option<Value> {
        let config = self.config.read();
        lookup(&config, key).cloned()
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    /// Integer value; numeric strings (as loaded from the environment) are accepted.
    pub fn get_int(&self, key: &str) -> Result<i64> {
        match self.raw(key) {
            Some(Value::String(s)) => s
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(key, format!("not an integer: '{}'", s))),
            _ => self.get(key),
        }
    }

    /// Boolean value; `"true"`, `"1"`, `"yes"` and friends are accepted.
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        match self.raw(key) {
            Some(Value::String(s)) => env::parse_bool(&s)
                .ok_or_else(|| ConfigError::invalid(key, format!("not a boolean: '{}'", s))),
            _ => self.get(key),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        let config = self.config.read();
        lookup(&config, key).is_some()
    }

    /// Top-level keys.
    pub fn keys(&self) -> Vec<String> {
        let config = self.config.read();
        config
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Merge another manager's values over this one's.
    pub fn merge(&self, other: &ConfigManager) -> Result<()> {
        if Arc::ptr_eq(&self.config, &other.config) {
            return Ok(());
        }
        let snapshot = other.config.read().clone();
        self.merge_value(snapshot);
        Ok(())
    }

    /// Deserialize and validate the section at `key`.
    pub fn section<T: DeserializeOwned + Validate>(&self, key: &str) -> Result<T> {
        let section: T = self.get(key)?;
        section.validate()?;
        Ok(section)
    }

    /// Deserialize and validate the whole tree.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let snapshot = self.config.read().clone();
        let validated: T = serde_json::from_value(snapshot)
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;

        validated.validate()?;

        Ok(validated)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

/// Insert `value` at a dotted key. Scalars in the way are replaced by sections.
pub(crate) fn insert_dotted(root: &mut Value, key: &str, value: Value) {
    let segments: Vec<&str> = key.split('.').filter(|s| !s.is_empty()).collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut node = root;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Some(map) = node.as_object_mut() else {
            return;
        };
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.to_string(), value);
    }
}

/// Deep-merge: objects merge key by key, everything else overwrites.
fn merge_into(root: &mut Value, key: &str, value: Value) {
    let Some(map) = root.as_object_mut() else {
        return;
    };
    if let Value::Object(incoming) = value {
        if let Some(existing) = map.get_mut(key).filter(|v| v.is_object()) {
            for (k, v) in incoming {
                merge_into(existing, &k, v);
            }
            return;
        }
        map.insert(key.to_string(), Value::Object(incoming));
    } else {
        map.insert(key.to_string(), value);
    }
}
