// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Reads environment variables, optionally restricted to a prefix.
///
/// With prefix `APP`, the variable `APP_BASE_URL` is exposed as `base_url`.
/// A double underscore marks nesting: `APP_LEDGER__PATH` becomes
/// `ledger.path`.
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix: prefix.map(|p| p.trim_end_matches('_').to_uppercase()),
        }
    }

    pub fn prefixed(prefix: &str) -> Self {
        Self::new(Some(prefix.to_string()))
    }

    /// All matching variables as dotted, lower-case keys.
    pub fn load(&self) -> Result<HashMap<String, String>> {
        let mut config = HashMap::new();

        for (key, value) in env::vars() {
            let stripped = match &self.prefix {
                Some(prefix) => match key.strip_prefix(prefix.as_str()) {
                    Some(rest) if rest.starts_with('_') => rest.trim_start_matches('_'),
                    _ => continue,
                },
                None => key.as_str(),
            };
            if stripped.is_empty() {
                continue;
            }
            config.insert(to_dotted(stripped), value);
        }

        Ok(config)
    }

    fn full_key(&self, key: &str) -> String {
        let key = key.to_uppercase().replace('.', "__");
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key),
            None => key,
        }
    }

    /// Load a single variable; `key` is given without the prefix.
    pub fn load_var(&self, key: &str) -> Result<String> {
        env::var(self.full_key(key)).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Load and parse a single variable. Unset is `Ok(None)`; unparsable is an error.
    pub fn load_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match env::var(self.full_key(key)) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::invalid(self.full_key(key), format!("cannot parse '{}'", raw))),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::EnvError(e)),
        }
    }

    /// Boolean variable; accepts `1/0`, `true/false`, `yes/no`, `on/off`.
    pub fn load_bool(&self, key: &str) -> Result<Option<bool>> {
        match env::var(self.full_key(key)) {
            Ok(raw) => parse_bool(&raw)
                .map(Some)
                .ok_or_else(|| ConfigError::invalid(self.full_key(key), format!("not a boolean: '{}'", raw))),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::EnvError(e)),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

fn to_dotted(key: &str) -> String {
    key.to_lowercase().replace("__", ".")
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
