// Configuration validation

use crate::{ConfigError, Result};

/// Implemented by configuration sections that can check themselves after loading.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable field checks for [`Validate`] implementations.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
        Ok(())
    }

    /// Accepts `http://` and `https://` URLs.
    pub fn is_url(value: &str, field: &str) -> Result<()> {
        if !value.starts_with("http://") && !value.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "{} must be an http(s) URL, got '{}'",
                field, value
            )));
        }
        Ok(())
    }

    /// A relative or absolute file path, not a directory.
    pub fn is_file_path(value: &str, field: &str) -> Result<()> {
        Self::not_empty(value, field)?;
        if value.ends_with('/') || value.ends_with('\\') {
            return Err(ConfigError::ValidationError(format!(
                "{} must name a file, got directory '{}'",
                field, value
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("", "field").is_err());
        assert!(ConfigValidator::not_empty("   ", "field").is_err());
    }

    #[test]
    fn test_url_validation() {
        assert!(ConfigValidator::is_url("https://example.com", "field").is_ok());
        assert!(ConfigValidator::is_url("http://localhost", "field").is_ok());
        assert!(ConfigValidator::is_url("example.com", "field").is_err());
    }

    #[test]
    fn test_file_path_validation() {
        assert!(ConfigValidator::is_file_path("storage/log.json", "path").is_ok());
        assert!(ConfigValidator::is_file_path("storage/", "path").is_err());
        assert!(ConfigValidator::is_file_path("", "path").is_err());
    }
}
