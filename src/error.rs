// Error types for the API tester

use armature_config::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiTesterError {
    /// A route's handler reference points at nothing the docs registry knows.
    #[error("Invalid route action: [{0}]")]
    UnresolvedHandler(String),

    /// Missing method or URI, or a method the host cannot route.
    #[error("Invalid invocation: {0}")]
    InvalidInvocation(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Invocation ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ApiTesterError>;

impl From<ApiTesterError> for armature_core::Error {
    fn from(err: ApiTesterError) -> Self {
        match err {
            ApiTesterError::InvalidInvocation(message) => armature_core::Error::BadRequest(message),
            other => armature_core::Error::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_invocation_is_bad_request() {
        let err: armature_core::Error =
            ApiTesterError::InvalidInvocation("Method and URI are required.".into()).into();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.message(), "Method and URI are required.");
    }

    #[test]
    fn test_other_errors_are_internal() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: armature_core::Error = ApiTesterError::from(LedgerError::from(io)).into();
        assert_eq!(err.status_code(), 500);
        assert_eq!(
            ApiTesterError::UnresolvedHandler("ShowProfile".into()).to_string(),
            "Invalid route action: [ShowProfile]"
        );
    }
}
