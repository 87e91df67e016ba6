use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Failures that stop the process before (or while) it serves requests.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("Missing required configuration: {0}")]
    MissingConfiguration(&'static str),

    #[error("Logging setup failed: {0}")]
    Logger(String),

    #[error("Invalid SERVER_ADDR: {0}")]
    InvalidAddr(String),

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Server error: {0}")]
    Server(String),
}

/// What a validation failure reports back to the client.
///
/// Either a single message or a per-field breakdown, serialised as-is under
/// the `error` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ValidationDetail {
    Message(String),
    Fields(BTreeMap<String, Vec<String>>),
}

impl fmt::Display for ValidationDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationDetail::Message(m) => f.write_str(m),
            ValidationDetail::Fields(fields) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|(field, msgs)| format!("{field}: {}", msgs.join(", ")))
                    .collect();
                f.write_str(&parts.join("; "))
            }
        }
    }
}

/// An error nobody classified. Keeps the backtrace from where it was built.
pub struct UnexpectedError {
    message: String,
    trace: Backtrace,
}

impl UnexpectedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: Backtrace::force_capture(),
        }
    }

    /// For panics caught after unwinding, where a backtrace taken here
    /// would only show the catcher.
    pub fn from_panic(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            trace: Backtrace::disabled(),
        }
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.trace
    }
}

impl fmt::Debug for UnexpectedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnexpectedError")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for UnexpectedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Classified handler failure. The dispatcher turns each variant into a
/// status code and JSON body.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(ValidationDetail),

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    Database(String),

    #[error("{0}")]
    Unexpected(UnexpectedError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(ValidationDetail::Message(message.into()))
    }

    pub fn invalid_fields<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, msgs)| (k.into(), msgs.into_iter().map(Into::into).collect()))
            .collect();
        ServiceError::Validation(ValidationDetail::Fields(fields))
    }

    pub fn authentication_failed() -> Self {
        ServiceError::Authentication("Authentication failed".to_string())
    }

    pub fn authorization_failed() -> Self {
        ServiceError::Authorization("Authorization failed".to_string())
    }

    pub fn database_failed() -> Self {
        ServiceError::Database("Database operation failed".to_string())
    }

    pub fn unexpected(err: impl fmt::Display) -> Self {
        ServiceError::Unexpected(UnexpectedError::new(err.to_string()))
    }
}

// Body decoding is the only schema layer; a malformed payload is the client's fault.
impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::validation(err.to_string())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_errors_serialise_as_a_map() {
        let err = ServiceError::invalid_fields([("email", vec!["Not a valid email."])]);
        let ServiceError::Validation(detail) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            serde_json::to_value(&detail).unwrap(),
            json!({"email": ["Not a valid email."]})
        );
        assert_eq!(detail.to_string(), "email: Not a valid email.");
    }

    #[test]
    fn default_messages() {
        assert_eq!(ServiceError::authentication_failed().to_string(), "Authentication failed");
        assert_eq!(ServiceError::authorization_failed().to_string(), "Authorization failed");
        assert_eq!(ServiceError::database_failed().to_string(), "Database operation failed");
    }

    #[test]
    fn malformed_json_is_a_validation_error() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(
            ServiceError::from(err),
            ServiceError::Validation(ValidationDetail::Message(_))
        ));
    }

    #[test]
    fn sqlx_errors_are_database_failures() {
        let err = ServiceError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, ServiceError::Database(_)));
    }

    #[test]
    fn panic_errors_carry_no_backtrace() {
        let err = UnexpectedError::from_panic("boom");
        assert_ne!(err.backtrace().status(), std::backtrace::BacktraceStatus::Captured);
        let err = UnexpectedError::new("boom");
        assert_eq!(err.backtrace().status(), std::backtrace::BacktraceStatus::Captured);
    }

    #[test]
    fn unknown_environment_message() {
        let err = AppError::UnknownEnvironment("unknown_env".into());
        assert!(err.to_string().contains("Unknown environment: unknown_env"));
    }
}
