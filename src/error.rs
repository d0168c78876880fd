use std::fmt;

use thiserror::Error;

/// Server-declared consequence of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureEffect {
    /// The server already rolled back the enclosing transaction.
    Rollback,
    /// The transaction, if any, is still usable.
    None,
}

impl FailureEffect {
    /// Classify a status code such as `Neo.ClientError.Statement.SyntaxError`.
    ///
    /// Client and database errors roll the transaction back; transient errors
    /// (and codes we cannot classify) leave it alone.
    #[must_use]
    pub fn from_status_code(code: &str) -> Self {
        match code.split('.').nth(1) {
            Some("ClientError" | "DatabaseError") => FailureEffect::Rollback,
            _ => FailureEffect::None,
        }
    }
}

/// A protocol-level failure reported by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportFailure {
    status_code: String,
    message: String,
    effect: FailureEffect,
}

impl TransportFailure {
    /// Build a failure whose effect is derived from the status code.
    pub fn new(status_code: impl Into<String>, message: impl Into<String>) -> Self {
        let status_code = status_code.into();
        let effect = FailureEffect::from_status_code(&status_code);
        Self {
            status_code,
            message: message.into(),
            effect,
        }
    }

    /// Build a failure with an explicit effect, for transports that report it directly.
    pub fn with_effect(
        status_code: impl Into<String>,
        message: impl Into<String>,
        effect: FailureEffect,
    ) -> Self {
        Self {
            status_code: status_code.into(),
            message: message.into(),
            effect,
        }
    }

    #[must_use]
    pub fn status_code(&self) -> &str {
        &self.status_code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn effect(&self) -> FailureEffect {
        self.effect
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status_code)
    }
}

#[derive(Debug, Error)]
pub enum GraphMiddlewareError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Illegal transaction state: {0}")]
    IllegalState(String),

    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    #[error("Transport failure: {0}")]
    Transport(TransportFailure),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[cfg(feature = "http")]
    #[error(transparent)]
    HttpError(#[from] reqwest::Error),
}

impl From<TransportFailure> for GraphMiddlewareError {
    fn from(failure: TransportFailure) -> Self {
        GraphMiddlewareError::Transport(failure)
    }
}

impl GraphMiddlewareError {
    /// Errors raised while talking to an endpoint. These are the ones routed
    /// through the failure event; everything else is a caller or config bug.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        match self {
            GraphMiddlewareError::Transport(_) | GraphMiddlewareError::ConnectionError(_) => true,
            #[cfg(feature = "http")]
            GraphMiddlewareError::HttpError(_) => true,
            _ => false,
        }
    }

    /// The declared effect, when this is a protocol-level failure.
    #[must_use]
    pub fn effect(&self) -> Option<FailureEffect> {
        match self {
            GraphMiddlewareError::Transport(failure) => Some(failure.effect()),
            _ => None,
        }
    }

    /// True when the server declared the enclosing transaction rolled back.
    #[must_use]
    pub fn is_rollback_effect(&self) -> bool {
        self.effect() == Some(FailureEffect::Rollback)
    }

    /// Status code carried by a protocol-level failure.
    #[must_use]
    pub fn status_code(&self) -> Option<&str> {
        match self {
            GraphMiddlewareError::Transport(failure) => Some(failure.status_code()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_status_codes() {
        assert_eq!(
            FailureEffect::from_status_code("Neo.ClientError.Statement.SyntaxError"),
            FailureEffect::Rollback
        );
        assert_eq!(
            FailureEffect::from_status_code("Neo.DatabaseError.General.UnknownError"),
            FailureEffect::Rollback
        );
        assert_eq!(
            FailureEffect::from_status_code("Neo.TransientError.Transaction.DeadlockDetected"),
            FailureEffect::None
        );
        assert_eq!(FailureEffect::from_status_code("garbage"), FailureEffect::None);
    }

    #[test]
    fn only_transport_errors_are_transport() {
        let failure = TransportFailure::new("Neo.ClientError.Statement.SyntaxError", "bad");
        let err: GraphMiddlewareError = failure.into();
        assert!(err.is_transport());
        assert!(err.is_rollback_effect());
        assert_eq!(err.status_code(), Some("Neo.ClientError.Statement.SyntaxError"));

        let err = GraphMiddlewareError::IllegalState("closed".into());
        assert!(!err.is_transport());
        assert_eq!(err.effect(), None);
    }
}
