//! Error taxonomy for the decision engine.
//!
//! None of these reach the user. `process_signals` folds every one of them
//! into "no intervention"; only `ConfigError` is surfaced, once, at startup.

use thiserror::Error;

/// A sample rejected at ingestion. Aggregator state is untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("score {0} is outside [0, 1]")]
    OutOfRange(f64),

    #[error("score is not a finite number")]
    NotFinite,
}

/// Failure reaching the reasoning service.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("service returned status {0}")]
    Status(u16),

    #[error("call exceeded {0} ms")]
    Timeout(u64),

    #[error("call cancelled by session end")]
    Cancelled,
}

impl TransportError {
    /// Content-free label for telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Request(_) => "request",
            TransportError::Status(_) => "status",
            TransportError::Timeout(_) => "timeout",
            TransportError::Cancelled => "cancelled",
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            TransportError::Status(status.as_u16())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// The service reply did not fit the closed action schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseSchemaError {
    #[error("reply contains no parseable JSON object")]
    Unparseable,

    #[error("reply root is not an object")]
    NotAnObject,

    #[error("reply has no action type")]
    MissingAction,

    #[error("unknown action type")]
    UnknownAction,

    #[error("field `{0}` is missing or has the wrong type")]
    InvalidField(&'static str),

    #[error("field `{0}` is empty")]
    EmptyField(&'static str),

    #[error("quiz must have exactly 4 options, got {0}")]
    OptionCount(usize),

    #[error("quiz correctIndex {0} is out of range")]
    CorrectIndexOutOfRange(i64),
}

impl ResponseSchemaError {
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseSchemaError::Unparseable => "unparseable",
            ResponseSchemaError::NotAnObject => "not_an_object",
            ResponseSchemaError::MissingAction => "missing_action",
            ResponseSchemaError::UnknownAction => "unknown_action",
            ResponseSchemaError::InvalidField(_) => "invalid_field",
            ResponseSchemaError::EmptyField(_) => "empty_field",
            ResponseSchemaError::OptionCount(_) => "option_count",
            ResponseSchemaError::CorrectIndexOutOfRange(_) => "correct_index",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing credential: set {0}")]
    MissingCredential(&'static str),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}
