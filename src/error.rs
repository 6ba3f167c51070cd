use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OrmErrorCode {
    Configuration,
    Serialization,
    Deserialization,
    FailedPrecondition,
    ResourceExhausted,
    Remote,
}

impl OrmErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrmErrorCode::Configuration => "orm/configuration",
            OrmErrorCode::Serialization => "orm/serialization",
            OrmErrorCode::Deserialization => "orm/deserialization",
            OrmErrorCode::FailedPrecondition => "orm/failed-precondition",
            OrmErrorCode::ResourceExhausted => "orm/resource-exhausted",
            OrmErrorCode::Remote => "orm/remote",
        }
    }
}

#[derive(Clone, Debug)]
pub struct OrmError {
    pub code: OrmErrorCode,
    message: String,
}

impl OrmError {
    pub fn new(code: OrmErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for OrmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl Error for OrmError {}

pub type OrmResult<T> = Result<T, OrmError>;

pub fn configuration_error(message: impl Into<String>) -> OrmError {
    OrmError::new(OrmErrorCode::Configuration, message)
}

pub fn serialization_error(message: impl Into<String>) -> OrmError {
    OrmError::new(OrmErrorCode::Serialization, message)
}

pub fn deserialization_error(message: impl Into<String>) -> OrmError {
    OrmError::new(OrmErrorCode::Deserialization, message)
}

pub fn failed_precondition(message: impl Into<String>) -> OrmError {
    OrmError::new(OrmErrorCode::FailedPrecondition, message)
}

pub fn resource_exhausted(message: impl Into<String>) -> OrmError {
    OrmError::new(OrmErrorCode::ResourceExhausted, message)
}

/// Wraps an error reported by the backing document store.
///
/// The message is surfaced unchanged; this layer performs no retries and
/// attaches no interpretation of its own.
pub fn remote_error(message: impl Into<String>) -> OrmError {
    OrmError::new(OrmErrorCode::Remote, message)
}
