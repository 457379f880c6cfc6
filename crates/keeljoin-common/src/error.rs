use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
pub enum Error {
    Capacity(String),
    InvalidState(String),
    ContractViolation(String),
    UnsupportedType(String),
    InvalidArgument(String),
    Config(String),
    Arrow(String),
    Internal(String),
}

impl Error {
    pub fn capacity(msg: impl Into<String>) -> Self {
        Error::Capacity(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Error::InvalidState(msg.into())
    }

    pub fn contract_violation(msg: impl Into<String>) -> Self {
        Error::ContractViolation(msg.into())
    }

    pub fn unsupported_type(msg: impl Into<String>) -> Self {
        Error::UnsupportedType(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn arrow(msg: impl Into<String>) -> Self {
        Error::Arrow(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Contract violations signal caller misuse, not bad input data, and are
    /// never worth retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ContractViolation(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Capacity(msg) => write!(f, "Capacity error: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::ContractViolation(msg) => write!(f, "Contract violation: {}", msg),
            Error::UnsupportedType(msg) => write!(f, "Unsupported type: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Arrow(msg) => write!(f, "Arrow error: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
