use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Conditions that stop the server from starting or keep the loop from running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

impl ServerError {
    pub fn io(context: &'static str) -> impl FnOnce(io::Error) -> ServerError {
        move |source| ServerError::Io { context, source }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown flag '{0}'")]
    UnknownFlag(String),

    #[error("missing value for '{0}'")]
    MissingValue(String),

    #[error("invalid value '{value}' for '{flag}'")]
    InvalidValue { flag: String, value: String },

    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),
}
