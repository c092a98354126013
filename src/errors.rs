use thiserror::Error;

// Errors raised while loading site configuration or calling template functions.
// The engine never lets these escape `process`; they end up as inline markers
// or logged fallbacks.
#[derive(Debug, Error)]
pub enum JstError {
    // Reading a config file or include failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // A config file is not valid JSON
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    // A config file parsed but has the wrong shape
    #[error("config error: {0}")]
    Config(String),

    // A template function rejected its input
    #[error("{0}")]
    Function(String),

    // A function name that is not a plain identifier
    #[error("invalid function name: {0:?}")]
    InvalidName(String),
}

impl JstError {
    /// Shorthand for functions reporting a failure.
    pub fn function(msg: impl Into<String>) -> Self {
        JstError::Function(msg.into())
    }
}

// Type alias for results that use `JstError` as the error type
pub type Result<T> = std::result::Result<T, JstError>;
