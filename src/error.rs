use thiserror::Error;

/// Main error type for the SATCHEL clients
#[derive(Error, Debug)]
pub enum SatchelError {
    #[error("Network request failed: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Malformed response for {what}: {message}")]
    Schema { what: String, message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Storage error: {path}")]
    Storage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("General error: {0}")]
    General(#[from] anyhow::Error),
}

impl SatchelError {
    /// Create a schema error for a payload that failed strict decoding
    pub fn schema(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Create a validation error (caught before any network call)
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            SatchelError::Network { .. } => {
                "📡 Could not reach the knowledge base server. Check your API URL.".to_string()
            }
            SatchelError::Unauthorized => "🔒 Unauthorized. Please sign in again.".to_string(),
            SatchelError::RateLimited => "⏳ Rate limit exceeded. Try again later.".to_string(),
            SatchelError::NotFound { what } => format!("🔍 {} was not found on the server.", what),
            SatchelError::Api { message, .. } => message.clone(),
            SatchelError::Schema { what, .. } => {
                format!("🎒 The server sent a malformed {} payload.", what)
            }
            SatchelError::Validation { message } => message.clone(),
            SatchelError::Storage { .. } => {
                "💾 Could not read or write local state. Check file permissions.".to_string()
            }
            SatchelError::Configuration { message } => message.clone(),
            _ => "🎒 Something went wrong. Check the logs for details.".to_string(),
        }
    }
}

impl From<reqwest::Error> for SatchelError {
    fn from(source: reqwest::Error) -> Self {
        Self::Network {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

/// Result type alias for convenience
pub type SatchelResult<T> = Result<T, SatchelError>;
