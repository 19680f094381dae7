use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClosureError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Closure document error: {message}")]
    Document { message: String },

    #[error("Email template error: {message}")]
    Template { message: String },

    #[error("Failed to send to {recipient}: {message}")]
    Transport { recipient: String, message: String },

    #[error("Missing required argument: {argument}")]
    MissingArgument { argument: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Storage,
    Data,
    Delivery,
    Usage,
    Configuration,
}

impl ClosureError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClosureError::IoError(_) | ClosureError::NotFound { .. } => ErrorCategory::Storage,
            ClosureError::Document { .. } | ClosureError::Template { .. } => ErrorCategory::Data,
            ClosureError::Transport { .. } => ErrorCategory::Delivery,
            ClosureError::MissingArgument { .. } | ClosureError::ValidationError { .. } => {
                ErrorCategory::Usage
            }
            ClosureError::ConfigError { .. }
            | ClosureError::InvalidConfigValueError { .. }
            | ClosureError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    /// Only storage contention and delivery hiccups are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClosureError::IoError(_) | ClosureError::Transport { .. }
        )
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn missing_argument(argument: impl Into<String>) -> Self {
        Self::MissingArgument {
            argument: argument.into(),
        }
    }

    pub fn template(message: impl Into<String>) -> Self {
        Self::Template {
            message: message.into(),
        }
    }

    pub fn document(message: impl Into<String>) -> Self {
        Self::Document {
            message: message.into(),
        }
    }

    pub fn transport(recipient: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            recipient: recipient.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClosureError>;
