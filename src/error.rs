//! Shared error conventions.
//!
//! Each module owns its `thiserror` enum. This trait gives hosts a stable
//! machine code per variant and tells them whether the message is meant for
//! the end user (a toast/banner) or only for logs.

/// Stable error code plus user-visibility classification.
pub trait ErrorCode: std::fmt::Display {
    /// Stable machine-readable code, e.g. `"E_SELECTION_LIMIT"`.
    fn error_code(&self) -> &'static str;

    /// Whether the error message should be shown to the end user.
    fn user_facing(&self) -> bool {
        false
    }
}

/// Errors raised while assembling a coordinator from its parts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Two column descriptors share the same key.
    #[error("duplicate column key: {0}")]
    DuplicateColumn(String),

    /// An environment value was present but unparseable.
    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateColumn(_) => "E_DUPLICATE_COLUMN",
            Self::InvalidEnv { .. } => "E_INVALID_ENV",
        }
    }
}
