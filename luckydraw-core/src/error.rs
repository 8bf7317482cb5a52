use thiserror::Error;

pub type Result<T> = std::result::Result<T, DrawError>;

/// Upper bound for any prize count accepted from a caller.
pub const MAX_PRIZE_COUNT: u32 = 10_000;

/// Longest prize name accepted, counted in characters after trimming.
pub const MAX_NAME_LEN: usize = 50;

#[derive(Error, Debug)]
pub enum DrawError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Prize not found: {id}")]
    NotFound { id: String },

    #[error("Prize {name} ({id}) has no remaining count")]
    Depleted { id: String, name: String },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejected caller input. Every variant is reported before any state changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Prize ID must be a non-empty string")]
    EmptyId,

    #[error("Prize name must be a non-empty string")]
    EmptyName,

    #[error("Prize name must not exceed 50 characters (got {len})")]
    NameTooLong { len: usize },

    #[error("Prize count must be a number")]
    CountNotNumber,

    #[error("Prize count must be an integer")]
    CountNotInteger,

    #[error("Prize count must be a positive integer")]
    CountNotPositive,

    #[error("Prize count must be non-negative")]
    CountNegative,

    #[error("Prize count must not exceed 10000")]
    CountTooLarge,
}

impl DrawError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// True for the caller-facing failures that leave state untouched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::NotFound { .. } | Self::Depleted { .. }
        )
    }
}
