//! Error types shared across the engine, registry and store.

use crate::types::ChannelId;

/// Rejected session configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_rounds must be between 1 and 20, got {0}")]
    MaxRoundsOutOfRange(u32),

    #[error("voting_time must be between 5 and 60 seconds, got {0}")]
    VotingTimeOutOfRange(u32),
}

/// Errors returned synchronously when starting a session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("a game is already running in channel {channel_id}")]
    Conflict { channel_id: ChannelId },

    #[error("unknown theme: {0}")]
    UnknownTheme(String),

    #[error("theme {0} has no matchups")]
    EmptyQuestionPool(String),
}

impl SessionError {
    /// Stable code for protocol error replies
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::InvalidConfig(_) => "INVALID_CONFIG",
            SessionError::Conflict { .. } => "SESSION_CONFLICT",
            SessionError::UnknownTheme(_) => "UNKNOWN_THEME",
            SessionError::EmptyQuestionPool(_) => "EMPTY_POOL",
        }
    }
}

/// Result type for stats store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by the stats store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),

    #[error("store task failed: {0}")]
    Task(String),

    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Task(err.to_string())
    }
}
