//! Error types for memos-sync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=prerequisite, 3=auth, 5=transport, etc.)
//! - Retryability flags
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Failures of a single block are collected as
//! [`crate::sync::ItemFailure`] in the run report instead of aborting the
//! run. Failed memo writes still hold the checkpoint back
//! ([`Error::Incomplete`]).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for memos-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Prerequisite (exit 2)
    MissingConfig,
    NotebookNotFound,

    // Auth (exit 3)
    Unauthorized,

    // Validation (exit 4)
    InvalidArgument,

    // Transport (exit 5)
    TransportError,
    UnreachableService,

    // Target store contract (exit 6)
    ApiError,
    SyncIncomplete,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Concurrency (exit 9)
    AlreadySyncing,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::MissingConfig => "MISSING_CONFIG",
            Self::NotebookNotFound => "NOTEBOOK_NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::UnreachableService => "UNREACHABLE_SERVICE",
            Self::ApiError => "API_ERROR",
            Self::SyncIncomplete => "SYNC_INCOMPLETE",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::AlreadySyncing => "ALREADY_SYNCING",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-9).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::MissingConfig | Self::NotebookNotFound => 2,
            Self::Unauthorized => 3,
            Self::InvalidArgument => 4,
            Self::TransportError | Self::UnreachableService => 5,
            Self::ApiError | Self::SyncIncomplete => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
            Self::AlreadySyncing => 9,
        }
    }

    /// Whether running the same command again may succeed without changes.
    ///
    /// True for transient network failures, a concurrent run and a run whose
    /// unwritten memos are picked up again by the next one. False for
    /// configuration and credential problems.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransportError
                | Self::UnreachableService
                | Self::AlreadySyncing
                | Self::SyncIncomplete
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can abort a memos-sync operation.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Missing required setting: {field}")]
    MissingConfig { field: &'static str },

    #[error("Notebook not found: {id}")]
    NotebookNotFound { id: String },

    #[error("Access token rejected by {service}")]
    Unauthorized { service: &'static str },

    #[error("{service} HTTP error! status: {status}")]
    Transport {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} request failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("SiYuan API {endpoint} failed (code {code}): {msg}")]
    Api {
        endpoint: String,
        code: i64,
        msg: String,
    },

    #[error("A sync is already running")]
    AlreadySyncing,

    #[error("{failed} memo(s) could not be written; checkpoint left unchanged")]
    Incomplete { failed: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not readable at {path}: {message}")]
    ConfigFile { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::MissingConfig { .. } => ErrorCode::MissingConfig,
            Self::NotebookNotFound { .. } => ErrorCode::NotebookNotFound,
            Self::Unauthorized { .. } => ErrorCode::Unauthorized,
            Self::Transport { .. } => ErrorCode::TransportError,
            Self::Request { .. } => ErrorCode::UnreachableService,
            Self::Api { .. } => ErrorCode::ApiError,
            Self::AlreadySyncing => ErrorCode::AlreadySyncing,
            Self::Incomplete { .. } => ErrorCode::SyncIncomplete,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) | Self::ConfigFile { .. } => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::MissingConfig { field } => Some(format!(
                "Set it with `memos-sync config set --{}` and check `memos-sync config show`.",
                field.replace('_', "-")
            )),

            Self::NotebookNotFound { .. } => Some(
                "The configured notebook is missing or closed. \
                 Run `memos-sync notebooks` and pick an open one."
                    .to_string(),
            ),

            Self::Unauthorized { service } => Some(format!(
                "Generate a new access token in {service} and save it with `memos-sync config set`."
            )),

            Self::Request { service, .. } => Some(format!(
                "Is {service} running and is the base URL correct (no trailing '/')?"
            )),

            Self::AlreadySyncing => Some(
                "Wait for the running sync to finish, then try again. \
                 If none is running, remove the `.lock` file next to the config."
                    .to_string(),
            ),

            Self::Incomplete { .. } => Some(
                "The next `memos-sync sync` writes the same memos again.".to_string(),
            ),

            Self::ConfigFile { path, .. } => Some(format!(
                "Fix or remove {} and run `memos-sync config show` again.",
                path.display()
            )),

            Self::Transport { .. }
            | Self::Api { .. }
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
