//! Error types for the cloudsaver CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (3=not_found, 4=validation, 6=remote, etc.)
//! - Retryability flags
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Only setup failures reach the process exit code. Errors raised while
//! walking a tree are logged by the sync engine and counted in the report.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cloudsaver operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Not Found (exit 3)
    LocalRootNotFound,
    RemoteNotFound,

    // Validation (exit 4)
    InvalidArgument,
    NotAContainer,

    // Remote (exit 6)
    RemoteError,
    NetworkError,

    // Config (exit 7)
    ConfigError,
    MissingCredentials,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::LocalRootNotFound => "LOCAL_ROOT_NOT_FOUND",
            Self::RemoteNotFound => "REMOTE_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotAContainer => "NOT_A_CONTAINER",
            Self::RemoteError => "REMOTE_ERROR",
            Self::NetworkError => "NETWORK_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::MissingCredentials => "MISSING_CREDENTIALS",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::LocalRootNotFound | Self::RemoteNotFound => 3,
            Self::InvalidArgument | Self::NotAContainer => 4,
            Self::RemoteError | Self::NetworkError => 6,
            Self::ConfigError | Self::MissingCredentials => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether running the same command again may succeed without changes.
    ///
    /// True for network failures and remote-side errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError | Self::RemoteError)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in cloudsaver operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Local folder not found: {}", path.display())]
    LocalRootNotFound { path: PathBuf },

    #[error("Remote entry not found: {id}")]
    RemoteNotFound { id: String },

    #[error("Remote entry '{name}' ({id}) is not a folder")]
    NotAContainer { id: String, name: String },

    #[error("No access token configured")]
    MissingCredentials,

    #[error("Remote request failed with status {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::LocalRootNotFound { .. } => ErrorCode::LocalRootNotFound,
            Self::RemoteNotFound { .. } => ErrorCode::RemoteNotFound,
            Self::NotAContainer { .. } => ErrorCode::NotAContainer,
            Self::MissingCredentials => ErrorCode::MissingCredentials,
            Self::Remote { .. } => ErrorCode::RemoteError,
            Self::Http(_) => ErrorCode::NetworkError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
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
            Self::LocalRootNotFound { path } => Some(format!(
                "Create '{}' first or pass another folder with --local-folder.",
                path.display()
            )),

            Self::RemoteNotFound { id } => Some(format!(
                "No Drive folder with ID '{id}' is visible to this token. \
                 Check --folder-id and that the folder is shared with the account."
            )),

            Self::NotAContainer { .. } => {
                Some("--folder-id must point at a Drive folder, not a file.".to_string())
            }

            Self::MissingCredentials => Some(
                "Pass --token, set CLOUDSAVER_TOKEN, or add \"accessToken\" to the config file.\n  \
                 A short-lived token can be printed with: gcloud auth print-access-token"
                    .to_string(),
            ),

            Self::Remote { status: 401 | 403, .. } => {
                Some("The access token was rejected. Obtain a fresh token and retry.".to_string())
            }

            Self::Http(_) => Some("Check the network connection and retry.".to_string()),

            Self::Remote { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
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
