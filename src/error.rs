//! Error types for the docbot library.
//!
//! Every failure a conversion job can hit is a [`ConvertError`]. The bot
//! never shows these to the end user verbatim: [`ConvertError::category`]
//! folds them into a [`FailureCategory`], and each category has exactly one
//! user-facing notification. The detailed message stays in the logs.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the docbot library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Transport errors ──────────────────────────────────────────────────
    /// The platform file could not be fetched (non-success status, network
    /// failure, or the platform refused to resolve the file reference).
    #[error("Failed to download file '{file_id}': {reason}")]
    Download { file_id: String, reason: String },

    /// An outbound call to the messaging platform failed.
    #[error("Transport call '{method}' failed: {reason}")]
    Transport { method: String, reason: String },

    // ── Storage errors ────────────────────────────────────────────────────
    /// A temporary artifact could not be created, written, read or deleted.
    #[error("Temporary artifact error at '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Tool errors ───────────────────────────────────────────────────────
    /// The converter exited non-zero, timed out, or failed internally.
    #[error("Tool '{tool}' failed: {detail}")]
    ToolExecution { tool: String, detail: String },

    /// The converter reported success but its output file does not exist.
    #[error("Tool '{tool}' exited cleanly but produced no output at '{path}'\n{diagnostics}")]
    ToolOutputMissing {
        tool: String,
        path: PathBuf,
        diagnostics: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task panic, broken invariant).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Build a [`ConvertError::Storage`] for `path`.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Storage {
            path: path.into(),
            source,
        }
    }

    /// Build a [`ConvertError::ToolExecution`] for the named tool.
    pub fn tool(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        ConvertError::ToolExecution {
            tool: tool.into(),
            detail: detail.into(),
        }
    }

    /// Which user-facing failure notification this error maps to.
    pub fn category(&self) -> FailureCategory {
        match self {
            ConvertError::Download { .. } => FailureCategory::Download,
            ConvertError::ToolExecution { .. } | ConvertError::ToolOutputMissing { .. } => {
                FailureCategory::Conversion
            }
            ConvertError::Storage { .. } => FailureCategory::Storage,
            ConvertError::Transport { .. }
            | ConvertError::InvalidConfig(_)
            | ConvertError::Internal(_) => FailureCategory::Internal,
        }
    }
}

/// Coarse failure classes, one user-facing message each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Download,
    Conversion,
    Storage,
    Internal,
}

impl FailureCategory {
    /// The text sent to the user when a job fails with this category.
    pub fn user_message(self) -> &'static str {
        match self {
            FailureCategory::Download => {
                "❌ Failed to download your file. Please send it again."
            }
            FailureCategory::Conversion => {
                "❌ Conversion failed. The file may be corrupt or in an unsupported format."
            }
            FailureCategory::Storage => {
                "❌ The server could not store your file temporarily. Please try again later."
            }
            FailureCategory::Internal => {
                "❌ An unexpected error occurred during conversion or file handling."
            }
        }
    }
}
