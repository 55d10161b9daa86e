//! Error types for codec-sweep operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for codec-sweep operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving the sweep pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// An external tool exited with a non-zero status.
    #[error("Tool failed: `{command}`\n{output}")]
    ToolInvocation {
        /// The full command line that was run.
        command: String,
        /// Captured stdout + stderr of the failing invocation.
        output: String,
    },

    /// An expected artifact was absent when the metrics stage needed it.
    #[error("Missing artifact: {}", path.display())]
    MissingArtifact {
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// Failed to derive class, dimensions, or bit depth for a source image.
    #[error("Classify failed: {}: {reason}", path.display())]
    Classify {
        /// Path of the image being classified.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// A metric tool ran but its log could not be parsed.
    #[error("Metric parse failed ({tool}): {reason}")]
    MetricParse {
        /// Tool whose output was being parsed.
        tool: String,
        /// Reason for the failure.
        reason: String,
    },

    /// Image or container format the pipeline does not handle.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A run precondition was not met.
    #[error("Preflight failed: {0}")]
    Preflight(String),

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
