//! Error types for the PDF pipeline

use serde::Serialize;
use thiserror::Error;

/// Result type alias for the PDF pipeline
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure category reported to callers alongside the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad or missing inputs, detected before processing starts
    Validation,
    /// No conversion strategy exists for the source format
    UnsupportedFormat,
    /// The compression tool failed or is unavailable
    ExternalTool,
    /// A source document could not be opened or assembled
    Assembly,
    /// Headless-browser rendering failed
    Render,
    /// Local filesystem or worker failure
    Io,
}

/// Error types for the PDF pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// No input file was supplied
    #[error("No input file provided")]
    MissingInput,

    /// Fewer inputs than the operation needs
    #[error("At least {required} files are required (got {actual})")]
    TooFewInputs { required: usize, actual: usize },

    /// More inputs than the configured limit
    #[error("At most {max} files are allowed (got {actual})")]
    TooManyInputs { max: usize, actual: usize },

    /// Input exceeds the configured upload limit
    #[error("File {name} is too large: {size} bytes (max: {max_size} bytes)")]
    FileTooLarge { name: String, size: u64, max_size: u64 },

    /// Input declared as something other than a PDF where a PDF is required
    #[error("File {name} is not a PDF")]
    NotAPdf { name: String },

    /// Unrecognized compression tier
    #[error("Invalid quality tier: {value} (expected low, medium or high)")]
    InvalidQualityTier { value: String },

    /// Split resolved to an empty page selection
    #[error("No pages found for range {range:?}")]
    NoPagesSelected { range: String },

    /// Path access denied (outside allowed resource directories)
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },

    /// Source could not be materialized
    #[error("Failed to resolve source: {reason}")]
    SourceResolution { reason: String },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// No converter for this extension
    #[error("Unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    /// Compression tool failed
    #[error("External tool error: {reason}")]
    ExternalTool { reason: String },

    /// Source document failed to open or pages failed to copy
    #[error("Assembly error: {reason}")]
    Assembly { reason: String },

    /// Rendering failed
    #[error("Render error: {reason}")]
    Render { reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking worker failed to complete
    #[error("Task join error: {reason}")]
    TaskJoin { reason: String },
}

impl Error {
    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingInput
            | Error::TooFewInputs { .. }
            | Error::TooManyInputs { .. }
            | Error::FileTooLarge { .. }
            | Error::NotAPdf { .. }
            | Error::InvalidQualityTier { .. }
            | Error::NoPagesSelected { .. }
            | Error::PathAccessDenied { .. }
            | Error::SourceResolution { .. }
            | Error::Base64Decode(_) => ErrorKind::Validation,
            Error::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Error::ExternalTool { .. } => ErrorKind::ExternalTool,
            Error::Assembly { .. } => ErrorKind::Assembly,
            Error::Render { .. } => ErrorKind::Render,
            Error::Io(_) | Error::TaskJoin { .. } => ErrorKind::Io,
        }
    }

    /// Return a sanitized error message safe to send to clients.
    /// Internal details (temp paths, tool output, library errors) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::MissingInput => "File is required".to_string(),
            Error::TooFewInputs { required, .. } => {
                format!("At least {} PDF files are required", required)
            }
            Error::TooManyInputs { max, .. } => format!("At most {} files are allowed", max),
            Error::FileTooLarge { max_size, .. } => {
                format!("File exceeds maximum size of {} bytes", max_size)
            }
            Error::NotAPdf { name } => format!("{} is not a PDF file", name),
            Error::InvalidQualityTier { value } => format!(
                "Invalid quality tier: {} (expected low, medium or high)",
                value
            ),
            Error::NoPagesSelected { .. } => "No pages found in PDF".to_string(),
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
            Error::SourceResolution { .. } => "Failed to resolve source file".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::UnsupportedFormat { extension } => {
                format!("Unsupported file format: {}", extension)
            }
            Error::ExternalTool { .. } => "Failed to compress PDF".to_string(),
            Error::Assembly { .. } => "Failed to process PDF".to_string(),
            Error::Render { .. } => "Failed to convert file to PDF".to_string(),
            Error::Io(_) | Error::TaskJoin { .. } => "I/O error".to_string(),
        }
    }
}
