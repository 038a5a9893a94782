//! Request input files and their temp-file lifecycle

pub mod resolver;
pub mod workspace;

pub use resolver::{materialize_base64, materialize_path};
pub use workspace::{TempFile, TempWorkspace};

use std::path::{Path, PathBuf};

/// MIME type for every buffer the pipeline produces
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// An uploaded file already materialized in temp storage.
///
/// Constructing a `SourceFile` hands it ownership of `temporary_path`: the
/// file is deleted when the value drops, whichever way the request ends.
#[derive(Debug)]
pub struct SourceFile {
    file: TempFile,
    original_name: String,
    declared_mime_type: String,
    size_bytes: u64,
}

impl SourceFile {
    pub fn new(
        temporary_path: impl Into<PathBuf>,
        original_name: impl Into<String>,
        declared_mime_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            file: TempFile::adopt(temporary_path),
            original_name: original_name.into(),
            declared_mime_type: declared_mime_type.into(),
            size_bytes,
        }
    }

    /// Wrap a file already guarded by the workspace
    pub(crate) fn from_temp(
        file: TempFile,
        original_name: impl Into<String>,
        declared_mime_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            file,
            original_name: original_name.into(),
            declared_mime_type: declared_mime_type.into(),
            size_bytes,
        }
    }

    pub fn temporary_path(&self) -> &Path {
        self.file.path()
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn declared_mime_type(&self) -> &str {
        &self.declared_mime_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Lowercased extension of the original filename, with its leading dot
    /// (`".pdf"`), or an empty string when there is none.
    pub fn extension(&self) -> String {
        Path::new(&self.original_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
            .unwrap_or_default()
    }

    /// Declared as a PDF, by MIME type or by filename
    pub fn is_pdf(&self) -> bool {
        self.declared_mime_type.eq_ignore_ascii_case(PDF_MIME_TYPE) || self.extension() == ".pdf"
    }

    /// Delete the backing file now
    pub fn release(self) {
        self.file.release();
    }
}

/// Best-guess MIME type from a filename extension
pub fn mime_for_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => PDF_MIME_TYPE,
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}
