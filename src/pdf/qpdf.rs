//! qpdf FFI wrapper for page assembly and stream compression
//!
//! Pages are copied between documents as foreign objects, so content streams,
//! fonts and images land in the output byte-for-byte as they were in the
//! source. Nothing here re-renders page content.

use crate::error::{Error, Result};
use crate::pdf::compress::QualityTier;
use crate::pdf::range::PageIndexSet;
use qpdf::{ObjectStreamMode, QPdf};

/// A parsed source document ready for page copying
pub struct SourceDocument {
    qpdf: QPdf,
    page_count: u32,
    label: String,
}

impl SourceDocument {
    /// Parse PDF bytes. `label` identifies the source in error messages.
    pub fn open(data: &[u8], label: &str) -> Result<Self> {
        let qpdf = QPdf::read_from_memory(data).map_err(|e| Error::Assembly {
            reason: format!("Failed to read {}: {}", label, e),
        })?;
        let page_count = qpdf.get_num_pages().map_err(|e| Error::Assembly {
            reason: format!("Failed to count pages of {}: {}", label, e),
        })?;
        Ok(Self {
            qpdf,
            page_count,
            label: label.to_string(),
        })
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Map qpdf crate errors raised while building an output document
fn map_qpdf_error(e: qpdf::QPdfError) -> Error {
    Error::Assembly {
        reason: e.to_string(),
    }
}

/// Wrapper for qpdf operations via FFI
pub struct QpdfWrapper;

impl QpdfWrapper {
    /// Build a new document from the given pages of each source, in order.
    ///
    /// Every index must be valid for its source; a `PageIndexSet` produced by
    /// [`crate::pdf::parse_range`] against the same document always is.
    pub fn assemble(sources: &[(&SourceDocument, &PageIndexSet)]) -> Result<Vec<u8>> {
        let dest = QPdf::empty();

        for (source, pages) in sources {
            for idx in pages.iter() {
                let page = source.qpdf.get_page(idx).ok_or_else(|| Error::Assembly {
                    reason: format!(
                        "Page {} out of bounds in {} (total: {})",
                        idx + 1,
                        source.label,
                        source.page_count
                    ),
                })?;
                let copied = dest.copy_from_foreign(&page);
                dest.add_page(&copied, false).map_err(map_qpdf_error)?;
            }
        }

        let mut writer = dest.writer();
        writer.preserve_encryption(false);
        writer.write_to_memory().map_err(map_qpdf_error)
    }

    /// Concatenate every page of every input, in input order
    ///
    /// # Arguments
    /// * `inputs` - (label, raw PDF bytes) pairs
    ///
    /// # Returns
    /// The merged PDF as bytes
    pub fn merge(inputs: &[(&str, &[u8])]) -> Result<Vec<u8>> {
        if inputs.is_empty() {
            return Err(Error::Assembly {
                reason: "No input PDFs provided".to_string(),
            });
        }

        let documents = inputs
            .iter()
            .map(|(label, data)| SourceDocument::open(data, label))
            .collect::<Result<Vec<_>>>()?;
        let selections: Vec<PageIndexSet> = documents
            .iter()
            .map(|doc| PageIndexSet::all(doc.page_count()))
            .collect();

        let sources: Vec<(&SourceDocument, &PageIndexSet)> =
            documents.iter().zip(selections.iter()).collect();
        Self::assemble(&sources)
    }

    /// One single-page document per selected index, in selection order
    pub fn split_pages(source: &SourceDocument, pages: &PageIndexSet) -> Result<Vec<Vec<u8>>> {
        pages
            .iter()
            .map(|idx| Self::assemble(&[(source, &PageIndexSet::single(idx))]))
            .collect()
    }

    /// Rewrite a PDF with the stream and object settings of a quality tier
    ///
    /// # Arguments
    /// * `input_data` - Raw PDF bytes
    /// * `tier` - low: recompress streams; medium: also generate object
    ///   streams; high: also linearize
    ///
    /// # Returns
    /// The compressed PDF as bytes
    pub fn compress(input_data: &[u8], tier: QualityTier) -> Result<Vec<u8>> {
        let qpdf = QPdf::read_from_memory(input_data).map_err(|e| Error::ExternalTool {
            reason: format!("qpdf could not read input: {}", e),
        })?;

        let os_mode = if tier.generates_object_streams() {
            ObjectStreamMode::Generate
        } else {
            ObjectStreamMode::Preserve
        };

        let mut writer = qpdf.writer();
        writer
            .object_stream_mode(os_mode)
            .compress_streams(true)
            .preserve_unreferenced_objects(false)
            .preserve_encryption(false);
        if tier.linearizes() {
            writer.linearize(true);
        }
        writer.write_to_memory().map_err(|e| Error::ExternalTool {
            reason: format!("qpdf failed to write output: {}", e),
        })
    }

    /// Get the page count of a PDF
    pub fn get_page_count(input_data: &[u8]) -> Result<u32> {
        let qpdf = QPdf::read_from_memory(input_data).map_err(map_qpdf_error)?;
        qpdf.get_num_pages().map_err(map_qpdf_error)
    }
}
