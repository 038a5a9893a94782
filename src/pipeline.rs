//! Request façade: compress, convert, merge, split
//!
//! Every operation takes ownership of its input files and runs one request
//! through `Validating → Processing → Cleaning → Done | Failed`. Inputs are
//! deleted when the request ends, whichever state it ends in. Blocking PDF
//! work runs on tokio's blocking pool, so one slow request never stalls the
//! others.

use crate::config::{CompressionEngine, PipelineConfig};
use crate::convert::{convert_file, select_converter, ConverterStrategy, HtmlRenderer};
use crate::error::{Error, Result};
use crate::pdf::{
    parse_range, CompressionBackend, QpdfCommandBackend, QpdfLibraryBackend, QpdfWrapper,
    QualityTier, SourceDocument,
};
use crate::source::{SourceFile, TempWorkspace, PDF_MIME_TYPE};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// MIME type of every output document
pub const CONTENT_TYPE: &str = PDF_MIME_TYPE;

const COMPRESSED_NAME: &str = "compressed.pdf";
const CONVERTED_NAME: &str = "converted.pdf";
const MERGED_NAME: &str = "merged.pdf";

/// The four request kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Compress,
    Convert,
    Merge,
    Split,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Compress => "compress",
            Operation::Convert => "convert",
            Operation::Merge => "merge",
            Operation::Split => "split",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Validating,
    Processing,
    Cleaning,
    Done,
    Failed,
}

/// One produced PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    pub data: Vec<u8>,
    /// Suggested download name
    pub file_name: String,
    pub page_count: u32,
}

/// Result of a successful request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Compress, convert and merge produce one document
    Single(OutputDocument),
    /// Split produces one single-page document per selected page, in
    /// selection order
    Pages(Vec<OutputDocument>),
}

impl OperationOutcome {
    pub fn documents(&self) -> &[OutputDocument] {
        match self {
            OperationOutcome::Single(doc) => std::slice::from_ref(doc),
            OperationOutcome::Pages(docs) => docs,
        }
    }

    pub fn into_documents(self) -> Vec<OutputDocument> {
        match self {
            OperationOutcome::Single(doc) => vec![doc],
            OperationOutcome::Pages(docs) => docs,
        }
    }

    /// The single document, if this outcome has exactly one
    pub fn single(&self) -> Option<&OutputDocument> {
        match self {
            OperationOutcome::Single(doc) => Some(doc),
            OperationOutcome::Pages(_) => None,
        }
    }
}

/// Input-count rule for an operation
struct Arity {
    min: usize,
    max: usize,
}

/// Per-request bookkeeping: id, state, and the owned inputs
struct Request {
    id: Uuid,
    operation: Operation,
    state: RequestState,
    inputs: Vec<SourceFile>,
    started: Instant,
}

impl Request {
    fn begin(operation: Operation, inputs: Vec<SourceFile>) -> Self {
        let request = Self {
            id: Uuid::new_v4(),
            operation,
            state: RequestState::Validating,
            inputs,
            started: Instant::now(),
        };
        tracing::debug!(
            request_id = %request.id,
            %operation,
            inputs = request.inputs.len(),
            "request started"
        );
        request
    }

    fn advance(&mut self, next: RequestState) {
        tracing::debug!(
            request_id = %self.id,
            operation = %self.operation,
            from = ?self.state,
            to = ?next,
            "request state"
        );
        self.state = next;
    }

    /// Release inputs and record the terminal state.
    ///
    /// A request that failed validation skips `Cleaning` but still drops
    /// its inputs.
    fn finish(mut self, result: Result<OperationOutcome>) -> Result<OperationOutcome> {
        if self.state == RequestState::Processing {
            self.advance(RequestState::Cleaning);
        }
        for input in self.inputs.drain(..) {
            input.release();
        }

        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        match &result {
            Ok(outcome) => {
                self.advance(RequestState::Done);
                let docs = outcome.documents();
                tracing::info!(
                    request_id = %self.id,
                    operation = %self.operation,
                    outputs = docs.len(),
                    bytes = docs.iter().map(|d| d.data.len()).sum::<usize>(),
                    elapsed_ms,
                    "request completed"
                );
            }
            Err(e) => {
                self.advance(RequestState::Failed);
                tracing::warn!(
                    request_id = %self.id,
                    operation = %self.operation,
                    kind = ?e.kind(),
                    error = %e,
                    elapsed_ms,
                    "request failed"
                );
            }
        }
        result
    }

    fn first_input(&self) -> Result<&SourceFile> {
        self.inputs.first().ok_or(Error::MissingInput)
    }
}

/// Run blocking work on the blocking pool
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::TaskJoin {
            reason: e.to_string(),
        })?
}

/// Request-level façade over the PDF layer.
///
/// Cheap to clone; clones share configuration, workspace and backends.
#[derive(Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    workspace: TempWorkspace,
    compressor: Arc<dyn CompressionBackend>,
    renderer: Arc<dyn HtmlRenderer>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("workspace", &self.workspace)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline with the backends named in `config`
    pub fn new(config: PipelineConfig) -> Self {
        let workspace = TempWorkspace::new(&config.temp_root);

        let compressor: Arc<dyn CompressionBackend> = match config.compression_engine {
            CompressionEngine::Library => Arc::new(QpdfLibraryBackend),
            CompressionEngine::Command => Arc::new(
                QpdfCommandBackend::new(&config.qpdf_binary, workspace.clone())
                    .with_timeout(config.external_timeout),
            ),
        };

        #[cfg(feature = "chromium")]
        let renderer: Arc<dyn HtmlRenderer> = Arc::new(crate::convert::ChromiumRenderer::new(
            config.chrome_executable.clone(),
            workspace.clone(),
        ));
        #[cfg(not(feature = "chromium"))]
        let renderer: Arc<dyn HtmlRenderer> = Arc::new(crate::convert::UnavailableRenderer);

        Self {
            config: Arc::new(config),
            workspace,
            compressor,
            renderer,
        }
    }

    /// Replace the compression backend
    pub fn with_compressor(mut self, compressor: Arc<dyn CompressionBackend>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Replace the HTML renderer
    pub fn with_renderer(mut self, renderer: Arc<dyn HtmlRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Where inputs should be materialized
    pub fn workspace(&self) -> &TempWorkspace {
        &self.workspace
    }

    /// Shrink one PDF at the given tier (`low`, `medium`, `high`; absent
    /// means `medium`).
    pub async fn compress(
        &self,
        files: Vec<SourceFile>,
        tier: Option<&str>,
    ) -> Result<OperationOutcome> {
        let mut request = Request::begin(Operation::Compress, files);
        let result = self.run_compress(&mut request, tier).await;
        request.finish(result)
    }

    async fn run_compress(
        &self,
        request: &mut Request,
        tier: Option<&str>,
    ) -> Result<OperationOutcome> {
        self.validate(request, Arity { min: 1, max: 1 }, true)?;
        let tier = QualityTier::parse_optional(tier)?;
        request.advance(RequestState::Processing);

        let input = request.first_input()?.temporary_path().to_path_buf();
        let compressor = Arc::clone(&self.compressor);
        tracing::debug!(request_id = %request.id, %tier, "compressing");

        let (data, page_count) = run_blocking(move || {
            let data = compressor.compress(&input, tier)?;
            let page_count =
                QpdfWrapper::get_page_count(&data).map_err(|e| Error::ExternalTool {
                    reason: format!("compressed output is not a valid PDF: {}", e),
                })?;
            Ok((data, page_count))
        })
        .await?;

        Ok(OperationOutcome::Single(OutputDocument {
            data,
            file_name: COMPRESSED_NAME.to_string(),
            page_count,
        }))
    }

    /// Turn one HTML, JPEG, PNG or text file into a PDF, picking the
    /// converter from the original filename's extension.
    pub async fn convert(&self, files: Vec<SourceFile>) -> Result<OperationOutcome> {
        let mut request = Request::begin(Operation::Convert, files);
        let result = self.run_convert(&mut request).await;
        request.finish(result)
    }

    async fn run_convert(&self, request: &mut Request) -> Result<OperationOutcome> {
        self.validate(request, Arity { min: 1, max: 1 }, false)?;
        let input = request.first_input()?;
        let strategy = select_converter(&input.extension())?;
        let path = input.temporary_path().to_path_buf();
        request.advance(RequestState::Processing);
        tracing::debug!(request_id = %request.id, ?strategy, "converting");

        let data = match strategy {
            ConverterStrategy::RenderHtml => self.render_html(path).await?,
            _ => run_blocking(move || convert_file(strategy, &path)).await?,
        };
        let page_count = {
            let data = data.clone();
            run_blocking(move || {
                QpdfWrapper::get_page_count(&data).map_err(|e| match strategy {
                    ConverterStrategy::RenderHtml => Error::Render {
                        reason: format!("renderer output is not a valid PDF: {}", e),
                    },
                    _ => e,
                })
            })
            .await?
        };

        Ok(OperationOutcome::Single(OutputDocument {
            data,
            file_name: CONVERTED_NAME.to_string(),
            page_count,
        }))
    }

    async fn render_html(&self, path: PathBuf) -> Result<Vec<u8>> {
        let bytes = tokio::fs::read(&path).await?;
        let html = String::from_utf8_lossy(&bytes).into_owned();
        let render = self.renderer.render(&html);

        match self.config.external_timeout {
            Some(limit) => tokio::time::timeout(limit, render)
                .await
                .map_err(|_| Error::Render {
                    reason: format!("rendering timed out after {:?}", limit),
                })?,
            None => render.await,
        }
    }

    /// Concatenate every page of 2..=`max_merge_files` PDFs, in input
    /// order.
    pub async fn merge(&self, files: Vec<SourceFile>) -> Result<OperationOutcome> {
        let mut request = Request::begin(Operation::Merge, files);
        let result = self.run_merge(&mut request).await;
        request.finish(result)
    }

    async fn run_merge(&self, request: &mut Request) -> Result<OperationOutcome> {
        let arity = Arity {
            min: 2,
            max: self.config.max_merge_files,
        };
        self.validate(request, arity, true)?;
        request.advance(RequestState::Processing);

        let inputs: Vec<(String, PathBuf)> = request
            .inputs
            .iter()
            .map(|f| (f.original_name().to_string(), f.temporary_path().to_path_buf()))
            .collect();

        let (data, page_count) = run_blocking(move || {
            let buffers = inputs
                .iter()
                .map(|(name, path)| Ok((name.as_str(), std::fs::read(path)?)))
                .collect::<Result<Vec<_>>>()?;
            let refs: Vec<(&str, &[u8])> = buffers
                .iter()
                .map(|(name, data)| (*name, data.as_slice()))
                .collect();
            let merged = QpdfWrapper::merge(&refs)?;
            let page_count = QpdfWrapper::get_page_count(&merged)?;
            Ok((merged, page_count))
        })
        .await?;

        Ok(OperationOutcome::Single(OutputDocument {
            data,
            file_name: MERGED_NAME.to_string(),
            page_count,
        }))
    }

    /// Extract the pages named by `range` (absent or blank means every
    /// page) as separate single-page PDFs.
    pub async fn split(
        &self,
        files: Vec<SourceFile>,
        range: Option<&str>,
    ) -> Result<OperationOutcome> {
        let mut request = Request::begin(Operation::Split, files);
        let result = self.run_split(&mut request, range).await;
        request.finish(result)
    }

    async fn run_split(
        &self,
        request: &mut Request,
        range: Option<&str>,
    ) -> Result<OperationOutcome> {
        self.validate(request, Arity { min: 1, max: 1 }, true)?;
        request.advance(RequestState::Processing);

        let input = request.first_input()?;
        let name = input.original_name().to_string();
        let path = input.temporary_path().to_path_buf();
        let range = range.unwrap_or_default().to_string();

        let pages = run_blocking(move || {
            let data = std::fs::read(&path)?;
            let doc = SourceDocument::open(&data, &name)?;
            let selection = parse_range(&range, doc.page_count());
            if selection.is_empty() {
                return Err(Error::NoPagesSelected { range });
            }
            tracing::debug!(
                source = %name,
                total = doc.page_count(),
                selected = selection.len(),
                "splitting"
            );

            let outputs = QpdfWrapper::split_pages(&doc, &selection)?;
            Ok(selection
                .iter()
                .zip(outputs)
                .map(|(idx, data)| OutputDocument {
                    data,
                    file_name: format!("split-page-{}.pdf", idx + 1),
                    page_count: 1,
                })
                .collect::<Vec<_>>())
        })
        .await?;

        Ok(OperationOutcome::Pages(pages))
    }

    /// Check counts, sizes and (optionally) declared PDF type
    fn validate(&self, request: &Request, arity: Arity, require_pdf: bool) -> Result<()> {
        let actual = request.inputs.len();
        if actual == 0 {
            return Err(Error::MissingInput);
        }
        if actual < arity.min {
            return Err(Error::TooFewInputs {
                required: arity.min,
                actual,
            });
        }
        if actual > arity.max {
            return Err(Error::TooManyInputs {
                max: arity.max,
                actual,
            });
        }

        for input in &request.inputs {
            if input.size_bytes() > self.config.max_upload_bytes {
                return Err(Error::FileTooLarge {
                    name: input.original_name().to_string(),
                    size: input.size_bytes(),
                    max_size: self.config.max_upload_bytes,
                });
            }
            if require_pdf && !input.is_pdf() {
                return Err(Error::NotAPdf {
                    name: input.original_name().to_string(),
                });
            }
        }
        Ok(())
    }
}
