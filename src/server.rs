//! MCP Server implementation using rmcp
//!
//! Each tool materializes its sources into the pipeline workspace (the
//! upload step), runs one pipeline operation, and returns the produced PDFs
//! either inline as base64 or written to a caller-chosen path.

use crate::config::PipelineConfig;
use crate::error::ErrorKind;
use crate::pipeline::{OperationOutcome, OutputDocument, Pipeline, CONTENT_TYPE};
use crate::source::{materialize_base64, materialize_path, SourceFile};
use anyhow::Result;
use base64::Engine;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name given to base64 uploads that arrive without one
const DEFAULT_UPLOAD_NAME: &str = "upload.pdf";

/// Where an input file comes from
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum UploadSource {
    /// File on the server's filesystem
    Path {
        /// Path to the file
        path: String,
        /// Filename to use for format detection (default: the path's filename)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Inline file content
    Base64 {
        /// Base64 encoded file content
        base64: String,
        /// Original filename; its extension selects the converter
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

impl<'de> serde::Deserialize<'de> for UploadSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        let Some(obj) = value.as_object() else {
            return Err(serde::de::Error::custom(format!(
                "Invalid source: expected an object with \"path\" or \"base64\", but got {}",
                match &value {
                    serde_json::Value::Array(_) => "an array",
                    serde_json::Value::String(_) => "a string",
                    serde_json::Value::Number(_) => "a number",
                    serde_json::Value::Bool(_) => "a boolean",
                    serde_json::Value::Null => "null",
                    _ => "unknown type",
                }
            )));
        };

        let name = match obj.get("name") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(serde::de::Error::custom("\"name\" must be a string")),
        };

        if let Some(v) = obj.get("path") {
            return match v.as_str() {
                Some(s) => Ok(UploadSource::Path {
                    path: s.to_string(),
                    name,
                }),
                None => Err(serde::de::Error::custom("\"path\" must be a string")),
            };
        }
        if let Some(v) = obj.get("base64") {
            return match v.as_str() {
                Some(s) => Ok(UploadSource::Base64 {
                    base64: s.to_string(),
                    name,
                }),
                None => Err(serde::de::Error::custom("\"base64\" must be a string")),
            };
        }

        let keys: Vec<&String> = obj.keys().collect();
        Err(serde::de::Error::custom(format!(
            "Invalid source: expected an object with \"path\" or \"base64\", but got keys: {:?}",
            keys
        )))
    }
}

impl UploadSource {
    /// Human-readable identifier used in results
    fn label(&self) -> String {
        match self {
            UploadSource::Path { path, .. } => path.clone(),
            UploadSource::Base64 { name: Some(n), .. } => n.clone(),
            UploadSource::Base64 { name: None, .. } => "<base64>".to_string(),
        }
    }
}

/// Security and pipeline configuration for the MCP server
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Directories path sources and outputs must live under.
    /// Empty means no restriction.
    pub resource_dirs: Vec<String>,
    /// Limits, temp directory and tool settings for every request
    pub pipeline: PipelineConfig,
}

/// PDF pipeline MCP server
#[derive(Clone)]
pub struct PdfPipelineServer {
    pipeline: Pipeline,
    tool_router: ToolRouter<Self>,
    config: Arc<ServerConfig>,
}

// ============================================================================
// Shared response types
// ============================================================================

/// One produced PDF as returned to the client
#[derive(Debug, Serialize, JsonSchema)]
pub struct OutputFile {
    /// Suggested download filename
    pub file_name: String,
    /// Always "application/pdf"
    pub content_type: String,
    pub page_count: u32,
    pub size_bytes: usize,
    /// Inline PDF content (when no output path was given)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    /// Where the PDF was saved (when an output path was given)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
}

/// Failure reported to the client
#[derive(Debug, Serialize, JsonSchema)]
pub struct ToolError {
    /// validation, unsupported_format, external_tool, assembly, render or io
    #[schemars(with = "String")]
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&crate::error::Error> for ToolError {
    fn from(e: &crate::error::Error) -> Self {
        Self {
            kind: e.kind(),
            message: e.client_message(),
        }
    }
}

// ============================================================================
// Request/Response types for compress_pdf
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CompressPdfParams {
    /// Source PDF to compress
    pub source: UploadSource,
    /// Compression tier: "low", "medium" (default) or "high"
    #[serde(default)]
    pub quality: Option<String>,
    /// Output file path (optional). If provided, saves the compressed PDF to this path.
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct CompressPdfResult {
    pub source: String,
    /// Original file size in bytes
    pub original_size: u64,
    /// Compressed file size in bytes
    pub compressed_size: u64,
    /// Compression ratio (compressed/original, lower is better)
    pub compression_ratio: f32,
    /// Bytes saved (negative if the output grew)
    pub bytes_saved: i64,
    pub output: OutputFile,
}

// ============================================================================
// Request/Response types for convert_to_pdf
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConvertToPdfParams {
    /// File to convert (.html, .jpg, .jpeg, .png or .txt)
    pub source: UploadSource,
    /// Output file path (optional)
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct ConvertToPdfResult {
    pub source: String,
    pub output: OutputFile,
}

// ============================================================================
// Request/Response types for merge_pdfs
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MergePdfsParams {
    /// PDF sources to merge, in order
    pub sources: Vec<UploadSource>,
    /// Output file path (optional)
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct MergePdfsResult {
    pub source_count: usize,
    pub output: OutputFile,
}

// ============================================================================
// Request/Response types for split_pdf
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SplitPdfParams {
    /// Source PDF to split
    pub source: UploadSource,
    /// Pages to extract, 1-based: "1-3,5,8-10". Omit for every page.
    /// Out-of-range pages are dropped; repeats keep their first position.
    #[serde(default)]
    pub range: Option<String>,
    /// Directory to write the page files into (optional)
    #[serde(default)]
    pub output_dir: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct SplitPdfResult {
    pub source: String,
    /// One single-page PDF per selected page, in selection order
    pub outputs: Vec<OutputFile>,
}

/// Render a tool outcome as the JSON text returned to the client
fn respond<T: Serialize>(tool: &str, result: crate::error::Result<T>) -> String {
    let response = match result {
        Ok(value) => serde_json::json!({ "result": value }),
        Err(e) => {
            tracing::warn!(tool, kind = ?e.kind(), error = %e, "tool failed");
            serde_json::json!({ "error": ToolError::from(&e) })
        }
    };
    serde_json::to_string_pretty(&response).unwrap_or_default()
}

#[tool_router]
impl PdfPipelineServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Create a new server with full configuration
    pub fn with_config(config: ServerConfig) -> Self {
        Self::with_pipeline(Pipeline::new(config.pipeline.clone()), config)
    }

    /// Create a server around an existing pipeline
    pub fn with_pipeline(pipeline: Pipeline, config: ServerConfig) -> Self {
        Self {
            pipeline,
            tool_router: Self::tool_router(),
            config: Arc::new(config),
        }
    }

    #[tool(
        description = "Compress a PDF. Quality tiers: \"low\" recompresses streams; \"medium\" (default) also packs objects into object streams; \"high\" also linearizes for fast web view.

Source format: {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\", \"name\": \"file.pdf\"}"
    )]
    async fn compress_pdf(&self, Parameters(params): Parameters<CompressPdfParams>) -> String {
        respond("compress_pdf", self.process_compress_pdf(&params).await)
    }

    #[tool(
        description = "Convert an HTML page, JPEG/PNG image or plain-text file to PDF. The converter is chosen from the filename extension (.html, .jpg, .jpeg, .png, .txt).

Source format: {\"path\": \"/absolute/path.png\"} or {\"base64\": \"...\", \"name\": \"file.png\"}"
    )]
    async fn convert_to_pdf(&self, Parameters(params): Parameters<ConvertToPdfParams>) -> String {
        respond("convert_to_pdf", self.process_convert_to_pdf(&params).await)
    }

    #[tool(
        description = "Merge 2 or more PDFs into one, keeping every page of each input in input order.

Source format: each element must be {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\", \"name\": \"file.pdf\"}"
    )]
    async fn merge_pdfs(&self, Parameters(params): Parameters<MergePdfsParams>) -> String {
        respond("merge_pdfs", self.process_merge_pdfs(&params).await)
    }

    #[tool(
        description = "Split a PDF into single-page PDFs for the pages named by a range expression such as \"1-3,5\". Omit the range to split every page.

Source format: {\"path\": \"/absolute/path.pdf\"} or {\"base64\": \"...\", \"name\": \"file.pdf\"}"
    )]
    async fn split_pdf(&self, Parameters(params): Parameters<SplitPdfParams>) -> String {
        respond("split_pdf", self.process_split_pdf(&params).await)
    }

    /// Copy a source into the pipeline workspace
    fn materialize(&self, source: &UploadSource) -> crate::error::Result<SourceFile> {
        let workspace = self.pipeline.workspace();
        let max_bytes = self.pipeline.config().max_upload_bytes;
        match source {
            UploadSource::Path { path, name } => {
                let checked = self.validate_path_access(path)?;
                materialize_path(workspace, checked, name.as_deref(), max_bytes)
            }
            UploadSource::Base64 { base64, name } => materialize_base64(
                workspace,
                base64,
                name.as_deref().unwrap_or(DEFAULT_UPLOAD_NAME),
                max_bytes,
            ),
        }
    }

    /// Validate that a path is within allowed resource directories.
    /// If no resource_dirs are configured, all paths are allowed.
    fn validate_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let canonical =
            std::fs::canonicalize(path).map_err(|_| crate::error::Error::PathAccessDenied {
                path: path.to_string(),
            })?;
        self.check_inside_resource_dirs(canonical, path)
    }

    /// Validate an output path. Canonicalizes the parent directory since the
    /// output file may not exist yet.
    fn validate_output_path_access(&self, path: &str) -> crate::error::Result<PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(PathBuf::from(path));
        }

        let path_obj = Path::new(path);
        let parent = match path_obj.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let canonical_parent =
            std::fs::canonicalize(parent).map_err(|_| crate::error::Error::PathAccessDenied {
                path: path.to_string(),
            })?;
        let canonical_target =
            canonical_parent.join(path_obj.file_name().unwrap_or(std::ffi::OsStr::new("")));
        self.check_inside_resource_dirs(canonical_target, path)
    }

    fn check_inside_resource_dirs(
        &self,
        canonical: PathBuf,
        requested: &str,
    ) -> crate::error::Result<PathBuf> {
        for dir in &self.config.resource_dirs {
            if let Ok(canonical_dir) = std::fs::canonicalize(dir) {
                if canonical.starts_with(&canonical_dir) {
                    return Ok(canonical);
                }
            }
        }
        Err(crate::error::Error::PathAccessDenied {
            path: requested.to_string(),
        })
    }

    /// Write a document to `output_path` if given, else inline it as base64
    fn deliver(
        &self,
        doc: &OutputDocument,
        output_path: Option<&str>,
    ) -> crate::error::Result<OutputFile> {
        let (base64, saved) = match output_path {
            Some(path_str) => {
                let path = self.validate_output_path_access(path_str)?;
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                std::fs::write(&path, &doc.data)?;
                (None, Some(path.to_string_lossy().to_string()))
            }
            None => (
                Some(base64::engine::general_purpose::STANDARD.encode(&doc.data)),
                None,
            ),
        };

        Ok(OutputFile {
            file_name: doc.file_name.clone(),
            content_type: CONTENT_TYPE.to_string(),
            page_count: doc.page_count,
            size_bytes: doc.data.len(),
            base64,
            output_path: saved,
        })
    }

    fn single_document(outcome: &OperationOutcome) -> crate::error::Result<&OutputDocument> {
        outcome.single().ok_or_else(|| crate::error::Error::Assembly {
            reason: "expected a single output document".to_string(),
        })
    }

    async fn process_compress_pdf(
        &self,
        params: &CompressPdfParams,
    ) -> crate::error::Result<CompressPdfResult> {
        let file = self.materialize(&params.source)?;
        let original_size = file.size_bytes();

        let outcome = self
            .pipeline
            .compress(vec![file], params.quality.as_deref())
            .await?;
        let doc = Self::single_document(&outcome)?;
        let compressed_size = doc.data.len() as u64;

        Ok(CompressPdfResult {
            source: params.source.label(),
            original_size,
            compressed_size,
            compression_ratio: if original_size > 0 {
                compressed_size as f32 / original_size as f32
            } else {
                1.0
            },
            bytes_saved: original_size as i64 - compressed_size as i64,
            output: self.deliver(doc, params.output_path.as_deref())?,
        })
    }

    async fn process_convert_to_pdf(
        &self,
        params: &ConvertToPdfParams,
    ) -> crate::error::Result<ConvertToPdfResult> {
        let file = self.materialize(&params.source)?;
        let outcome = self.pipeline.convert(vec![file]).await?;
        let doc = Self::single_document(&outcome)?;

        Ok(ConvertToPdfResult {
            source: params.source.label(),
            output: self.deliver(doc, params.output_path.as_deref())?,
        })
    }

    async fn process_merge_pdfs(
        &self,
        params: &MergePdfsParams,
    ) -> crate::error::Result<MergePdfsResult> {
        let files = params
            .sources
            .iter()
            .map(|source| self.materialize(source))
            .collect::<crate::error::Result<Vec<_>>>()?;

        let outcome = self.pipeline.merge(files).await?;
        let doc = Self::single_document(&outcome)?;

        Ok(MergePdfsResult {
            source_count: params.sources.len(),
            output: self.deliver(doc, params.output_path.as_deref())?,
        })
    }

    async fn process_split_pdf(
        &self,
        params: &SplitPdfParams,
    ) -> crate::error::Result<SplitPdfResult> {
        let file = self.materialize(&params.source)?;
        let outcome = self
            .pipeline
            .split(vec![file], params.range.as_deref())
            .await?;

        let outputs = outcome
            .documents()
            .iter()
            .map(|doc| {
                let target = params.output_dir.as_ref().map(|dir| {
                    Path::new(dir)
                        .join(&doc.file_name)
                        .to_string_lossy()
                        .to_string()
                });
                self.deliver(doc, target.as_deref())
            })
            .collect::<crate::error::Result<Vec<_>>>()?;

        Ok(SplitPdfResult {
            source: params.source.label(),
            outputs,
        })
    }
}

impl Default for PdfPipelineServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for PdfPipelineServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "PDF pipeline server: compress PDFs, convert HTML/images/text to PDF, \
                 merge PDFs and split PDFs into single pages."
                    .into(),
            ),
        }
    }
}

/// Run the MCP server with default configuration
pub async fn run_server() -> Result<()> {
    run_server_with_config(ServerConfig::default()).await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    let server = PdfPipelineServer::with_config(config);

    tracing::info!("PDF pipeline server ready, waiting for connections...");

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{page_markers, sample_pdf};
    use pretty_assertions::assert_eq;

    fn encode(data: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(data)
    }

    fn decode(data: &str) -> Vec<u8> {
        base64::engine::general_purpose::STANDARD.decode(data).unwrap()
    }

    fn server_in(temp: &Path, resource_dirs: Vec<String>) -> PdfPipelineServer {
        PdfPipelineServer::with_config(ServerConfig {
            resource_dirs,
            pipeline: PipelineConfig {
                temp_root: temp.to_path_buf(),
                ..Default::default()
            },
        })
    }

    fn pdf_source(label: &str, pages: u32) -> UploadSource {
        UploadSource::Base64 {
            base64: encode(&sample_pdf(label, pages)),
            name: Some(format!("{}.pdf", label)),
        }
    }

    #[test]
    fn test_upload_source_deserialization() {
        let source: UploadSource = serde_json::from_str(r#"{"path": "/a.pdf"}"#).unwrap();
        assert!(matches!(source, UploadSource::Path { name: None, .. }));

        let source: UploadSource =
            serde_json::from_str(r#"{"base64": "JVBERi0xLjQ=", "name": "x.png"}"#).unwrap();
        match source {
            UploadSource::Base64 { name, .. } => assert_eq!(name.as_deref(), Some("x.png")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_upload_source_rejects_bad_shapes() {
        let err = serde_json::from_str::<UploadSource>(r#"{"url": "https://x"}"#).unwrap_err();
        assert!(err.to_string().contains("got keys"));

        let err = serde_json::from_str::<UploadSource>(r#""a.pdf""#).unwrap_err();
        assert!(err.to_string().contains("a string"));

        let err = serde_json::from_str::<UploadSource>(r#"{"path": 3}"#).unwrap_err();
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn test_source_label() {
        let path = UploadSource::Path {
            path: "/tmp/a.pdf".to_string(),
            name: None,
        };
        assert_eq!(path.label(), "/tmp/a.pdf");
        let anon = UploadSource::Base64 {
            base64: String::new(),
            name: None,
        };
        assert_eq!(anon.label(), "<base64>");
    }

    #[test]
    fn test_path_access_outside_resource_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let allowed = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let outside = elsewhere.path().join("secret.pdf");
        std::fs::write(&outside, b"%PDF").unwrap();

        let server = server_in(
            temp.path(),
            vec![allowed.path().to_string_lossy().to_string()],
        );
        let err = server
            .validate_path_access(&outside.to_string_lossy())
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::PathAccessDenied { .. }));

        let inside = allowed.path().join("ok.pdf");
        std::fs::write(&inside, b"%PDF").unwrap();
        assert!(server.validate_path_access(&inside.to_string_lossy()).is_ok());

        let out = allowed.path().join("new.pdf");
        assert!(server
            .validate_output_path_access(&out.to_string_lossy())
            .is_ok());
        let out = elsewhere.path().join("new.pdf");
        assert!(server
            .validate_output_path_access(&out.to_string_lossy())
            .is_err());
    }

    #[tokio::test]
    async fn test_merge_tool_inline_output() {
        let temp = tempfile::tempdir().unwrap();
        let server = server_in(temp.path(), Vec::new());

        let result = server
            .process_merge_pdfs(&MergePdfsParams {
                sources: vec![pdf_source("a", 3), pdf_source("b", 2)],
                output_path: None,
            })
            .await
            .unwrap();

        assert_eq!(result.source_count, 2);
        assert_eq!(result.output.page_count, 5);
        assert_eq!(result.output.file_name, "merged.pdf");
        assert_eq!(result.output.content_type, "application/pdf");
        let data = decode(result.output.base64.as_deref().unwrap());
        assert_eq!(page_markers(&data).len(), 5);
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_split_tool_writes_output_dir() {
        let temp = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let server = server_in(temp.path(), Vec::new());

        let result = server
            .process_split_pdf(&SplitPdfParams {
                source: pdf_source("s", 4),
                range: Some("2,4".to_string()),
                output_dir: Some(out.path().to_string_lossy().to_string()),
            })
            .await
            .unwrap();

        assert_eq!(result.outputs.len(), 2);
        assert!(result.outputs.iter().all(|o| o.base64.is_none()));
        let second = std::fs::read(out.path().join("split-page-4.pdf")).unwrap();
        assert_eq!(page_markers(&second), vec!["s 4"]);
    }

    #[tokio::test]
    async fn test_compress_tool_reports_sizes() {
        let temp = tempfile::tempdir().unwrap();
        let server = server_in(temp.path(), Vec::new());
        let original = sample_pdf("c", 2);

        let result = server
            .process_compress_pdf(&CompressPdfParams {
                source: UploadSource::Base64 {
                    base64: encode(&original),
                    name: None,
                },
                quality: Some("high".to_string()),
                output_path: None,
            })
            .await
            .unwrap();

        assert_eq!(result.original_size, original.len() as u64);
        assert_eq!(result.output.size_bytes as u64, result.compressed_size);
        assert_eq!(
            result.bytes_saved,
            result.original_size as i64 - result.compressed_size as i64
        );
    }

    #[tokio::test]
    async fn test_path_source_is_copied_not_consumed() {
        let temp = tempfile::tempdir().unwrap();
        let docs = tempfile::tempdir().unwrap();
        let input = docs.path().join("notes.txt");
        std::fs::write(&input, "hello from disk").unwrap();
        let server = server_in(temp.path(), Vec::new());

        let result = server
            .process_convert_to_pdf(&ConvertToPdfParams {
                source: UploadSource::Path {
                    path: input.to_string_lossy().to_string(),
                    name: None,
                },
                output_path: None,
            })
            .await
            .unwrap();

        assert_eq!(result.output.page_count, 1);
        assert!(input.exists());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_error_response_shape() {
        let temp = tempfile::tempdir().unwrap();
        let server = server_in(temp.path(), Vec::new());

        let result = server
            .process_convert_to_pdf(&ConvertToPdfParams {
                source: UploadSource::Base64 {
                    base64: encode(b"data"),
                    name: Some("file.xyz".to_string()),
                },
                output_path: None,
            })
            .await;
        let text = respond("convert_to_pdf", result);
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["error"]["kind"], "unsupported_format");
        assert_eq!(json["error"]["message"], "Unsupported file format: .xyz");
    }

    #[test]
    fn test_oversized_sources_rejected_before_reaching_workspace() {
        let temp = tempfile::tempdir().unwrap();
        let docs = tempfile::tempdir().unwrap();
        let big = docs.path().join("big.pdf");
        std::fs::write(&big, vec![b'%'; 1024 * 1024]).unwrap();

        let server = PdfPipelineServer::with_config(ServerConfig {
            resource_dirs: Vec::new(),
            pipeline: PipelineConfig {
                temp_root: temp.path().to_path_buf(),
                max_upload_bytes: 16,
                ..Default::default()
            },
        });

        let err = server
            .materialize(&UploadSource::Path {
                path: big.to_string_lossy().to_string(),
                name: None,
            })
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::FileTooLarge { .. }));

        let err = server
            .materialize(&UploadSource::Base64 {
                base64: encode(&[0u8; 64]),
                name: None,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let leftover = std::fs::read_dir(temp.path()).map(|d| d.count()).unwrap_or(0);
        assert_eq!(leftover, 0);
    }
}
