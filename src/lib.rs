//! PDF document-transformation pipeline
//!
//! Four request-level operations over uploaded files:
//! - `compress`: shrink a PDF at a named quality tier
//! - `convert`: turn HTML, JPEG/PNG or plain text into a PDF
//! - `merge`: concatenate several PDFs in order
//! - `split`: extract selected pages as single-page PDFs
//!
//! Every input handed to the [`Pipeline`] is deleted when its request ends,
//! on success and failure alike. The same operations are exposed as MCP
//! tools by [`server`].

pub mod config;
pub mod convert;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod server;
pub mod source;

pub use config::PipelineConfig;
pub use error::{Error, ErrorKind, Result};
pub use pipeline::{
    Operation, OperationOutcome, OutputDocument, Pipeline, RequestState, CONTENT_TYPE,
};
pub use server::{run_server, run_server_with_config, PdfPipelineServer, ServerConfig, UploadSource};
pub use source::SourceFile;
