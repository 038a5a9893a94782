//! PDF processing layer
//!
//! Page-range parsing, page assembly and compression. Assembly and
//! compression use qpdf; page selection is pure.

pub mod compress;
mod qpdf;
mod range;

#[cfg(test)]
pub(crate) mod fixtures;

pub use compress::{CompressionBackend, QpdfCommandBackend, QpdfLibraryBackend, QualityTier};
pub use qpdf::{QpdfWrapper, SourceDocument};
pub use range::{parse_range, PageIndexSet};
