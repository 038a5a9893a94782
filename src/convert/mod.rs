//! Source format → PDF conversion
//!
//! Dispatch is by the extension of the original filename only; content is
//! never sniffed. A file whose extension lies about its content fails inside
//! the chosen converter.

pub mod html;
mod raster;
mod text;

pub use self::html::{HtmlRenderer, UnavailableRenderer};
#[cfg(feature = "chromium")]
pub use self::html::ChromiumRenderer;
pub use self::raster::image_to_pdf;
pub use self::text::text_to_pdf;

use crate::error::{Error, Result};
use lopdf::content::Content;
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::path::Path;

/// A4 page size in PDF points
pub const A4_WIDTH_PT: f32 = 595.28;
pub const A4_HEIGHT_PT: f32 = 841.89;

/// Raster formats accepted for embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

/// How a source file becomes a PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterStrategy {
    /// Load in a headless browser and print to A4
    RenderHtml,
    /// Decode and place on a page sized to the image
    EmbedRaster(ImageKind),
    /// Lay out plain text on a single A4 page
    LayoutText,
}

/// Pick the converter for a filename extension (`".png"` or `"png"`,
/// any case).
pub fn select_converter(extension: &str) -> Result<ConverterStrategy> {
    let normalized = extension.trim().trim_start_matches('.').to_ascii_lowercase();
    match normalized.as_str() {
        "html" => Ok(ConverterStrategy::RenderHtml),
        "jpg" | "jpeg" => Ok(ConverterStrategy::EmbedRaster(ImageKind::Jpeg)),
        "png" => Ok(ConverterStrategy::EmbedRaster(ImageKind::Png)),
        "txt" => Ok(ConverterStrategy::LayoutText),
        _ => Err(Error::UnsupportedFormat {
            extension: if extension.is_empty() {
                "(none)".to_string()
            } else {
                extension.to_string()
            },
        }),
    }
}

/// Run a file-based (non-browser) strategy against a file on disk
pub fn convert_file(strategy: ConverterStrategy, path: &Path) -> Result<Vec<u8>> {
    match strategy {
        ConverterStrategy::EmbedRaster(kind) => {
            let data = std::fs::read(path)?;
            image_to_pdf(&data, kind)
        }
        ConverterStrategy::LayoutText => {
            let data = std::fs::read(path)?;
            text_to_pdf(&String::from_utf8_lossy(&data))
        }
        ConverterStrategy::RenderHtml => Err(Error::Render {
            reason: "HTML needs an HtmlRenderer".to_string(),
        }),
    }
}

/// Serialize a fresh one-page document.
///
/// `resources` becomes the page's resource dictionary and `content` its
/// single content stream. Streams are Flate-compressed on save.
pub(crate) fn single_page_pdf(
    doc: &mut Document,
    width: f32,
    height: f32,
    resources: Dictionary,
    content: Content,
) -> Result<Vec<u8>> {
    let pages_id = doc.new_object_id();

    let encoded = content.encode().map_err(|e| Error::Assembly {
        reason: format!("Failed to encode page content: {}", e),
    })?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
    let resources_id = doc.add_object(resources);

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(width),
            Object::Real(height),
        ],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out).map_err(|e| Error::Assembly {
        reason: format!("Failed to write PDF: {}", e),
    })?;
    Ok(out)
}
