use super::{single_page_pdf, ImageKind};
use crate::error::{Error, Result};
use image::{DynamicImage, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// Embed a JPEG or PNG on a page exactly the size of the image (1px = 1pt).
///
/// Pixels are stored as 8-bit RGB; an alpha channel becomes a soft mask.
pub fn image_to_pdf(data: &[u8], kind: ImageKind) -> Result<Vec<u8>> {
    let format = match kind {
        ImageKind::Jpeg => ImageFormat::Jpeg,
        ImageKind::Png => ImageFormat::Png,
    };
    let img = image::load_from_memory_with_format(data, format).map_err(|e| Error::Assembly {
        reason: format!("Failed to decode image: {}", e),
    })?;

    let (width, height) = (img.width(), img.height());
    let mut doc = Document::with_version("1.7");

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    if let Some(alpha) = alpha_channel(&img) {
        let mask_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
        ));
        image_dict.set("SMask", mask_id);
    }
    let image_id = doc.add_object(Stream::new(image_dict, img.to_rgb8().into_raw()));

    let resources = dictionary! {
        "XObject" => dictionary! { "Im0" => image_id },
    };
    let (w, h) = (width as f32, height as f32);
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(w),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(h),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };

    single_page_pdf(&mut doc, w, h, resources, content)
}

fn alpha_channel(img: &DynamicImage) -> Option<Vec<u8>> {
    if !img.color().has_alpha() {
        return None;
    }
    Some(img.to_rgba8().pixels().map(|p| p.0[3]).collect())
}
