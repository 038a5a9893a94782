//! Generated PDFs for unit tests

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// A `pages`-page PDF whose page `k` shows the text `"<label> k"`
pub fn sample_pdf(label: &str, pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for page in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(24)]),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("{} {}", label, page))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap_or_default(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => Object::Integer(pages as i64),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

/// Text drawn on each page of a PDF, in page order
pub fn page_markers(data: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(data).unwrap();
    doc.get_pages()
        .values()
        .map(|&page_id| page_text(&doc, page_id))
        .collect()
}

fn page_text(doc: &Document, page_id: lopdf::ObjectId) -> String {
    let bytes = doc.get_page_content(page_id).unwrap();
    let content = Content::decode(&bytes).unwrap();
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .flat_map(|op| op.operands.iter())
        .filter_map(|operand| match operand {
            Object::String(text, _) => Some(String::from_utf8_lossy(text).to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}
