//! Plain text → single A4 page
//!
//! Text is set in the standard Helvetica font at 12pt, starting 40pt from
//! the top-left corner and wrapped to the page width minus both margins.
//! Everything lands on one page; lines past the bottom edge are clipped by
//! the viewer.

use super::{single_page_pdf, A4_HEIGHT_PT, A4_WIDTH_PT};
use crate::error::Result;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, StringFormat};

const FONT_SIZE: f32 = 12.0;
const LINE_HEIGHT: f32 = 14.4;
const MARGIN: f32 = 40.0;
const TAB: &str = "    ";

/// Helvetica advance widths (1/1000 em) for WinAnsi codes 32..=126
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const DEFAULT_WIDTH: u16 = 556;

/// Lay out `text` on one A4 page and serialize it
pub fn text_to_pdf(text: &str) -> Result<Vec<u8>> {
    let lines = wrap_text(text, A4_WIDTH_PT - 2.0 * MARGIN);

    let mut doc = Document::with_version("1.7");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources = dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    };

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Real(FONT_SIZE)]),
        Operation::new("TL", vec![Object::Real(LINE_HEIGHT)]),
        Operation::new(
            "Td",
            vec![Object::Real(MARGIN), Object::Real(A4_HEIGHT_PT - MARGIN)],
        ),
    ];
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            operations.push(Operation::new("T*", vec![]));
        }
        if !line.is_empty() {
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(line.clone(), StringFormat::Literal)],
            ));
        }
    }
    operations.push(Operation::new("ET", vec![]));

    single_page_pdf(
        &mut doc,
        A4_WIDTH_PT,
        A4_HEIGHT_PT,
        resources,
        Content { operations },
    )
}

/// Map a char to its WinAnsi code, or `?` when the font can't show it
fn win_ansi(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '\u{a0}'..='\u{ff}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8a,
        '‹' => 0x8b,
        'Œ' => 0x8c,
        'Ž' => 0x8e,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9a,
        '›' => 0x9b,
        'œ' => 0x9c,
        'ž' => 0x9e,
        'Ÿ' => 0x9f,
        _ => b'?',
    }
}

fn encode(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi).collect()
}

fn glyph_width(code: u8) -> u16 {
    match code {
        32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
        _ => DEFAULT_WIDTH,
    }
}

/// Rendered width of encoded text in points
fn text_width(encoded: &[u8]) -> f32 {
    let units: u32 = encoded.iter().map(|&b| u32::from(glyph_width(b))).sum();
    units as f32 * FONT_SIZE / 1000.0
}

/// Break text into encoded lines no wider than `max_width`.
///
/// Explicit newlines always break. Words wrap at spaces; a word wider than
/// the whole line is broken between characters.
fn wrap_text(text: &str, max_width: f32) -> Vec<Vec<u8>> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = Vec::new();

    for paragraph in normalized.split('\n') {
        let paragraph = encode(&paragraph.replace('\t', TAB));
        let mut current: Option<Vec<u8>> = None;

        for word in paragraph.split(|&b| b == b' ') {
            let candidate = match &current {
                None => word.to_vec(),
                Some(line) => {
                    let mut joined = line.clone();
                    joined.push(b' ');
                    joined.extend_from_slice(word);
                    joined
                }
            };
            if text_width(&candidate) <= max_width {
                current = Some(candidate);
                continue;
            }

            if let Some(line) = current.take() {
                lines.push(line);
            }
            let mut rest = word;
            while text_width(rest) > max_width {
                let split = fitting_prefix(rest, max_width);
                lines.push(rest[..split].to_vec());
                rest = &rest[split..];
            }
            current = Some(rest.to_vec());
        }

        lines.push(current.unwrap_or_default());
    }

    // a trailing newline should not add a blank final line
    if lines.len() > 1 && lines.last().is_some_and(|l| l.is_empty()) && normalized.ends_with('\n')
    {
        lines.pop();
    }
    lines
}

/// Longest prefix that fits, never less than one byte
fn fitting_prefix(word: &[u8], max_width: f32) -> usize {
    let mut width = 0.0;
    for (i, &b) in word.iter().enumerate() {
        width += f32::from(glyph_width(b)) * FONT_SIZE / 1000.0;
        if width > max_width {
            return i.max(1);
        }
    }
    word.len()
}
