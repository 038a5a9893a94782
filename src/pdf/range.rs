//! Page-range parsing
//!
//! Turns a user page-selection expression such as `"1-3,5,8"` into an ordered,
//! duplicate-free list of zero-based page indices for one document.
//!
//! The parser is deliberately permissive and never fails:
//! - an empty expression selects every page, ascending
//! - each number is read from its leading digits, so `"5abc"` is page 5
//! - in `a-b-c` only the first two parts count
//! - tokens without leading digits are skipped
//! - reversed ranges (`5-2`) select nothing
//! - page numbers outside `1..=total_pages` are dropped
//!
//! Deciding whether an empty selection is a user error is left to the caller.

use std::collections::HashSet;

/// Ordered, duplicate-free zero-based page indices, all valid for the
/// document they were resolved against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageIndexSet {
    indices: Vec<u32>,
}

impl PageIndexSet {
    /// Every page of a `total_pages` document, ascending
    pub fn all(total_pages: u32) -> Self {
        Self {
            indices: (0..total_pages).collect(),
        }
    }

    /// A single page
    pub fn single(index: u32) -> Self {
        Self {
            indices: vec![index],
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.indices.iter().copied()
    }
}

/// Parse a page-selection expression against a document of `total_pages` pages.
///
/// Tokens are comma-separated 1-based page numbers (`"5"`) or inclusive ranges
/// (`"2-7"`), processed left to right. A page requested more than once keeps
/// only its first position.
pub fn parse_range(expression: &str, total_pages: u32) -> PageIndexSet {
    let expression = expression.trim();
    if expression.is_empty() {
        return PageIndexSet::all(total_pages);
    }

    let mut seen = HashSet::new();
    let mut indices = Vec::new();

    for token in expression.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        for page in token_pages(token, total_pages) {
            let index = page - 1;
            if seen.insert(index) {
                indices.push(index);
            }
        }
    }

    PageIndexSet { indices }
}

/// In-bounds 1-based pages named by one token; empty for malformed tokens.
fn token_pages(token: &str, total_pages: u32) -> std::ops::RangeInclusive<u32> {
    let empty = 1..=0;

    let (start, end) = if token.contains('-') {
        let mut parts = token.split('-');
        let start = parts.next().and_then(leading_number);
        let end = parts.next().and_then(leading_number);
        match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => return empty,
        }
    } else {
        match leading_number(token) {
            Some(page) => (page, page),
            None => return empty,
        }
    };

    if start > end {
        return empty;
    }

    // Clamp to the document so huge ranges do not iterate past the last page
    start.max(1)..=end.min(total_pages)
}

/// Number formed by the leading ASCII digits of `part`, ignoring any trailing
/// text. Values past `u32::MAX` saturate.
fn leading_number(part: &str) -> Option<u32> {
    let part = part.trim();
    let digits = part
        .find(|c: char| !c.is_ascii_digit())
        .map_or(part, |end| &part[..end]);
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse::<u32>().unwrap_or(u32::MAX))
}
