//! Materialize caller-supplied files into the temp workspace
//!
//! The pipeline deletes every input it consumes, so sources coming from a
//! caller's own filesystem are copied into the workspace first. Sources over
//! `max_bytes` are rejected before anything is read or decoded.

use crate::error::{Error, Result};
use crate::source::{mime_for_name, SourceFile, TempWorkspace};
use base64::Engine;
use std::path::Path;

/// Copy a file into the workspace as a new `SourceFile`.
///
/// `name` overrides the filename used for format dispatch.
pub fn materialize_path<P: AsRef<Path>>(
    workspace: &TempWorkspace,
    path: P,
    name: Option<&str>,
    max_bytes: u64,
) -> Result<SourceFile> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(Error::SourceResolution {
            reason: format!("File not found: {}", path.display()),
        });
    }

    let original_name = match name {
        Some(n) => n.to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
    };

    check_size(&original_name, std::fs::metadata(path)?.len(), max_bytes)?;

    let data = std::fs::read(path)?;
    store(workspace, &original_name, &data)
}

/// Decode base64 content into the workspace as a new `SourceFile`
pub fn materialize_base64(
    workspace: &TempWorkspace,
    base64_data: &str,
    name: &str,
    max_bytes: u64,
) -> Result<SourceFile> {
    let encoded = base64_data.trim();
    check_size(name, decoded_len(encoded), max_bytes)?;

    let engine = base64::engine::general_purpose::STANDARD;
    let data = engine.decode(encoded)?;
    store(workspace, name, &data)
}

/// Decoded size of padded base64 text
fn decoded_len(encoded: &str) -> u64 {
    let padding = encoded.bytes().rev().take_while(|b| *b == b'=').count();
    ((encoded.len() / 4 * 3).saturating_sub(padding)) as u64
}

fn check_size(name: &str, size: u64, max_bytes: u64) -> Result<()> {
    if size > max_bytes {
        return Err(Error::FileTooLarge {
            name: name.to_string(),
            size,
            max_size: max_bytes,
        });
    }
    Ok(())
}

fn store(workspace: &TempWorkspace, name: &str, data: &[u8]) -> Result<SourceFile> {
    let temp = workspace.write("upload", "bin", data)?;
    Ok(SourceFile::from_temp(
        temp,
        name,
        mime_for_name(name),
        data.len() as u64,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_LIMIT: u64 = u64::MAX;

    #[test]
    fn test_materialize_base64() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = TempWorkspace::new(dir.path());

        let file = materialize_base64(&workspace, "SGVsbG8gV29ybGQ=", "hello.txt", NO_LIMIT).unwrap();
        assert_eq!(file.original_name(), "hello.txt");
        assert_eq!(file.declared_mime_type(), "text/plain");
        assert_eq!(file.size_bytes(), 11);
        assert_eq!(std::fs::read(file.temporary_path()).unwrap(), b"Hello World");

        drop(file);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_materialize_base64_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = TempWorkspace::new(dir.path());

        let result = materialize_base64(&workspace, "not valid base64!!!", "a.pdf", NO_LIMIT);
        assert!(matches!(result, Err(Error::Base64Decode(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_materialize_path_copies_and_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("notes.txt");
        std::fs::write(&original, b"some notes").unwrap();

        let temp_root = dir.path().join("work");
        let workspace = TempWorkspace::new(&temp_root);

        let file = materialize_path(&workspace, &original, None, NO_LIMIT).unwrap();
        assert_eq!(file.original_name(), "notes.txt");
        assert!(file.temporary_path().starts_with(&temp_root));

        drop(file);
        assert!(original.exists());
        assert_eq!(std::fs::read_dir(&temp_root).unwrap().count(), 0);
    }

    #[test]
    fn test_materialize_path_name_override() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("blob");
        std::fs::write(&original, b"<p>hi</p>").unwrap();
        let workspace = TempWorkspace::new(dir.path().join("work"));

        let file = materialize_path(&workspace, &original, Some("page.html"), NO_LIMIT).unwrap();
        assert_eq!(file.extension(), ".html");
        assert_eq!(file.declared_mime_type(), "text/html");
    }

    #[test]
    fn test_materialize_path_not_found() {
        let workspace = TempWorkspace::new("/tmp/unused");
        let result = materialize_path(&workspace, "/nonexistent/path/file.pdf", None, NO_LIMIT);
        assert!(matches!(result, Err(Error::SourceResolution { .. })));
    }

    #[test]
    fn test_oversized_path_rejected_before_copy() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("big.pdf");
        std::fs::write(&original, vec![0u8; 4096]).unwrap();
        let temp_root = dir.path().join("work");
        let workspace = TempWorkspace::new(&temp_root);

        let err = materialize_path(&workspace, &original, None, 16).unwrap_err();
        assert!(matches!(
            err,
            Error::FileTooLarge {
                size: 4096,
                max_size: 16,
                ..
            }
        ));
        assert!(!temp_root.exists() || std::fs::read_dir(&temp_root).unwrap().count() == 0);
    }

    #[test]
    fn test_oversized_base64_rejected_before_decode() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = TempWorkspace::new(dir.path());
        let encoded = base64::engine::general_purpose::STANDARD.encode(vec![7u8; 64]);

        let err = materialize_base64(&workspace, &encoded, "big.pdf", 16).unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { size: 64, .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = TempWorkspace::new(dir.path());

        // 11 decoded bytes, one padding character
        let file = materialize_base64(&workspace, "SGVsbG8gV29ybGQ=", "hello.txt", 11).unwrap();
        assert_eq!(file.size_bytes(), 11);
        drop(file);

        let err = materialize_base64(&workspace, "SGVsbG8gV29ybGQ=", "hello.txt", 10).unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { size: 11, .. }));
    }
}
