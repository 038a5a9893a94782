//! Pipeline configuration

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default per-file upload limit (50MB)
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Default maximum number of files accepted by a merge
pub const DEFAULT_MAX_MERGE_FILES: usize = 10;

/// Which compression backend the pipeline uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionEngine {
    /// qpdf linked in-process through FFI
    #[default]
    Library,
    /// qpdf binary spawned as a child process
    Command,
}

impl FromStr for CompressionEngine {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "library" | "ffi" => Ok(CompressionEngine::Library),
            "command" | "process" => Ok(CompressionEngine::Command),
            other => Err(format!("unknown compression engine: {}", other)),
        }
    }
}

/// Resource and tooling configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Shared directory for request temp files (default: system temp dir)
    pub temp_root: PathBuf,
    /// Maximum size of a single input file in bytes (default: 50MB)
    pub max_upload_bytes: u64,
    /// Maximum number of inputs to a merge (default: 10)
    pub max_merge_files: usize,
    /// Compression backend (default: in-process qpdf)
    pub compression_engine: CompressionEngine,
    /// qpdf executable used by the command backend (default: "qpdf" on PATH)
    pub qpdf_binary: PathBuf,
    /// Browser executable for HTML rendering (default: auto-detect)
    pub chrome_executable: Option<PathBuf>,
    /// Upper bound on external process and render calls (default: none)
    pub external_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_merge_files: DEFAULT_MAX_MERGE_FILES,
            compression_engine: CompressionEngine::default(),
            qpdf_binary: PathBuf::from("qpdf"),
            chrome_executable: None,
            external_timeout: None,
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `PDF_PIPELINE_*` environment variables.
    ///
    /// Unparsable values are logged and skipped.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("PDF_PIPELINE_TEMP_DIR") {
            self.temp_root = PathBuf::from(dir);
        }
        if let Some(v) = parse_var(&lookup, "PDF_PIPELINE_MAX_UPLOAD_BYTES") {
            self.max_upload_bytes = v;
        }
        if let Some(v) = parse_var(&lookup, "PDF_PIPELINE_MAX_MERGE_FILES") {
            self.max_merge_files = v;
        }
        if let Some(v) = parse_var(&lookup, "PDF_PIPELINE_COMPRESSION_ENGINE") {
            self.compression_engine = v;
        }
        if let Some(bin) = lookup("PDF_PIPELINE_QPDF_BINARY") {
            self.qpdf_binary = PathBuf::from(bin);
        }
        if let Some(chrome) = lookup("PDF_PIPELINE_CHROME") {
            self.chrome_executable = Some(PathBuf::from(chrome));
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "PDF_PIPELINE_EXTERNAL_TIMEOUT_SECS") {
            self.external_timeout = Some(Duration::from_secs(secs));
        }
        self
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(key, value = %raw, error = %e, "ignoring invalid config value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.max_merge_files, 10);
        assert_eq!(config.compression_engine, CompressionEngine::Library);
        assert!(config.external_timeout.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = PipelineConfig::default().with_overrides(lookup_from(&[
            ("PDF_PIPELINE_TEMP_DIR", "/var/tmp/pipeline"),
            ("PDF_PIPELINE_MAX_MERGE_FILES", "4"),
            ("PDF_PIPELINE_COMPRESSION_ENGINE", "command"),
            ("PDF_PIPELINE_EXTERNAL_TIMEOUT_SECS", "30"),
        ]));
        assert_eq!(config.temp_root, PathBuf::from("/var/tmp/pipeline"));
        assert_eq!(config.max_merge_files, 4);
        assert_eq!(config.compression_engine, CompressionEngine::Command);
        assert_eq!(config.external_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_override_ignored() {
        let config = PipelineConfig::default().with_overrides(lookup_from(&[
            ("PDF_PIPELINE_MAX_UPLOAD_BYTES", "lots"),
            ("PDF_PIPELINE_COMPRESSION_ENGINE", "magic"),
        ]));
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert_eq!(config.compression_engine, CompressionEngine::Library);
    }
}
