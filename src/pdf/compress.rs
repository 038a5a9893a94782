//! Tiered PDF compression
//!
//! Three named tiers map to fixed qpdf settings of increasing strength:
//!
//! | tier   | stream recompression | object streams | linearization |
//! |--------|----------------------|----------------|---------------|
//! | low    | yes                  |                |               |
//! | medium | yes                  | generate       |               |
//! | high   | yes                  | generate       | yes           |
//!
//! Failures are reported once and never retried: the transform is
//! deterministic, so a failure means a malformed input or a missing tool.

use crate::error::{Error, Result};
use crate::pdf::qpdf::QpdfWrapper;
use crate::source::TempWorkspace;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Named compression aggressiveness level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityTier {
    /// Parse an optional user-supplied tier; absent or blank means medium.
    pub fn parse_optional(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            None | Some("") => Ok(QualityTier::default()),
            Some(v) => v.parse(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }

    pub fn generates_object_streams(&self) -> bool {
        matches!(self, QualityTier::Medium | QualityTier::High)
    }

    pub fn linearizes(&self) -> bool {
        matches!(self, QualityTier::High)
    }

    /// qpdf command-line flags for this tier
    pub fn qpdf_args(&self) -> &'static [&'static str] {
        match self {
            QualityTier::Low => &["--stream-data=compress"],
            QualityTier::Medium => &["--stream-data=compress", "--object-streams=generate"],
            QualityTier::High => &[
                "--stream-data=compress",
                "--object-streams=generate",
                "--linearize",
            ],
        }
    }
}

impl FromStr for QualityTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "medium" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            _ => Err(Error::InvalidQualityTier {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can shrink a PDF on disk into a new in-memory PDF
pub trait CompressionBackend: Send + Sync {
    fn compress(&self, input: &Path, tier: QualityTier) -> Result<Vec<u8>>;
}

/// qpdf linked in-process
#[derive(Debug, Default, Clone)]
pub struct QpdfLibraryBackend;

impl CompressionBackend for QpdfLibraryBackend {
    fn compress(&self, input: &Path, tier: QualityTier) -> Result<Vec<u8>> {
        let data = std::fs::read(input)?;
        QpdfWrapper::compress(&data, tier)
    }
}

/// qpdf run as a child process, writing to a unique temp output path
#[derive(Debug, Clone)]
pub struct QpdfCommandBackend {
    binary: PathBuf,
    workspace: TempWorkspace,
    timeout: Option<Duration>,
}

impl QpdfCommandBackend {
    pub fn new(binary: impl Into<PathBuf>, workspace: TempWorkspace) -> Self {
        Self {
            binary: binary.into(),
            workspace,
            timeout: None,
        }
    }

    /// Kill the child and fail if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn run(&self, input: &Path, output: &Path, tier: QualityTier) -> Result<()> {
        // stderr goes to a file so a chatty tool can never block on a full pipe
        let log = self.workspace.allocate("qpdf-stderr", "log")?;
        let log_file = std::fs::File::create(log.path())?;

        let mut child = Command::new(&self.binary)
            .args(tier.qpdf_args())
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log_file))
            .spawn()
            .map_err(|e| Error::ExternalTool {
                reason: format!("failed to execute {}: {}", self.binary.display(), e),
            })?;

        let status = match self.timeout {
            None => child.wait()?,
            Some(limit) => {
                let started = Instant::now();
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if started.elapsed() >= limit {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(Error::ExternalTool {
                            reason: format!("qpdf timed out after {:?}", limit),
                        });
                    }
                    std::thread::sleep(Duration::from_millis(20));
                }
            }
        };

        // qpdf exits 3 when it succeeded with warnings
        if status.success() || status.code() == Some(3) {
            return Ok(());
        }

        let stderr = std::fs::read_to_string(log.path()).unwrap_or_default();
        Err(Error::ExternalTool {
            reason: format!(
                "qpdf failed (exit code {}): {}",
                status
                    .code()
                    .map_or_else(|| "unknown".to_string(), |c| c.to_string()),
                stderr.trim()
            ),
        })
    }
}

impl CompressionBackend for QpdfCommandBackend {
    fn compress(&self, input: &Path, tier: QualityTier) -> Result<Vec<u8>> {
        let output = self.workspace.allocate("compressed", "pdf")?;
        tracing::debug!(
            input = %input.display(),
            output = %output.path().display(),
            %tier,
            "running qpdf"
        );
        self.run(input, output.path(), tier)?;
        output.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::sample_pdf;

    #[test]
    fn test_parse_tiers() {
        assert_eq!("low".parse::<QualityTier>().unwrap(), QualityTier::Low);
        assert_eq!(" Medium ".parse::<QualityTier>().unwrap(), QualityTier::Medium);
        assert_eq!("HIGH".parse::<QualityTier>().unwrap(), QualityTier::High);
    }

    #[test]
    fn test_unknown_tier_is_validation_error() {
        let err = "ultra".parse::<QualityTier>().unwrap_err();
        assert!(matches!(err, Error::InvalidQualityTier { .. }));
        assert!(QualityTier::parse_optional(Some("ultra")).is_err());
    }

    #[test]
    fn test_absent_tier_defaults_to_medium() {
        assert_eq!(QualityTier::parse_optional(None).unwrap(), QualityTier::Medium);
        assert_eq!(QualityTier::parse_optional(Some("")).unwrap(), QualityTier::Medium);
        assert_eq!(QualityTier::parse_optional(Some("  ")).unwrap(), QualityTier::Medium);
    }

    #[test]
    fn test_tier_settings_increase() {
        assert!(!QualityTier::Low.generates_object_streams());
        assert!(QualityTier::Medium.generates_object_streams());
        assert!(!QualityTier::Medium.linearizes());
        assert!(QualityTier::High.linearizes());
        assert_eq!(QualityTier::Low.qpdf_args().len(), 1);
        assert_eq!(QualityTier::Medium.qpdf_args().len(), 2);
        assert!(QualityTier::High.qpdf_args().contains(&"--linearize"));
    }

    #[test]
    fn test_library_backend_compresses_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        std::fs::write(&input, sample_pdf("x", 2)).unwrap();

        let out = QpdfLibraryBackend.compress(&input, QualityTier::High).unwrap();
        assert_eq!(QpdfWrapper::get_page_count(&out).unwrap(), 2);
    }

    #[test]
    fn test_command_backend_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        std::fs::write(&input, sample_pdf("x", 1)).unwrap();
        let work = dir.path().join("work");

        let backend =
            QpdfCommandBackend::new("/nonexistent/bin/qpdf", TempWorkspace::new(&work));
        let err = backend.compress(&input, QualityTier::Low).unwrap_err();
        assert!(matches!(err, Error::ExternalTool { .. }));
        assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
    }

    #[cfg(unix)]
    fn stub_tool(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-qpdf");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_command_backend_failure_cleans_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        std::fs::write(&input, b"%PDF-1.4").unwrap();
        let work = dir.path().join("work");

        // Writes a partial output, then fails
        let tool = stub_tool(dir.path(), "for last; do :; done\necho partial > \"$last\"\necho broken >&2\nexit 2");
        let backend = QpdfCommandBackend::new(tool, TempWorkspace::new(&work));

        match backend.compress(&input, QualityTier::Medium) {
            Err(Error::ExternalTool { reason }) => {
                assert!(reason.contains("exit code 2"));
                assert!(reason.contains("broken"));
            }
            other => panic!("expected external tool error, got {:?}", other),
        }
        assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_backend_reads_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        std::fs::write(&input, b"%PDF-1.4 input").unwrap();
        let work = dir.path().join("work");

        // Copies the input (second-to-last arg) to the output (last arg)
        let tool = stub_tool(
            dir.path(),
            "prev=\"\"; last=\"\"\nfor a; do prev=\"$last\"; last=\"$a\"; done\ncp \"$prev\" \"$last\"",
        );
        let backend = QpdfCommandBackend::new(tool, TempWorkspace::new(&work));

        let out = backend.compress(&input, QualityTier::High).unwrap();
        assert_eq!(out, b"%PDF-1.4 input");
        assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_command_backend_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        std::fs::write(&input, b"%PDF-1.4").unwrap();
        let work = dir.path().join("work");

        let tool = stub_tool(dir.path(), "sleep 5");
        let backend = QpdfCommandBackend::new(tool, TempWorkspace::new(&work))
            .with_timeout(Some(Duration::from_millis(200)));

        let err = backend.compress(&input, QualityTier::Low).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
