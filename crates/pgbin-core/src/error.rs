//! Structured install/catalog errors.
//!
//! Every fatal condition is a `PgBinError` carrying a kind tag, an ordered list
//! of named diagnostic fields (paths, commands, raw tool output) and optional
//! remediation hints. Text is produced only by `render()` at the host boundary.

use std::fmt;

/// Maximum number of characters of raw tool output kept in a diagnostic field.
pub const MAX_OUTPUT_CHARS: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedPlatform,
    FilesystemError,
    ChecksumFetchFailed,
    ChecksumFormatInvalid,
    DownloadFailed,
    /// Computed and expected digests differ; the archive was deleted.
    ChecksumMismatch,
    /// Every digest method failed and the bypass flag was not set.
    ChecksumUnavailable,
    /// Extractor failed; the archive was deleted.
    ExtractionFailed,
    UnexpectedArchiveLayout,
    RelocationIncomplete,
    InitializationFailed,
    InitializationIncomplete,
    NoSupportedVersions,
    /// HTTP 403 with a rate-limit marker in the body.
    UpstreamRateLimited,
    /// Any other catalog transport failure or non-success status.
    UpstreamRequestFailed,
    RequestTimeout,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::UnsupportedPlatform => "UnsupportedPlatform",
            ErrorKind::FilesystemError => "FilesystemError",
            ErrorKind::ChecksumFetchFailed => "ChecksumFetchFailed",
            ErrorKind::ChecksumFormatInvalid => "ChecksumFormatInvalid",
            ErrorKind::DownloadFailed => "DownloadFailed",
            ErrorKind::ChecksumMismatch => "ChecksumMismatch",
            ErrorKind::ChecksumUnavailable => "ChecksumUnavailable",
            ErrorKind::ExtractionFailed => "ExtractionFailed",
            ErrorKind::UnexpectedArchiveLayout => "UnexpectedArchiveLayout",
            ErrorKind::RelocationIncomplete => "RelocationIncomplete",
            ErrorKind::InitializationFailed => "InitializationFailed",
            ErrorKind::InitializationIncomplete => "InitializationIncomplete",
            ErrorKind::NoSupportedVersions => "NoSupportedVersions",
            ErrorKind::UpstreamRateLimited => "UpstreamRateLimited",
            ErrorKind::UpstreamRequestFailed => "UpstreamRequestFailed",
            ErrorKind::RequestTimeout => "RequestTimeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal error with structured diagnostics.
#[derive(Debug)]
pub struct PgBinError {
    pub kind: ErrorKind,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
    pub hints: Vec<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

pub type Result<T> = std::result::Result<T, PgBinError>;

impl PgBinError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            fields: Vec::new(),
            hints: Vec::new(),
            source: None,
        }
    }

    /// Attach a named diagnostic field. Later fields with the same name are kept
    /// alongside earlier ones (e.g. one `command` per attempted method).
    pub fn field(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.fields.push((name, value.into()));
        self
    }

    /// Attach raw tool output, truncated to `MAX_OUTPUT_CHARS`.
    pub fn output(self, name: &'static str, raw: &str) -> Self {
        let truncated = truncate_output(raw, MAX_OUTPUT_CHARS);
        self.field(name, truncated)
    }

    pub fn hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// First value recorded under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Multi-line, human-readable rendering for the host runtime.
    pub fn render(&self) -> String {
        let mut out = format!("{}: {}", self.kind, self.message);
        for (name, value) in &self.fields {
            if value.contains('\n') {
                out.push_str(&format!("\n  {}:", name));
                for line in value.lines() {
                    out.push_str(&format!("\n    {}", line));
                }
            } else {
                out.push_str(&format!("\n  {}: {}", name, value));
            }
        }
        if let Some(source) = &self.source {
            out.push_str(&format!("\n  cause: {}", source));
        }
        for hint in &self.hints {
            out.push_str(&format!("\nhint: {}", hint));
        }
        out
    }
}

impl fmt::Display for PgBinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for PgBinError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Truncate `raw` to at most `max` characters, marking the cut.
pub fn truncate_output(raw: &str, max: usize) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(max) {
        Some((idx, _)) => format!("{}... [truncated]", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
