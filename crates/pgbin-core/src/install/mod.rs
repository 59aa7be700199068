//! Download, verify, extract, relocate and bootstrap one PostgreSQL version.
//!
//! The pipeline is linear and stops at the first fatal error. The temporary
//! archive lives inside the destination and is removed on every exit path
//! once the download has started.

mod archive;
mod artifact;
mod bootstrap;
mod guard;
mod relocate;

pub use archive::extract_tar_gz;
pub use artifact::{ReleaseArtifact, PRODUCT};
pub use bootstrap::{
    bootstrap_data_dir, has_failure_marker, initdb_args, BootstrapOutcome, InitOutput,
    Initializer, ProcessInitializer, DATA_DIR,
};
pub use relocate::{relocate, RelocationMethod};

use crate::checksum::{extract_digest, ChecksumEngine};
use crate::config::{Settings, ENV_SKIP_CHECKSUM};
use crate::error::{ErrorKind, PgBinError, Result};
use crate::http::{is_success, Request, Transport, TransportError};
use crate::target::{self, Arch, LibcProbe, OsFamily, TargetTriple};
use guard::TempArchive;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Supported products. Only PostgreSQL today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Postgres,
}

impl Tool {
    pub const ALIASES: [&'static str; 3] = ["postgres", "postgresql", "pg"];

    pub fn parse(name: &str) -> Option<Tool> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALIASES
            .iter()
            .any(|alias| *alias == name)
            .then_some(Tool::Postgres)
    }
}

impl FromStr for Tool {
    type Err = PgBinError;

    fn from_str(s: &str) -> Result<Self> {
        Tool::parse(s).ok_or_else(|| {
            PgBinError::new(ErrorKind::InvalidInput, format!("unsupported tool '{}'", s))
                .field("tool", s)
                .field("accepted", Tool::ALIASES.join(", "))
        })
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Postgres => f.write_str("postgres"),
        }
    }
}

/// Caller-supplied install request.
#[derive(Debug, Clone)]
pub struct InstallContext {
    pub tool: String,
    pub version: String,
    pub destination: PathBuf,
}

impl InstallContext {
    pub fn new(tool: impl Into<String>, version: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            version: version.into(),
            destination: destination.into(),
        }
    }

    /// Check every field before any side effect.
    pub fn validate(&self) -> Result<Tool> {
        let invalid = |msg: &str| {
            PgBinError::new(ErrorKind::InvalidInput, msg)
                .field("tool", self.tool.clone())
                .field("version", self.version.clone())
                .field("destination", self.destination.display().to_string())
        };
        if self.tool.trim().is_empty() {
            return Err(invalid("tool name is empty"));
        }
        let version = self.version.trim();
        if version.is_empty() {
            return Err(invalid("version is empty"));
        }
        // The version becomes a URL path segment and a directory name.
        if version.contains(['/', '\\']) || version.contains("..") {
            return Err(invalid("version contains path separators"));
        }
        if self.destination.as_os_str().is_empty() {
            return Err(invalid("destination path is empty"));
        }
        self.tool.parse::<Tool>()
    }
}

/// What an install did.
#[derive(Debug, Clone)]
pub struct InstallReport {
    pub tool: Tool,
    pub version: String,
    pub target: TargetTriple,
    pub destination: PathBuf,
    /// None when verification was bypassed.
    pub digest: Option<String>,
    pub relocation: RelocationMethod,
    pub bootstrap: BootstrapOutcome,
}

/// Collaborators for one install run.
pub struct InstallPipeline<'a> {
    settings: &'a Settings,
    transport: &'a dyn Transport,
    probe: &'a dyn LibcProbe,
    checksum: &'a ChecksumEngine,
    initializer: &'a dyn Initializer,
}

impl<'a> InstallPipeline<'a> {
    pub fn new(
        settings: &'a Settings,
        transport: &'a dyn Transport,
        probe: &'a dyn LibcProbe,
        checksum: &'a ChecksumEngine,
        initializer: &'a dyn Initializer,
    ) -> Self {
        Self {
            settings,
            transport,
            probe,
            checksum,
            initializer,
        }
    }

    pub fn run(&self, ctx: &InstallContext, os: &OsFamily, arch: &Arch) -> Result<InstallReport> {
        let tool = ctx.validate()?;
        let version = ctx.version.trim().to_string();
        let dest = ctx.destination.as_path();

        let triple = target::resolve(os, arch, self.probe)?;
        let artifact = ReleaseArtifact::new(&self.settings.download_base_url, &version, triple.target);
        tracing::info!(%tool, %version, target = triple.target, dest = %dest.display(), "installing");

        ensure_dir(dest)?;
        let expected = self.fetch_expected_digest(&artifact)?;

        let part = TempArchive::new(dest.join(artifact.partial_filename()));
        self.download(&artifact, part.path())?;

        let digest = self.verify(&artifact, &part, &expected)?;

        if let Err(e) = extract_tar_gz(part.path(), dest) {
            discard(&part);
            return Err(PgBinError::new(ErrorKind::ExtractionFailed, "could not extract archive")
                .field("archive", part.path().display().to_string())
                .field("destination", dest.display().to_string())
                .output("cause", &format!("{:#}", e)));
        }

        let extracted = dest.join(&artifact.extracted_dir);
        if !extracted.is_dir() {
            return Err(PgBinError::new(
                ErrorKind::UnexpectedArchiveLayout,
                "archive did not contain the expected top-level directory",
            )
            .field("expected", extracted.display().to_string())
            .field("found", list_dir(dest)));
        }

        let relocation = relocate_into(&extracted, dest)?;
        part.remove().map_err(|e| {
            PgBinError::new(ErrorKind::FilesystemError, "could not remove temporary archive")
                .field("archive", part.path().display().to_string())
                .with_source(e)
        })?;

        let bootstrap = bootstrap_data_dir(dest, os, self.initializer)?;

        tracing::info!(%tool, %version, dest = %dest.display(), "install complete");
        Ok(InstallReport {
            tool,
            version,
            target: triple,
            destination: dest.to_path_buf(),
            digest,
            relocation,
            bootstrap,
        })
    }

    fn fetch_expected_digest(&self, artifact: &ReleaseArtifact) -> Result<String> {
        let url = &artifact.checksum_url;
        let request = Request::new(url.as_str()).timeout(self.settings.request_timeout);
        let response = self.transport.get(&request).map_err(|e| {
            PgBinError::new(ErrorKind::ChecksumFetchFailed, "could not download checksum file")
                .field("url", url.clone())
                .with_source(e)
        })?;
        if !is_success(response.status) {
            return Err(PgBinError::new(
                ErrorKind::ChecksumFetchFailed,
                format!("checksum file request returned HTTP {}", response.status),
            )
            .field("url", url.clone())
            .field("status", response.status.to_string())
            .output("body", &response.text()));
        }
        let body = response.text();
        extract_digest(&body).ok_or_else(|| {
            PgBinError::new(
                ErrorKind::ChecksumFormatInvalid,
                "checksum file does not contain a SHA-256 digest",
            )
            .field("url", url.clone())
            .output("body", &body)
        })
    }

    fn download(&self, artifact: &ReleaseArtifact, path: &Path) -> Result<()> {
        let url = &artifact.download_url;
        let bytes = self.transport.download(url, &[], path).map_err(|e| {
            let mut err = PgBinError::new(ErrorKind::DownloadFailed, "could not download archive")
                .field("url", url.clone())
                .field("path", path.display().to_string());
            if let TransportError::Http { status, body, .. } = &e {
                err = err.field("status", status.to_string()).output("body", body);
                if *status == 404 {
                    err = err.hint(format!(
                        "no prebuilt archive named {}; check the version with list-versions",
                        artifact.archive_filename
                    ));
                }
            }
            err.with_source(e)
        })?;
        if !path.is_file() {
            return Err(PgBinError::new(
                ErrorKind::DownloadFailed,
                "download reported success but the archive is missing",
            )
            .field("url", url.clone())
            .field("path", path.display().to_string()));
        }
        tracing::debug!(%url, bytes, "archive downloaded");
        Ok(())
    }

    fn verify(
        &self,
        artifact: &ReleaseArtifact,
        part: &TempArchive,
        expected: &str,
    ) -> Result<Option<String>> {
        let computed = match self.checksum.compute_digest(part.path()) {
            Ok(d) => d,
            Err(e) => {
                discard(part);
                return Err(e);
            }
        };
        match computed {
            Some(actual) if actual != expected => {
                discard(part);
                Err(PgBinError::new(ErrorKind::ChecksumMismatch, "archive checksum mismatch")
                    .field("expected", expected)
                    .field("actual", actual)
                    .field("archive", part.path().display().to_string())
                    .field("url", artifact.download_url.clone())
                    .hint("the download may be corrupt or tampered with; retry the install"))
            }
            Some(actual) => {
                tracing::debug!(digest = %actual, "archive checksum verified");
                Ok(Some(actual))
            }
            None => {
                tracing::warn!(
                    archive = %part.path().display(),
                    "INSECURE: proceeding without checksum verification ({} is set)",
                    ENV_SKIP_CHECKSUM
                );
                Ok(None)
            }
        }
    }
}

/// Create `dir` and confirm it exists afterwards.
fn ensure_dir(dir: &Path) -> Result<()> {
    let fs_err = |msg: &str| {
        PgBinError::new(ErrorKind::FilesystemError, msg).field("path", dir.display().to_string())
    };
    std::fs::create_dir_all(dir).map_err(|e| fs_err("could not create destination directory").with_source(e))?;
    if !dir.is_dir() {
        return Err(fs_err("destination directory does not exist after creation"));
    }
    Ok(())
}

fn relocate_into(extracted: &Path, dest: &Path) -> Result<RelocationMethod> {
    let incomplete = |msg: String, method: &str| {
        PgBinError::new(ErrorKind::RelocationIncomplete, msg)
            .field("method", method)
            .field("source", extracted.display().to_string())
            .field("destination", dest.display().to_string())
    };
    let method = relocate(extracted, dest).map_err(|e| {
        incomplete(format!("could not move extracted files: {}", e), "rename with recursive copy fallback")
    })?;
    if !dest.join("bin").is_dir() {
        return Err(incomplete(
            "bin directory missing after relocation".to_string(),
            &method.to_string(),
        )
        .field("found", list_dir(dest)));
    }
    tracing::debug!(%method, "extracted files relocated");
    Ok(method)
}

/// Delete the archive before a fatal error propagates.
fn discard(part: &TempArchive) {
    if let Err(e) = part.remove() {
        tracing::warn!(path = %part.path().display(), "cannot remove archive: {}", e);
    }
}

fn list_dir(dir: &Path) -> String {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| {
            rd.flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names.join(", ")
}
