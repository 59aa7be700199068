//! SHA-256 verification of downloaded archives.
//!
//! The engine walks an ordered, per-platform list of digest methods and stops
//! at the first one whose output contains a 64-hex-character digest. Every
//! attempt is recorded as a `ChecksumAttempt`; the trail is only surfaced
//! when all methods fail. With the operator bypass flag set, exhaustion is
//! downgraded to a warning and no digest.

mod extract;
mod method;

pub use extract::{extract_digest, DIGEST_HEX_LEN};
pub use method::{
    CertUtil, DigestMethod, MethodOutcome, NativeSha256, PowerShellGetFileHash, ShellHashTool,
};

use crate::config::ENV_SKIP_CHECKSUM;
use crate::error::{ErrorKind, PgBinError, Result, MAX_OUTPUT_CHARS};
use crate::target::OsFamily;
use anyhow::Context;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BUF_SIZE: usize = 64 * 1024;

/// Compute SHA-256 of a file and return the digest as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for large files.
pub fn sha256_path(path: &Path) -> anyhow::Result<String> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Diagnostic record for one digest method.
#[derive(Debug, Clone)]
pub struct ChecksumAttempt {
    pub method_name: &'static str,
    pub attempted: bool,
    pub command: String,
    pub raw_output: String,
    pub success: bool,
    pub failure_reason: Option<String>,
}

pub struct ChecksumEngine {
    methods: Vec<Box<dyn DigestMethod>>,
    skip_checksum: bool,
    install_hint: String,
}

impl ChecksumEngine {
    /// Method order for `os`: native first, then the platform's external tools.
    pub fn for_os(os: &OsFamily, skip_checksum: bool) -> Self {
        let methods: Vec<Box<dyn DigestMethod>> = if os.is_windows() {
            vec![
                Box::new(NativeSha256),
                Box::new(CertUtil),
                Box::new(PowerShellGetFileHash),
            ]
        } else {
            vec![Box::new(NativeSha256), Box::new(ShellHashTool)]
        };
        Self {
            install_hint: install_hint(os).to_string(),
            ..Self::with_methods(methods, skip_checksum)
        }
    }

    pub fn with_methods(methods: Vec<Box<dyn DigestMethod>>, skip_checksum: bool) -> Self {
        let names: Vec<&str> = methods.iter().map(|m| m.name()).collect();
        let install_hint = format!(
            "make one of these digest methods usable: {}",
            names.join(", ")
        );
        Self {
            methods,
            skip_checksum,
            install_hint,
        }
    }

    pub fn method_names(&self) -> Vec<&'static str> {
        self.methods.iter().map(|m| m.name()).collect()
    }

    /// Digest of `path`, or `None` only when every method failed and the bypass
    /// flag is set.
    pub fn compute_digest(&self, path: &Path) -> Result<Option<String>> {
        let mut attempts: Vec<ChecksumAttempt> = Vec::with_capacity(self.methods.len());

        for method in &self.methods {
            let outcome = method.run(path);
            let digest = extract_digest(&outcome.raw_output);
            let failure_reason = match (&digest, outcome.error) {
                (Some(_), _) => None,
                (None, Some(e)) => Some(e),
                (None, None) => Some(format!(
                    "output did not contain a {}-character hex digest",
                    DIGEST_HEX_LEN
                )),
            };
            attempts.push(ChecksumAttempt {
                method_name: method.name(),
                attempted: outcome.attempted,
                command: outcome.command,
                raw_output: outcome.raw_output,
                success: digest.is_some(),
                failure_reason,
            });
            if let Some(digest) = digest {
                tracing::debug!(method = method.name(), %digest, path = %path.display(), "computed digest");
                return Ok(Some(digest));
            }
            tracing::debug!(method = method.name(), "digest method failed, trying next");
        }

        if self.skip_checksum {
            tracing::warn!(
                path = %path.display(),
                "INSECURE: checksum verification skipped because {} is set; the archive is NOT verified\n{}",
                ENV_SKIP_CHECKSUM,
                render_attempts(&attempts)
            );
            return Ok(None);
        }

        Err(unavailable_error(path, &attempts, &self.install_hint))
    }
}

/// Digest of `path` using the default method list for `os`.
pub fn compute_digest(path: &Path, os: &OsFamily, skip_checksum: bool) -> Result<Option<String>> {
    ChecksumEngine::for_os(os, skip_checksum).compute_digest(path)
}

fn render_attempts(attempts: &[ChecksumAttempt]) -> String {
    attempts
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "  [{}] {} (attempted: {}): {}\n      output: {}\n      reason: {}",
                i + 1,
                a.method_name,
                a.attempted,
                a.command,
                crate::error::truncate_output(&a.raw_output, MAX_OUTPUT_CHARS),
                a.failure_reason.as_deref().unwrap_or("-")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remediation for hosts where every external digest tool failed.
fn install_hint(os: &OsFamily) -> &'static str {
    match os {
        OsFamily::Windows => {
            "make certutil.exe (System32) or PowerShell Get-FileHash available, or make the archive readable"
        }
        OsFamily::Darwin => "install shasum (ships with Perl) or sha256sum, or make the archive readable",
        _ => "install sha256sum (coreutils) or shasum, or make the archive readable",
    }
}

fn unavailable_error(path: &Path, attempts: &[ChecksumAttempt], install_hint: &str) -> PgBinError {
    let mut err = PgBinError::new(
        ErrorKind::ChecksumUnavailable,
        format!(
            "could not compute a SHA-256 digest with any of {} method(s)",
            attempts.len()
        ),
    )
    .field("path", path.display().to_string());
    for a in attempts {
        err = err
            .field("method", a.method_name)
            .field("command", a.command.clone())
            .output("output", &a.raw_output)
            .field("reason", a.failure_reason.clone().unwrap_or_default());
    }
    err.hint(install_hint)
        .hint(format!(
            "to install without verification (INSECURE), set {}=1",
            ENV_SKIP_CHECKSUM
        ))
}
