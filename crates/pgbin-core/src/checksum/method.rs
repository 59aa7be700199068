//! Digest methods tried in order by the checksum engine.
//!
//! The native `sha2` hasher comes first on every platform; external tools are
//! kept as fallbacks so a failure still leaves a diagnostic trail.

use super::sha256_path;
use std::path::Path;
use std::process::Command;

/// What one method produced. `raw_output` is scanned for a digest by the engine.
#[derive(Debug, Clone, Default)]
pub struct MethodOutcome {
    /// False when the method could not even start (tool missing).
    pub attempted: bool,
    pub command: String,
    pub raw_output: String,
    /// Why the method failed, if it did.
    pub error: Option<String>,
}

pub trait DigestMethod {
    fn name(&self) -> &'static str;
    fn run(&self, path: &Path) -> MethodOutcome;
}

/// In-process SHA-256 via the `sha2` crate.
pub struct NativeSha256;

impl DigestMethod for NativeSha256 {
    fn name(&self) -> &'static str {
        "native-sha256"
    }

    fn run(&self, path: &Path) -> MethodOutcome {
        let command = format!("sha2::Sha256 {}", path.display());
        match sha256_path(path) {
            Ok(digest) => MethodOutcome {
                attempted: true,
                command,
                raw_output: format!("{}  {}", digest, path.display()),
                error: None,
            },
            Err(e) => MethodOutcome {
                attempted: true,
                command,
                raw_output: String::new(),
                error: Some(format!("{:#}", e)),
            },
        }
    }
}

/// `sha256sum`, falling back to `shasum -a 256` (macOS ships only the latter).
pub struct ShellHashTool;

impl DigestMethod for ShellHashTool {
    fn name(&self) -> &'static str {
        "shell-hash-tool"
    }

    fn run(&self, path: &Path) -> MethodOutcome {
        let p = path.to_string_lossy().into_owned();
        let first = run_command("sha256sum", &[p.as_str()]);
        if first.error.is_none() {
            return first;
        }
        let second = run_command("shasum", &["-a", "256", p.as_str()]);
        MethodOutcome {
            attempted: first.attempted || second.attempted,
            command: format!("{} || {}", first.command, second.command),
            raw_output: join_outputs(&first.raw_output, &second.raw_output),
            error: second
                .error
                .map(|e| format!("{}; {}", first.error.unwrap_or_default(), e)),
        }
    }
}

/// `certutil -hashfile <path> SHA256`; prints a banner line before the digest.
pub struct CertUtil;

impl DigestMethod for CertUtil {
    fn name(&self) -> &'static str {
        "certutil"
    }

    fn run(&self, path: &Path) -> MethodOutcome {
        let p = path.to_string_lossy().into_owned();
        run_command("certutil", &["-hashfile", p.as_str(), "SHA256"])
    }
}

/// PowerShell `Get-FileHash`.
pub struct PowerShellGetFileHash;

impl DigestMethod for PowerShellGetFileHash {
    fn name(&self) -> &'static str {
        "powershell-get-filehash"
    }

    fn run(&self, path: &Path) -> MethodOutcome {
        let script = format!(
            "(Get-FileHash -Algorithm SHA256 -LiteralPath '{}').Hash",
            path.to_string_lossy().replace('\'', "''")
        );
        run_command(
            "powershell",
            &["-NoProfile", "-NonInteractive", "-Command", script.as_str()],
        )
    }
}

/// Run `program args...`, capturing stdout and stderr together.
fn run_command(program: &str, args: &[&str]) -> MethodOutcome {
    let command = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    match Command::new(program).args(args).output() {
        Ok(output) => {
            let raw_output = join_outputs(
                &String::from_utf8_lossy(&output.stdout),
                &String::from_utf8_lossy(&output.stderr),
            );
            let error = if output.status.success() {
                None
            } else {
                Some(format!("{} exited with {}", program, output.status))
            };
            MethodOutcome {
                attempted: true,
                command,
                raw_output,
                error,
            }
        }
        Err(e) => MethodOutcome {
            attempted: e.kind() != std::io::ErrorKind::NotFound,
            command,
            raw_output: String::new(),
            error: Some(format!("could not run {}: {}", program, e)),
        },
    }
}

fn join_outputs(a: &str, b: &str) -> String {
    match (a.trim().is_empty(), b.trim().is_empty()) {
        (true, _) => b.to_string(),
        (false, true) => a.to_string(),
        (false, false) => format!("{}\n{}", a.trim_end(), b),
    }
}
