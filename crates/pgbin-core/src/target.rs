//! Platform → artifact target resolution.
//!
//! Maps an (OS family, CPU architecture, libc flavor) triple to the Rust-style
//! target string used in upstream archive names. Libc flavor is only probed
//! on Linux, through the `LibcProbe` trait so detection can be exercised
//! without touching the real system.

use crate::error::{ErrorKind, PgBinError, Result};
use std::fmt;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Linux,
    Darwin,
    Windows,
    Other(String),
}

impl OsFamily {
    /// Parse a host-supplied OS name (`linux`, `darwin`/`macos`, `windows`).
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "linux" => OsFamily::Linux,
            "darwin" | "macos" => OsFamily::Darwin,
            "windows" => OsFamily::Windows,
            other => OsFamily::Other(other.to_string()),
        }
    }

    pub fn current() -> Self {
        OsFamily::parse(std::env::consts::OS)
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, OsFamily::Windows)
    }

    pub fn executable_extension(&self) -> &'static str {
        if self.is_windows() {
            ".exe"
        } else {
            ""
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsFamily::Linux => f.write_str("linux"),
            OsFamily::Darwin => f.write_str("darwin"),
            OsFamily::Windows => f.write_str("windows"),
            OsFamily::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
    Other(String),
}

impl Arch {
    /// Parse a host-supplied architecture name (`amd64`/`x86_64`, `arm64`/`aarch64`).
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "amd64" | "x86_64" | "x64" => Arch::Amd64,
            "arm64" | "aarch64" => Arch::Arm64,
            other => Arch::Other(other.to_string()),
        }
    }

    pub fn current() -> Self {
        Arch::parse(std::env::consts::ARCH)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::Amd64 => f.write_str("amd64"),
            Arch::Arm64 => f.write_str("arm64"),
            Arch::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibcFlavor {
    Gnu,
    Musl,
    None,
}

impl fmt::Display for LibcFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibcFlavor::Gnu => f.write_str("gnu"),
            LibcFlavor::Musl => f.write_str("musl"),
            LibcFlavor::None => f.write_str("none"),
        }
    }
}

/// Resolved platform plus the upstream artifact target string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTriple {
    pub os: OsFamily,
    pub arch: Arch,
    pub libc: LibcFlavor,
    pub target: &'static str,
}

/// Supported (os, arch, libc) → artifact target matrix.
const MATRIX: &[(&str, &str, LibcFlavor, &str)] = &[
    ("darwin", "arm64", LibcFlavor::None, "aarch64-apple-darwin"),
    ("darwin", "amd64", LibcFlavor::None, "x86_64-apple-darwin"),
    ("linux", "amd64", LibcFlavor::Gnu, "x86_64-unknown-linux-gnu"),
    ("linux", "amd64", LibcFlavor::Musl, "x86_64-unknown-linux-musl"),
    ("linux", "arm64", LibcFlavor::Gnu, "aarch64-unknown-linux-gnu"),
    ("linux", "arm64", LibcFlavor::Musl, "aarch64-unknown-linux-musl"),
    ("windows", "amd64", LibcFlavor::None, "x86_64-pc-windows-msvc"),
];

/// Human-readable list of every supported tuple, for error messages.
pub fn supported_matrix() -> String {
    MATRIX
        .iter()
        .map(|(os, arch, libc, target)| format!("{}/{}/{} -> {}", os, arch, libc, target))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Look up the artifact target for an explicit triple.
pub fn artifact_target(os: &OsFamily, arch: &Arch, libc: LibcFlavor) -> Option<&'static str> {
    let os_name = os.to_string();
    let arch_name = arch.to_string();
    MATRIX
        .iter()
        .find(|(o, a, l, _)| *o == os_name && *a == arch_name && *l == libc)
        .map(|(_, _, _, target)| *target)
}

/// Resolve the artifact target for `os`/`arch`, probing libc only on Linux.
pub fn resolve(os: &OsFamily, arch: &Arch, probe: &dyn LibcProbe) -> Result<TargetTriple> {
    let libc = match os {
        OsFamily::Linux => detect_libc(probe),
        _ => LibcFlavor::None,
    };
    match artifact_target(os, arch, libc) {
        Some(target) => {
            tracing::debug!(%os, %arch, %libc, artifact = target, "resolved artifact target");
            Ok(TargetTriple {
                os: os.clone(),
                arch: arch.clone(),
                libc,
                target,
            })
        }
        None => Err(PgBinError::new(
            ErrorKind::UnsupportedPlatform,
            format!("no prebuilt PostgreSQL binaries for {}/{}/{}", os, arch, libc),
        )
        .field("os", os.to_string())
        .field("arch", arch.to_string())
        .field("libc", libc.to_string())
        .field("supported", supported_matrix())),
    }
}

/// System queries used to tell musl from glibc.
pub trait LibcProbe {
    /// Combined stdout+stderr of `ldd --version`, or None if it could not run.
    fn ldd_version_output(&self) -> Option<String>;
    fn path_exists(&self, path: &Path) -> bool;
    /// File names in `dir`; empty if unreadable.
    fn list_dir(&self, dir: &Path) -> Vec<String>;
}

/// Probe backed by the running system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLibcProbe;

impl LibcProbe for SystemLibcProbe {
    fn ldd_version_output(&self) -> Option<String> {
        // musl's ldd exits non-zero and prints its banner on stderr; keep both streams.
        let output = Command::new("ldd").arg("--version").output().ok()?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Some(text)
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(&self, dir: &Path) -> Vec<String> {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

const ALPINE_MARKER: &str = "/etc/alpine-release";
const LOADER_DIRS: [&str; 2] = ["/lib", "/usr/lib"];

/// Ordered libc detection; first conclusive probe wins, default is glibc.
pub fn detect_libc(probe: &dyn LibcProbe) -> LibcFlavor {
    if let Some(output) = probe.ldd_version_output() {
        let lower = output.to_ascii_lowercase();
        if lower.contains("musl") {
            tracing::debug!("ldd reports musl");
            return LibcFlavor::Musl;
        }
        if lower.contains("glibc") || lower.contains("gnu libc") {
            tracing::debug!("ldd reports glibc");
            return LibcFlavor::Gnu;
        }
    }

    if probe.path_exists(Path::new(ALPINE_MARKER)) {
        tracing::debug!("found {}", ALPINE_MARKER);
        return LibcFlavor::Musl;
    }

    for dir in LOADER_DIRS {
        if probe
            .list_dir(Path::new(dir))
            .iter()
            .any(|name| name.starts_with("ld-musl-"))
        {
            tracing::debug!("found musl dynamic loader in {}", dir);
            return LibcFlavor::Musl;
        }
    }

    LibcFlavor::Gnu
}
