//! Entry points invoked by the host runtime.
//!
//! Every hook takes an explicit `HostContext` carrying the platform facts
//! and settings; nothing is read from ambient state here.

use crate::cache::VersionCache;
use crate::catalog;
use crate::checksum::ChecksumEngine;
use crate::config::Settings;
use crate::error::{ErrorKind, PgBinError, Result};
use crate::http::Transport;
use crate::install::{InstallContext, InstallPipeline, InstallReport, ProcessInitializer, Tool, DATA_DIR};
use crate::paths;
use crate::target::{Arch, OsFamily, SystemLibcProbe};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Platform facts and settings supplied to every hook.
#[derive(Debug, Clone)]
pub struct HostContext {
    pub os: OsFamily,
    pub arch: Arch,
    pub settings: Settings,
    pub cache_file: PathBuf,
}

impl HostContext {
    pub fn new(os: OsFamily, arch: Arch, settings: Settings, cache_file: PathBuf) -> Self {
        Self {
            os,
            arch,
            settings,
            cache_file,
        }
    }

    /// Context for the running machine.
    pub fn detect(settings: Settings) -> Result<Self> {
        let cache_file = paths::default_cache_file().ok_or_else(|| {
            PgBinError::new(
                ErrorKind::FilesystemError,
                "cannot determine a per-user cache directory",
            )
            .hint("set XDG_CACHE_HOME to a writable directory")
        })?;
        Ok(Self::new(OsFamily::current(), Arch::current(), settings, cache_file))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListVersionsOutput {
    pub versions: Vec<String>,
}

/// Versions available for `tool`; unknown tools get an empty list without
/// touching the network.
pub fn list_versions(
    ctx: &HostContext,
    tool: &str,
    transport: &dyn Transport,
) -> Result<ListVersionsOutput> {
    if Tool::parse(tool).is_none() {
        tracing::debug!(tool, "unknown tool; no versions");
        return Ok(ListVersionsOutput::default());
    }
    let cache = VersionCache::new(&ctx.cache_file);
    let versions = catalog::list_versions(&ctx.settings, &cache, transport)?;
    Ok(ListVersionsOutput { versions })
}

/// Install `version` of `tool` into `destination` on the host platform.
pub fn install(
    ctx: &HostContext,
    tool: &str,
    version: &str,
    destination: &Path,
    transport: &dyn Transport,
) -> Result<InstallReport> {
    let engine = ChecksumEngine::for_os(&ctx.os, ctx.settings.skip_checksum);
    let pipeline = InstallPipeline::new(
        &ctx.settings,
        transport,
        &SystemLibcProbe,
        &engine,
        &ProcessInitializer,
    );
    pipeline.run(
        &InstallContext::new(tool, version, destination),
        &ctx.os,
        &ctx.arch,
    )
}

/// Environment for running the installed tool, in export order.
/// `current_path` is the caller's PATH; `bin` is prepended to it.
pub fn exec_env(os: &OsFamily, destination: &Path, current_path: Option<&str>) -> Vec<(String, String)> {
    let sep = if os.is_windows() { ';' } else { ':' };
    let bin = destination.join("bin").display().to_string();
    let path = match current_path.filter(|p| !p.is_empty()) {
        Some(p) => format!("{}{}{}", bin, sep, p),
        None => bin,
    };

    let mut env = vec![
        ("PATH".to_string(), path),
        (
            "PGDATA".to_string(),
            destination.join(DATA_DIR).display().to_string(),
        ),
    ];
    if matches!(os, OsFamily::Linux | OsFamily::Darwin) {
        let lib = destination.join("lib").display().to_string();
        env.push(("LD_LIBRARY_PATH".to_string(), lib.clone()));
        env.push(("DYLD_LIBRARY_PATH".to_string(), lib));
    }
    env.push(("PGHOME".to_string(), destination.display().to_string()));
    env
}
