//! `pgbin checksum` – SHA-256 of a local file.

use anyhow::Result;
use pgbin_core::checksum::ChecksumEngine;
use pgbin_core::HostContext;
use std::path::Path;

/// Compute and print the digest using the same method chain as install.
pub fn run_checksum(ctx: &HostContext, path: &Path) -> Result<()> {
    let engine = ChecksumEngine::for_os(&ctx.os, ctx.settings.skip_checksum);
    match engine.compute_digest(path)? {
        Some(digest) => println!("{}  {}", digest, path.display()),
        None => println!("-  {} (verification skipped)", path.display()),
    }
    Ok(())
}
