//! `pgbin recommend` – newest/oldest of the supported majors.

use anyhow::{Context, Result};
use pgbin_core::cache::VersionCache;
use pgbin_core::catalog::{self, SUPPORTED_MAJOR_COUNT};
use pgbin_core::http::CurlTransport;
use pgbin_core::HostContext;

pub fn run_recommend(ctx: &HostContext) -> Result<()> {
    let cache = VersionCache::new(&ctx.cache_file);
    let versions = catalog::list_versions(&ctx.settings, &cache, &CurlTransport::new())?;
    let rec = catalog::recommend(&versions, SUPPORTED_MAJOR_COUNT)
        .context("no supported major versions in the catalog")?;

    println!("newest: {}", rec.newest);
    println!("oldest: {}", rec.oldest);
    println!("{:<6} {}", "MAJOR", "LATEST");
    for (major, latest) in &rec.majors {
        println!("{:<6} {}", major, latest);
    }
    Ok(())
}
