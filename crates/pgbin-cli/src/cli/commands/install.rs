//! `pgbin install` – run the install pipeline.

use anyhow::Result;
use pgbin_core::http::CurlTransport;
use pgbin_core::install::BootstrapOutcome;
use pgbin_core::{install, HostContext};
use std::path::Path;

pub fn run_install(ctx: &HostContext, tool: &str, version: &str, dest: &Path) -> Result<()> {
    let report = install(ctx, tool, version, dest, &CurlTransport::new())?;
    println!(
        "installed {} {} ({}) into {}",
        report.tool,
        report.version,
        report.target.target,
        report.destination.display()
    );
    match &report.digest {
        Some(d) => println!("sha256: {}", d),
        None => println!("sha256: not verified"),
    }
    match &report.bootstrap {
        BootstrapOutcome::Initialized(p) => println!("data directory initialized: {}", p.display()),
        BootstrapOutcome::AlreadyInitialized(p) => {
            println!("data directory kept: {}", p.display())
        }
    }
    Ok(())
}
