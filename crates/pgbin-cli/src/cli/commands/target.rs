//! `pgbin target` – artifact target for this machine.

use anyhow::Result;
use pgbin_core::target::{self, SystemLibcProbe};
use pgbin_core::HostContext;

pub fn run_target(ctx: &HostContext) -> Result<()> {
    let triple = target::resolve(&ctx.os, &ctx.arch, &SystemLibcProbe)?;
    println!(
        "{}/{}/{} -> {}",
        triple.os, triple.arch, triple.libc, triple.target
    );
    Ok(())
}
