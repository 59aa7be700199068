//! `pgbin env` – shell exports for an installation.

use anyhow::Result;
use pgbin_core::target::OsFamily;
use pgbin_core::{exec_env, HostContext};
use std::path::Path;

pub fn run_env(ctx: &HostContext, dest: &Path) -> Result<()> {
    let current_path = std::env::var("PATH").ok();
    for (name, value) in exec_env(&ctx.os, dest, current_path.as_deref()) {
        println!("{}", export_line(&ctx.os, &name, &value));
    }
    Ok(())
}

fn export_line(os: &OsFamily, name: &str, value: &str) -> String {
    if os.is_windows() {
        format!("$env:{} = \"{}\"", name, value.replace('"', "`\""))
    } else {
        format!("export {}='{}'", name, value.replace('\'', r"'\''"))
    }
}
