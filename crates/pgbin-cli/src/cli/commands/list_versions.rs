//! `pgbin list-versions` – installable versions from the release catalog.

use anyhow::Result;
use pgbin_core::http::CurlTransport;
use pgbin_core::{list_versions, HostContext};

pub fn run_list_versions(ctx: &HostContext, tool: &str, json: bool) -> Result<()> {
    let out = list_versions(ctx, tool, &CurlTransport::new())?;
    if json {
        println!("{}", serde_json::to_string(&out)?);
    } else {
        for v in &out.versions {
            println!("{}", v);
        }
    }
    Ok(())
}
