//! tar.gz extraction with path-traversal rejection.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::path::{Component, Path};
use tar::Archive;

/// Extract `archive_path` into `dest_dir`, keeping the archive's own layout.
/// Entries with absolute paths or `..` components abort the extraction, as do
/// symlinks and hard links whose target is absolute or climbs with `..`.
/// Every write is resolved against the canonical `dest_dir`, so an entry
/// routed through a link that leaves the destination is also refused.
/// Returns the number of entries written.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<usize> {
    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("open archive {}", archive_path.display()))?;
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("create directory {}", dest_dir.display()))?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut count = 0usize;

    for entry in archive
        .entries()
        .with_context(|| format!("read tar entries of {}", archive_path.display()))?
    {
        let mut entry =
            entry.with_context(|| format!("read tar entry of {}", archive_path.display()))?;
        let entry_path = entry.path().context("tar entry path")?.into_owned();

        if escapes(&entry_path) {
            anyhow::bail!(
                "refusing to extract entry outside destination: {}",
                entry_path.display()
            );
        }

        let kind = entry.header().entry_type();
        if kind.is_symlink() || kind.is_hard_link() {
            let target = entry
                .link_name()
                .context("tar link target")?
                .map(|t| t.into_owned());
            match target {
                Some(target) if !escapes(&target) => {}
                Some(target) => anyhow::bail!(
                    "refusing to extract link outside destination: {} -> {}",
                    entry_path.display(),
                    target.display()
                ),
                None => anyhow::bail!("link entry without a target: {}", entry_path.display()),
            }
        }

        let written = entry
            .unpack_in(dest_dir)
            .with_context(|| format!("extract {}", entry_path.display()))?;
        if !written {
            anyhow::bail!(
                "refusing to extract entry outside destination: {}",
                entry_path.display()
            );
        }
        count += 1;
    }

    tracing::debug!(archive = %archive_path.display(), entries = count, "archive extracted");
    Ok(count)
}

fn escapes(path: &Path) -> bool {
    path.is_absolute()
        || path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::Prefix(_) | Component::RootDir
            )
        })
}
