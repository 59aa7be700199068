//! Move the extracted distribution up into the destination root.

use std::fmt;
use std::io;
use std::path::Path;

/// How entries reached the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationMethod {
    /// Every entry moved with a rename.
    Rename,
    /// At least one entry needed copy-then-delete.
    CopyFallback,
}

impl fmt::Display for RelocationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelocationMethod::Rename => f.write_str("rename"),
            RelocationMethod::CopyFallback => f.write_str("rename with recursive copy fallback"),
        }
    }
}

/// Move every entry of `source` into `dest`, then remove `source`.
/// Entries that cannot be renamed (existing non-empty directory, other
/// filesystem) are copied recursively, overwriting files, and then deleted.
pub fn relocate(source: &Path, dest: &Path) -> io::Result<RelocationMethod> {
    let mut method = RelocationMethod::Rename;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if std::fs::rename(&from, &to).is_ok() {
            continue;
        }
        tracing::debug!(from = %from.display(), to = %to.display(), "rename failed; copying");
        method = RelocationMethod::CopyFallback;
        copy_recursive(&from, &to)?;
        remove_any(&from)?;
    }
    std::fs::remove_dir_all(source)?;
    Ok(method)
}

fn copy_recursive(from: &Path, to: &Path) -> io::Result<()> {
    let meta = std::fs::symlink_metadata(from)?;
    if meta.file_type().is_symlink() {
        let target = std::fs::read_link(from)?;
        if std::fs::symlink_metadata(to).is_ok() {
            remove_any(to)?;
        }
        return make_symlink(&target, to);
    }
    if meta.is_dir() {
        std::fs::create_dir_all(to)?;
        for entry in std::fs::read_dir(from)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
        return Ok(());
    }
    std::fs::copy(from, to).map(|_| ())
}

fn remove_any(path: &Path) -> io::Result<()> {
    let meta = std::fs::symlink_metadata(path)?;
    if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
