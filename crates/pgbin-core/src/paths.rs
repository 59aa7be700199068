//! On-disk locations owned by pgbin.

use std::path::PathBuf;

/// Subpath under the cache root holding the version catalog record.
pub const CACHE_SUBPATH: [&str; 2] = ["pgbin", "versions.json"];

/// Cache file location: `$XDG_CACHE_HOME/pgbin/versions.json` when the variable
/// is set (on every OS), otherwise the OS per-user cache directory
/// (`%LOCALAPPDATA%`, `~/Library/Caches`, `~/.cache`).
pub fn cache_file<F>(lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let root = lookup("XDG_CACHE_HOME")
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .or_else(dirs::cache_dir)?;
    Some(CACHE_SUBPATH.iter().fold(root, |p, part| p.join(part)))
}

/// `cache_file` using the process environment.
pub fn default_cache_file() -> Option<PathBuf> {
    cache_file(|name| std::env::var(name).ok())
}
