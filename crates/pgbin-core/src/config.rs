use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Default catalog cache lifetime: 12 hours.
pub const DEFAULT_CACHE_TTL_SECS: i64 = 43_200;
/// Timeout applied to catalog requests.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_API_BASE_URL: &str =
    "https://api.github.com/repos/theseus-rs/postgresql-binaries";
pub const DEFAULT_DOWNLOAD_BASE_URL: &str =
    "https://github.com/theseus-rs/postgresql-binaries/releases/download";

pub const ENV_CACHE_TTL: &str = "PGBIN_CACHE_TTL";
pub const ENV_SKIP_CHECKSUM: &str = "PGBIN_SKIP_CHECKSUM";
/// Access-token variables, first non-empty wins.
pub const ENV_TOKENS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Configuration loaded from `~/.config/pgbin/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PgBinConfig {
    /// Catalog cache lifetime in seconds; `<= 0` disables the cache.
    pub cache_ttl_secs: i64,
    /// Timeout for catalog requests in milliseconds.
    pub request_timeout_ms: u64,
    /// GitHub API base for the release catalog.
    pub api_base_url: String,
    /// Base URL under which `{version}/{archive}` is downloadable.
    pub download_base_url: String,
    /// Skip archive verification when no digest can be computed.
    #[serde(default)]
    pub skip_checksum: bool,
}

impl Default for PgBinConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
            skip_checksum: false,
        }
    }
}

/// Effective settings: config file values with environment overrides applied.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cache_ttl_secs: i64,
    pub request_timeout: Duration,
    pub api_base_url: String,
    pub download_base_url: String,
    pub skip_checksum: bool,
    pub access_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from_config(&PgBinConfig::default(), |_| None)
    }
}

impl Settings {
    /// Layer environment overrides on top of `cfg`. `lookup` returns the value of
    /// an environment variable, so callers (and tests) control the source.
    pub fn from_config<F>(cfg: &PgBinConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_ttl_secs = match lookup(ENV_CACHE_TTL) {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(ttl) => ttl,
                Err(_) => {
                    tracing::warn!(
                        value = %raw,
                        "{} is not an integer; using {}s",
                        ENV_CACHE_TTL,
                        cfg.cache_ttl_secs
                    );
                    cfg.cache_ttl_secs
                }
            },
            None => cfg.cache_ttl_secs,
        };

        let skip_checksum = cfg.skip_checksum
            || lookup(ENV_SKIP_CHECKSUM)
                .map(|v| is_truthy(&v))
                .unwrap_or(false);

        let access_token = ENV_TOKENS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty());

        Self {
            cache_ttl_secs,
            request_timeout: Duration::from_millis(cfg.request_timeout_ms),
            api_base_url: cfg.api_base_url.trim_end_matches('/').to_string(),
            download_base_url: cfg.download_base_url.trim_end_matches('/').to_string(),
            skip_checksum,
            access_token,
        }
    }

    /// Settings from `cfg` and the process environment.
    pub fn from_env(cfg: &PgBinConfig) -> Self {
        Settings::from_config(cfg, |name| std::env::var(name).ok())
    }
}

/// Bypass flag values: `1` or `true` (any case).
pub fn is_truthy(value: &str) -> bool {
    let v = value.trim();
    v == "1" || v.eq_ignore_ascii_case("true")
}

#[cfg(unix)]
pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("pgbin")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

#[cfg(not(unix))]
pub fn config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir().context("cannot determine config directory")?;
    Ok(dir.join("pgbin").join("config.toml"))
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<PgBinConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = PgBinConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        fs::write(&path, toml).with_context(|| format!("write config: {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data =
        fs::read_to_string(&path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: PgBinConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
