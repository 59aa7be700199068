//! Upstream release catalog: cached, conditionally revalidated, paginated.
//!
//! The fetch walks GitHub release pages newest-first and stops as soon as a
//! page reaches below the minimum supported major, so a normal refresh costs
//! one request and never more than `MAX_PAGES`.

mod filter;
mod recommend;

pub use filter::{filter_page, major_version, PageSummary, Release, MIN_MAJOR_VERSION};
pub use recommend::{
    latest_by_major, recommend, version_tuple, Recommendation, SUPPORTED_MAJOR_COUNT,
};

use crate::cache::{is_valid, now_secs, CacheRecord, VersionCache};
use crate::config::Settings;
use crate::error::{ErrorKind, PgBinError, Result};
use crate::http::{is_not_modified, is_rate_limited, is_success, Request, Response, Transport, TransportError};

pub const PAGE_SIZE: u32 = 100;
pub const MAX_PAGES: u32 = 2;

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Build the URL for one releases page.
pub fn page_url(api_base_url: &str, page: u32) -> Result<String> {
    let base = format!("{}/releases", api_base_url.trim_end_matches('/'));
    let mut url = url::Url::parse(&base).map_err(|e| {
        PgBinError::new(ErrorKind::InvalidInput, "invalid release API base URL")
            .field("api_base_url", api_base_url)
            .with_source(e)
    })?;
    url.query_pairs_mut()
        .append_pair("per_page", &PAGE_SIZE.to_string())
        .append_pair("page", &page.to_string());
    Ok(url.into())
}

fn base_request(settings: &Settings, url: String) -> Request {
    let mut request = Request::new(url)
        .header("Accept", ACCEPT)
        .header("X-GitHub-Api-Version", API_VERSION)
        .timeout(settings.request_timeout);
    if let Some(token) = &settings.access_token {
        request = request.header("Authorization", format!("Bearer {}", token));
    }
    request
}

fn transport_failure(settings: &Settings, err: TransportError) -> PgBinError {
    match err {
        TransportError::Timeout { url, timeout_ms } => {
            PgBinError::new(ErrorKind::RequestTimeout, "release catalog request timed out")
                .field("url", url)
                .field("timeout_ms", timeout_ms.to_string())
        }
        other => {
            let url = match &other {
                TransportError::Curl { url, .. } | TransportError::Http { url, .. } => url.clone(),
                _ => String::new(),
            };
            let mut e = PgBinError::new(
                ErrorKind::UpstreamRequestFailed,
                "release catalog request failed",
            );
            if !url.is_empty() {
                e = e.field("url", url);
            }
            e.field("timeout_ms", settings.request_timeout.as_millis().to_string())
                .with_source(other)
        }
    }
}

/// Turn a non-success, non-304 response into the matching error.
fn status_failure(settings: &Settings, url: &str, response: &Response) -> PgBinError {
    let body = response.text();
    if is_rate_limited(response.status, &body) {
        let mut e = PgBinError::new(
            ErrorKind::UpstreamRateLimited,
            "GitHub API rate limit exceeded",
        )
        .field("url", url)
        .field("status", response.status.to_string())
        .output("body", &body);
        e = if settings.access_token.is_some() {
            e.hint("the configured access token is also rate limited; wait and retry")
        } else {
            e.hint("set GITHUB_TOKEN or GH_TOKEN to raise the GitHub API rate limit")
        };
        return e;
    }
    PgBinError::new(
        ErrorKind::UpstreamRequestFailed,
        format!("release catalog returned HTTP {}", response.status),
    )
    .field("url", url)
    .field("status", response.status.to_string())
    .output("body", &body)
}

fn parse_page(url: &str, response: &Response) -> Result<Vec<Release>> {
    serde_json::from_slice(&response.body).map_err(|e| {
        PgBinError::new(
            ErrorKind::UpstreamRequestFailed,
            "release catalog returned malformed JSON",
        )
        .field("url", url)
        .output("body", &response.text())
        .with_source(e)
    })
}

/// Return supported versions, newest first, from cache or upstream.
pub fn list_versions(
    settings: &Settings,
    cache: &VersionCache,
    transport: &dyn Transport,
) -> Result<Vec<String>> {
    list_versions_at(settings, cache, transport, now_secs())
}

/// `list_versions` with an explicit clock.
pub fn list_versions_at(
    settings: &Settings,
    cache: &VersionCache,
    transport: &dyn Transport,
    now: u64,
) -> Result<Vec<String>> {
    let prior = cache.load();
    if let Some(record) = &prior {
        if is_valid(record, settings.cache_ttl_secs, now) {
            tracing::debug!(
                path = %cache.path().display(),
                versions = record.versions.len(),
                "version cache hit"
            );
            return Ok(record.versions.clone());
        }
    }

    // With caching disabled there is nothing worth revalidating.
    let revalidate = prior
        .as_ref()
        .filter(|r| settings.cache_ttl_secs > 0 && r.has_validators());

    let first_url = page_url(&settings.api_base_url, 1)?;
    let mut request = base_request(settings, first_url.clone());
    if let Some(record) = revalidate {
        if let Some(etag) = &record.etag {
            request = request.header("If-None-Match", etag.clone());
        }
        if let Some(lm) = &record.last_modified {
            request = request.header("If-Modified-Since", lm.clone());
        }
    }

    let first = transport
        .get(&request)
        .map_err(|e| transport_failure(settings, e))?;

    if is_not_modified(first.status) {
        if let Some(record) = revalidate {
            tracing::debug!(url = %first_url, "release catalog not modified; touching cache");
            return match cache.touch(now) {
                Ok(Some(touched)) => Ok(touched.versions),
                Ok(None) => Ok(record.versions.clone()),
                Err(e) => {
                    tracing::warn!(path = %cache.path().display(), "cannot refresh version cache: {}", e);
                    Ok(record.versions.clone())
                }
            };
        }
    }
    if !is_success(first.status) {
        return Err(status_failure(settings, &first_url, &first));
    }

    let validators = first.headers.clone();
    let mut versions: Vec<String> = Vec::new();
    let mut oldest: Option<u32> = None;
    let mut page_no = 1;
    let mut response = first;
    let mut url = first_url;

    loop {
        let releases = parse_page(&url, &response)?;
        let summary = filter_page(&releases, MIN_MAJOR_VERSION);
        tracing::debug!(
            page = page_no,
            entries = summary.entries,
            accepted = summary.accepted.len(),
            "release page fetched"
        );
        if summary.entries == 0 {
            break;
        }
        versions.extend(summary.accepted);
        if let Some(m) = summary.oldest_major {
            oldest = Some(oldest.map_or(m, |o| o.min(m)));
        }
        if oldest.is_some_and(|o| o < MIN_MAJOR_VERSION) || page_no >= MAX_PAGES {
            break;
        }

        page_no += 1;
        url = page_url(&settings.api_base_url, page_no)?;
        response = transport
            .get(&base_request(settings, url.clone()))
            .map_err(|e| transport_failure(settings, e))?;
        if !is_success(response.status) {
            return Err(status_failure(settings, &url, &response));
        }
    }

    if versions.is_empty() {
        return Err(PgBinError::new(
            ErrorKind::NoSupportedVersions,
            format!("no releases with major version >= {} found upstream", MIN_MAJOR_VERSION),
        )
        .field("url", page_url(&settings.api_base_url, 1)?)
        .field("pages_fetched", page_no.to_string()));
    }

    let record = CacheRecord {
        timestamp: now,
        etag: validators.etag,
        last_modified: validators.last_modified,
        versions: versions.clone(),
    };
    if let Err(e) = cache.store(&record) {
        tracing::warn!(path = %cache.path().display(), "cannot write version cache: {}", e);
    }
    tracing::info!(versions = versions.len(), pages = page_no, "release catalog refreshed");
    Ok(versions)
}
