//! Per-page release filtering for the catalog fetch.

use serde::Deserialize;

/// Oldest PostgreSQL major offered for install.
pub const MIN_MAJOR_VERSION: u32 = 13;

/// The part of a GitHub release object we read.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
}

/// Leading integer component of a version tag (`"16.4.0"` → 16).
pub fn major_version(tag: &str) -> Option<u32> {
    let first = tag.trim().split('.').next()?;
    let digits: String = first.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Result of filtering one page of releases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    /// Tags with major >= the minimum, in page order.
    pub accepted: Vec<String>,
    /// Smallest major seen on the page (unparseable tags excluded).
    pub oldest_major: Option<u32>,
    pub entries: usize,
}

pub fn filter_page(releases: &[Release], min_major: u32) -> PageSummary {
    let mut summary = PageSummary {
        entries: releases.len(),
        ..Default::default()
    };
    for release in releases {
        let Some(major) = major_version(&release.tag_name) else {
            tracing::debug!(tag = %release.tag_name, "skipping release without numeric major");
            continue;
        };
        summary.oldest_major = Some(summary.oldest_major.map_or(major, |m| m.min(major)));
        if major >= min_major {
            summary.accepted.push(release.tag_name.trim().to_string());
        }
    }
    summary
}
