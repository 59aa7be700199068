//! Newest/oldest picks across the actively supported majors.

use super::filter::{major_version, MIN_MAJOR_VERSION};
use std::collections::BTreeMap;

/// PostgreSQL supports five major versions at a time.
pub const SUPPORTED_MAJOR_COUNT: usize = 5;

/// Numeric components of a version, ignoring non-numeric parts.
pub fn version_tuple(version: &str) -> Vec<u64> {
    version
        .split('.')
        .filter_map(|p| p.parse::<u64>().ok())
        .collect()
}

/// Highest patch release per major (majors below the minimum are dropped).
pub fn latest_by_major(versions: &[String]) -> BTreeMap<u32, String> {
    let mut latest: BTreeMap<u32, String> = BTreeMap::new();
    for v in versions {
        let Some(major) = major_version(v) else {
            continue;
        };
        if major < MIN_MAJOR_VERSION {
            continue;
        }
        let newer = latest
            .get(&major)
            .map_or(true, |cur| version_tuple(v) > version_tuple(cur));
        if newer {
            latest.insert(major, v.clone());
        }
    }
    latest
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub newest: String,
    pub oldest: String,
    /// (major, latest patch) for each supported major, newest first.
    pub majors: Vec<(u32, String)>,
}

/// Newest and oldest latest-patch versions among the `count` most recent majors.
pub fn recommend(versions: &[String], count: usize) -> Option<Recommendation> {
    let majors: Vec<(u32, String)> = latest_by_major(versions)
        .into_iter()
        .rev()
        .take(count)
        .collect();
    let newest = majors.first()?.1.clone();
    let oldest = majors.last()?.1.clone();
    Some(Recommendation {
        newest,
        oldest,
        majors,
    })
}
