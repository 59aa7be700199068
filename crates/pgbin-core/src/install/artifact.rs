//! Release artifact naming for the upstream binary distribution.

/// Product prefix used in archive and directory names.
pub const PRODUCT: &str = "postgresql";

/// URLs and names for one version/target, derived and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseArtifact {
    pub download_url: String,
    pub checksum_url: String,
    pub archive_filename: String,
    /// Top-level directory inside the archive.
    pub extracted_dir: String,
}

impl ReleaseArtifact {
    pub fn new(download_base_url: &str, version: &str, target: &str) -> Self {
        let stem = format!("{}-{}-{}", PRODUCT, version, target);
        let archive_filename = format!("{}.tar.gz", stem);
        let download_url = format!(
            "{}/{}/{}",
            download_base_url.trim_end_matches('/'),
            version,
            archive_filename
        );
        Self {
            checksum_url: format!("{}.sha256", download_url),
            download_url,
            archive_filename,
            extracted_dir: stem,
        }
    }

    /// Name of the in-progress download inside the destination.
    pub fn partial_filename(&self) -> String {
        format!("{}.part", self.archive_filename)
    }
}
