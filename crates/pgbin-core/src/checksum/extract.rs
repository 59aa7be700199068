//! Pull a SHA-256 digest out of arbitrary tool output.

/// Length of a hex-encoded SHA-256 digest.
pub const DIGEST_HEX_LEN: usize = 64;

/// Return the first run of exactly 64 hex characters in `text`, lowercased.
///
/// Runs longer than 64 are skipped, so a 128-char SHA-512 never yields a false
/// match. Wrapper text before or after the digest (certutil's banner, the
/// `  filename` suffix of `sha256sum`) is ignored.
pub fn extract_digest(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_hexdigit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_hexdigit() {
            i += 1;
        }
        if i - start == DIGEST_HEX_LEN {
            return Some(text[start..i].to_ascii_lowercase());
        }
    }
    None
}
