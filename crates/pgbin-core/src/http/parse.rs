//! Parse HTTP response header lines into ResponseHeaders.

use super::ResponseHeaders;

/// Parse collected header lines. Only the last response block counts, so
/// headers from a redirect hop never leak into the final result.
pub(crate) fn parse_headers(lines: &[String]) -> ResponseHeaders {
    let start = lines
        .iter()
        .rposition(|l| l.trim_start().starts_with("HTTP/"))
        .unwrap_or(0);

    let mut out = ResponseHeaders::default();
    for line in &lines[start..] {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    out.content_length = Some(n);
                }
            }
            // Validators are echoed back verbatim in conditional requests, quotes included.
            if name.eq_ignore_ascii_case("etag") && !value.is_empty() {
                out.etag = Some(value.to_string());
            }
            if name.eq_ignore_ascii_case("last-modified") && !value.is_empty() {
                out.last_modified = Some(value.to_string());
            }
        }
    }
    out
}
