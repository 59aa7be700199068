//! Classify HTTP status codes and curl errors.

/// True when the upstream refused the request because of API rate limiting:
/// 403 with a rate-limit marker in the body, or a plain 429.
pub fn is_rate_limited(status: u32, body: &str) -> bool {
    match status {
        429 => true,
        403 => body.to_ascii_lowercase().contains("rate limit"),
        _ => false,
    }
}

pub fn is_not_modified(status: u32) -> bool {
    status == 304
}

pub fn is_success(status: u32) -> bool {
    (200..300).contains(&status)
}

/// True for curl failures caused by the configured timeout.
pub fn is_timeout(e: &curl::Error) -> bool {
    e.is_operation_timedout()
}
