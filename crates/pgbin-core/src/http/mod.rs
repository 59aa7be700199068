//! Blocking HTTP transport.
//!
//! Uses the curl crate (libcurl) Easy interface. `Transport` is the seam the
//! catalog fetcher and install pipeline depend on, so tests can substitute a
//! canned implementation.

mod classify;
mod parse;

#[cfg(test)]
pub(crate) mod fake;

pub use classify::{is_not_modified, is_rate_limited, is_success, is_timeout};

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str;
use std::time::Duration;
use thiserror::Error;

/// Timeout used by `download` for establishing a connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

pub const USER_AGENT: &str = concat!("pgbin/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default)]
pub struct Request {
    pub url: String,
    /// Extra request headers as (name, value).
    pub headers: Vec<(String, String)>,
    /// Whole-request timeout; None means no limit beyond the connect timeout.
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Cache validators and size from the final response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub content_length: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u32,
    pub headers: ResponseHeaders,
    pub body: Vec<u8>,
}

impl Response {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} timed out after {timeout_ms} ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("request to {url} failed: {source}")]
    Curl {
        url: String,
        #[source]
        source: curl::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Http {
        url: String,
        status: u32,
        body: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait Transport {
    /// Perform a GET and return the response whatever its status.
    fn get(&self, request: &Request) -> Result<Response, TransportError>;

    /// Stream `url` into `dest` (created or truncated). Non-2xx is an error.
    /// Returns the number of bytes written.
    fn download(
        &self,
        url: &str,
        headers: &[(String, String)],
        dest: &Path,
    ) -> Result<u64, TransportError>;
}

/// libcurl-backed transport. Runs in the current thread.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    user_agent: String,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self {
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl CurlTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn easy(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<curl::easy::Easy, TransportError> {
        let curl_err = |source: curl::Error| TransportError::Curl {
            url: url.to_string(),
            source,
        };
        let mut easy = curl::easy::Easy::new();
        easy.url(url).map_err(curl_err)?;
        easy.follow_location(true).map_err(curl_err)?;
        easy.max_redirections(10).map_err(curl_err)?;
        easy.useragent(&self.user_agent).map_err(curl_err)?;
        easy.connect_timeout(CONNECT_TIMEOUT).map_err(curl_err)?;
        match timeout {
            Some(t) => easy.timeout(t).map_err(curl_err)?,
            None => {
                // Abort stalled transfers instead of hanging forever.
                easy.low_speed_limit(1024).map_err(curl_err)?;
                easy.low_speed_time(Duration::from_secs(60)).map_err(curl_err)?;
            }
        }

        let mut list = curl::easy::List::new();
        for (k, v) in headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))
                .map_err(curl_err)?;
        }
        if !headers.is_empty() {
            easy.http_headers(list).map_err(curl_err)?;
        }
        Ok(easy)
    }
}

fn map_perform_error(url: &str, timeout: Option<Duration>, e: curl::Error) -> TransportError {
    if is_timeout(&e) {
        TransportError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout
                .map(|t| t.as_millis() as u64)
                .unwrap_or(CONNECT_TIMEOUT.as_millis() as u64),
        }
    } else {
        TransportError::Curl {
            url: url.to_string(),
            source: e,
        }
    }
}

impl Transport for CurlTransport {
    fn get(&self, request: &Request) -> Result<Response, TransportError> {
        let url = request.url.as_str();
        let mut easy = self.easy(url, &request.headers, request.timeout)?;
        let mut header_lines: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();

        {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Ok(s) = str::from_utf8(data) {
                        header_lines.push(s.trim_end().to_string());
                    }
                    true
                })
                .map_err(|source| TransportError::Curl {
                    url: url.to_string(),
                    source,
                })?;
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(|source| TransportError::Curl {
                    url: url.to_string(),
                    source,
                })?;
            transfer
                .perform()
                .map_err(|e| map_perform_error(url, request.timeout, e))?;
        }

        let status = easy.response_code().map_err(|source| TransportError::Curl {
            url: url.to_string(),
            source,
        })?;
        tracing::debug!(url, status, bytes = body.len(), "GET completed");

        Ok(Response {
            status,
            headers: parse::parse_headers(&header_lines),
            body,
        })
    }

    fn download(
        &self,
        url: &str,
        headers: &[(String, String)],
        dest: &Path,
    ) -> Result<u64, TransportError> {
        let io_err = |source: std::io::Error| TransportError::Io {
            path: dest.to_path_buf(),
            source,
        };
        let mut file = File::create(dest).map_err(io_err)?;
        let mut easy = self.easy(url, headers, None)?;
        let mut written: u64 = 0;
        let mut write_error: Option<std::io::Error> = None;
        let mut header_lines: Vec<String> = Vec::new();

        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| {
                    if let Ok(s) = str::from_utf8(data) {
                        header_lines.push(s.trim_end().to_string());
                    }
                    true
                })
                .map_err(|source| TransportError::Curl {
                    url: url.to_string(),
                    source,
                })?;
            transfer
                .write_function(|data| match file.write_all(data) {
                    Ok(()) => {
                        written += data.len() as u64;
                        Ok(data.len())
                    }
                    Err(e) => {
                        tracing::warn!("download write failed: {}", e);
                        write_error = Some(e);
                        Ok(0) // abort transfer
                    }
                })
                .map_err(|source| TransportError::Curl {
                    url: url.to_string(),
                    source,
                })?;
            transfer.perform()
        };

        if let Some(e) = write_error {
            return Err(io_err(e));
        }
        performed.map_err(|e| map_perform_error(url, None, e))?;
        file.flush().map_err(io_err)?;
        drop(file);

        let status = easy.response_code().map_err(|source| TransportError::Curl {
            url: url.to_string(),
            source,
        })?;
        if !is_success(status) {
            let body = std::fs::read(dest)
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .unwrap_or_default();
            let _ = std::fs::remove_file(dest);
            return Err(TransportError::Http {
                url: url.to_string(),
                status,
                body,
            });
        }

        let expected = parse::parse_headers(&header_lines).content_length;
        if size_mismatch(expected, written) {
            tracing::warn!(url, expected, bytes = written, "download size differs from Content-Length");
        }
        tracing::debug!(url, expected, bytes = written, dest = %dest.display(), "download completed");
        Ok(written)
    }
}

/// True when the server announced a length and a different number of bytes arrived.
fn size_mismatch(expected: Option<u64>, written: u64) -> bool {
    expected.is_some_and(|n| n != written)
}
