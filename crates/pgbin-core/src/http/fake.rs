//! In-memory `Transport` for unit tests.

use super::{Request, Response, ResponseHeaders, Transport, TransportError};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::Path;

#[derive(Default)]
pub struct FakeTransport {
    responses: RefCell<VecDeque<Result<Response, TransportError>>>,
    files: HashMap<String, Vec<u8>>,
    pub requests: RefCell<Vec<Request>>,
    pub downloads: RefCell<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next `get`.
    pub fn respond(self, status: u32, body: &str) -> Self {
        self.respond_with(status, ResponseHeaders::default(), body)
    }

    pub fn respond_with(self, status: u32, headers: ResponseHeaders, body: &str) -> Self {
        self.responses.borrow_mut().push_back(Ok(Response {
            status,
            headers,
            body: body.as_bytes().to_vec(),
        }));
        self
    }

    pub fn fail(self, err: TransportError) -> Self {
        self.responses.borrow_mut().push_back(Err(err));
        self
    }

    /// Serve `bytes` for `download(url, ..)`.
    pub fn file(mut self, url: &str, bytes: &[u8]) -> Self {
        self.files.insert(url.to_string(), bytes.to_vec());
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Transport for FakeTransport {
    fn get(&self, request: &Request) -> Result<Response, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request to {}", request.url))
    }

    fn download(
        &self,
        url: &str,
        _headers: &[(String, String)],
        dest: &Path,
    ) -> Result<u64, TransportError> {
        self.downloads.borrow_mut().push(url.to_string());
        match self.files.get(url) {
            Some(bytes) => {
                std::fs::write(dest, bytes).map_err(|source| TransportError::Io {
                    path: dest.to_path_buf(),
                    source,
                })?;
                Ok(bytes.len() as u64)
            }
            None => Err(TransportError::Http {
                url: url.to_string(),
                status: 404,
                body: "Not Found".to_string(),
            }),
        }
    }
}
