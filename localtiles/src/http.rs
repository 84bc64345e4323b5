//! Request and response values exchanged with the HTTP transport.
//!
//! The transport owns the actual networking. These types only carry what the
//! interceptor needs to inspect a request and to substitute a response.

use std::collections::HashMap;
use std::path::PathBuf;

/// Header name of the user agent, matched case-insensitively.
pub const USER_AGENT: &str = "User-Agent";

/// Header map as handed over by the transport.
pub type Headers = HashMap<String, String>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Headers,
}

impl HttpRequest {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Headers::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Find a header value, ignoring the case of its name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_entry(name).map(|(_, v)| v.as_str())
    }

    fn header_entry(&self, name: &str) -> Option<(&String, &String)> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Set a header, replacing an existing one even if its name uses a different case.
    pub fn set_header(&mut self, name: &str, value: String) {
        let key = self
            .header_entry(name)
            .map_or_else(|| name.to_string(), |(k, _)| k.clone());
        self.headers.insert(key, value);
    }
}

/// A response body produced by the transport or substituted by the interceptor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseData {
    pub headers: Headers,
    pub code: u16,
    pub data: Vec<u8>,
}

/// Transport-level failure, e.g. the host `local` could not be resolved.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("{message}")]
pub struct HttpRequestError {
    pub message: String,
}

impl HttpRequestError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type ResponseOutcome = Result<ResponseData, HttpRequestError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    pub request: HttpRequest,
    pub outcome: ResponseOutcome,
}

impl HttpResponse {
    #[must_use]
    pub fn new(request: HttpRequest, outcome: ResponseOutcome) -> Self {
        Self { request, outcome }
    }

    /// Replace the outcome with a `200` carrying `data` and the request's own headers.
    /// The request itself is left untouched.
    #[must_use]
    pub fn substitute(self, data: Vec<u8>) -> Self {
        let headers = self.request.headers.clone();
        Self {
            request: self.request,
            outcome: Ok(ResponseData {
                headers,
                code: 200,
                data,
            }),
        }
    }
}

/// Options of a resource download, passed through unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadOptions {
    pub request: HttpRequest,
    pub local_path: PathBuf,
}
