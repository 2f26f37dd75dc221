//! HTTP Transport Abstraction
//!
//! Provides the synchronous request/response contract used by the blocking
//! fetch path. The caller's thread is blocked for the whole exchange, so
//! implementations must honour the timeouts carried by the request.

use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Connect and read timeouts applied to a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Maximum time to establish the connection
    pub connect: Duration,
    /// Maximum gap between pieces of response data once connected
    pub read: Duration,
}

impl Timeouts {
    pub fn new(connect: Duration, read: Duration) -> Self {
        Self { connect, read }
    }

    /// Longest wait for the response head
    pub fn total(&self) -> Duration {
        self.connect + self.read
    }
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    pub timeouts: Option<Timeouts>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeouts: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Blocking HTTP transport
///
/// Implementations block the calling thread. They must give up when no
/// response head arrives within `timeouts.total()`, or when the body stalls
/// for longer than `timeouts.read`. A body that keeps arriving may take longer
/// than either. A non-2xx status is *not* an error at this layer; callers
/// decide what it means.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{BlockingHttpClient, HttpMethod, HttpRequest};
///
/// fn ping(client: &dyn BlockingHttpClient) -> bool {
///     let request = HttpRequest::new(HttpMethod::Get, "https://example.com/ping");
///     client.execute(request).map(|r| r.is_success()).unwrap_or(false)
/// }
/// ```
pub trait BlockingHttpClient: Send + Sync {
    /// Execute an HTTP request
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - TLS validation fails
    /// - Connect or read timeout elapses
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}
