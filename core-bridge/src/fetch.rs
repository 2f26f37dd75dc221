//! Synchronous request/response call for the native core.
//!
//! Runs on the calling thread and touches no bridge state. Every failure
//! (transport, timeout, non-2xx status) collapses to
//! [`CoreBridgeError::Transport`]; causes only reach the log.

use bridge_traits::{BlockingHttpClient, BridgeError, HttpMethod, HttpRequest, Timeouts};
use bytes::Bytes;
use core_runtime::logging::redact_if_sensitive;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{CoreBridgeError, Result};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Clone)]
pub struct BlockingFetch {
    client: Arc<dyn BlockingHttpClient>,
}

impl BlockingFetch {
    pub fn new(client: Arc<dyn BlockingHttpClient>) -> Self {
        Self { client }
    }

    pub fn timeouts() -> Timeouts {
        Timeouts::new(CONNECT_TIMEOUT, READ_TIMEOUT)
    }

    /// Fetch `url`, posting `body` exactly once when present.
    #[instrument(skip_all, fields(has_body = body.is_some()))]
    pub fn fetch(&self, url: &str, body: Option<&[u8]>) -> Result<Bytes> {
        let request = match body {
            Some(body) => HttpRequest::new(HttpMethod::Post, url)
                .header("Content-Type", OCTET_STREAM)
                .body(Bytes::copy_from_slice(body)),
            None => HttpRequest::new(HttpMethod::Get, url),
        }
        .timeouts(Self::timeouts());

        let response = match self.client.execute(request) {
            Ok(response) => response,
            Err(BridgeError::Timeout(message)) => {
                warn!(error = %message, "Fetch timed out");
                return Err(CoreBridgeError::Transport);
            }
            Err(e) => {
                warn!(url = %redact_if_sensitive("url", url), error = %e, "Fetch failed");
                return Err(CoreBridgeError::Transport);
            }
        };

        if !response.is_success() {
            warn!(status = response.status, "Fetch returned error status");
            return Err(CoreBridgeError::Transport);
        }

        debug!(bytes = response.body.len(), "Fetch completed");
        Ok(response.body)
    }
}

impl std::fmt::Debug for BlockingFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingFetch").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::HttpResponse;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        impl BlockingHttpClient for HttpClient {
            fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    fn response(status: u16, body: &'static [u8]) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from_static(body),
        }
    }

    #[test]
    fn test_get_without_body() {
        let mut client = MockHttpClient::new();
        client
            .expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.body.is_none()
                    && req.timeouts == Some(BlockingFetch::timeouts())
            })
            .times(1)
            .returning(|_| Ok(response(200, b"payload")));

        let fetch = BlockingFetch::new(Arc::new(client));
        let bytes = fetch.fetch("https://example.com/level", None).unwrap();

        assert_eq!(bytes, Bytes::from_static(b"payload"));
    }

    #[test]
    fn test_post_sends_body_once_as_octet_stream() {
        let mut client = MockHttpClient::new();
        client
            .expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Post
                    && req.body.as_deref() == Some(b"score=42".as_slice())
                    && req.headers.get("Content-Type").map(String::as_str) == Some(OCTET_STREAM)
            })
            .times(1)
            .returning(|_| Ok(response(201, b"")));

        let fetch = BlockingFetch::new(Arc::new(client));
        assert!(fetch
            .fetch("https://example.com/scores", Some(b"score=42"))
            .is_ok());
    }

    #[test]
    fn test_error_status_is_transport() {
        let mut client = MockHttpClient::new();
        client
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(503, b"maintenance")));

        let fetch = BlockingFetch::new(Arc::new(client));
        assert!(matches!(
            fetch.fetch("https://example.com", None),
            Err(CoreBridgeError::Transport)
        ));
    }

    #[test]
    fn test_timeout_is_transport_without_retry() {
        let mut client = MockHttpClient::new();
        client
            .expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Timeout("read".to_string())));

        let fetch = BlockingFetch::new(Arc::new(client));
        assert!(matches!(
            fetch.fetch("https://example.com", Some(b"once")),
            Err(CoreBridgeError::Transport)
        ));
    }

    #[test]
    fn test_connect_failure_is_transport() {
        let mut client = MockHttpClient::new();
        client
            .expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::OperationFailed("refused".to_string())));

        let fetch = BlockingFetch::new(Arc::new(client));
        assert!(matches!(
            fetch.fetch("https://example.com", None),
            Err(CoreBridgeError::Transport)
        ));
    }
}
