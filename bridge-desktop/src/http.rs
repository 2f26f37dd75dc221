//! Blocking HTTP Client Implementation using Reqwest

use bridge_traits::{
    error::{BridgeError, Result},
    http::{BlockingHttpClient, HttpMethod, HttpRequest, HttpResponse, Timeouts},
};
use bytes::{Bytes, BytesMut};
use reqwest::blocking::{Client, RequestBuilder};
use std::collections::HashMap;
use std::io::{ErrorKind, Read};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Connect timeout used when none is configured explicitly
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Read timeout for requests that carry no [`Timeouts`]
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

const READ_CHUNK: usize = 8 * 1024;

/// What the exchange worker has seen so far
enum Progress {
    Head {
        status: u16,
        headers: HashMap<String, String>,
    },
    Chunk(Bytes),
    Done,
    Failed(BridgeError),
}

/// Reqwest-based blocking HTTP client
///
/// The connect timeout is a client-level setting in reqwest, so it is fixed
/// when the client is built. Reqwest's blocking client only knows a deadline
/// for the whole exchange, which would cut off a slow but steady body. The
/// exchange therefore runs on a worker thread and the caller waits for each
/// piece of it separately: the response head within `connect + read`, then
/// every body chunk within `read` of the previous one.
///
/// The underlying reqwest client is created on first use. Reqwest's blocking
/// client owns a private runtime and must not be created from inside an async
/// context, which is exactly where configuration code tends to run.
pub struct ReqwestBlockingClient {
    connect_timeout: Duration,
    client: Mutex<Option<Client>>,
}

impl ReqwestBlockingClient {
    /// Create a new HTTP client with the default connect timeout
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new HTTP client with a custom connect timeout
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            client: Mutex::new(None),
        }
    }

    /// Wrap an already configured reqwest client
    pub fn with_client(client: Client) -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            client: Mutex::new(Some(client)),
        }
    }

    fn client(&self) -> Result<Client> {
        let mut slot = self
            .client
            .lock()
            .map_err(|_| BridgeError::OperationFailed("HTTP client lock poisoned".to_string()))?;

        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        // Deadlines are enforced per read in `execute`
        let client = Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(None::<Duration>)
            .user_agent(concat!("host-bridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        *slot = Some(client.clone());
        Ok(client)
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }

    /// Build reqwest request from bridge request
    fn build_request(client: &Client, request: HttpRequest) -> RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        req
    }

    fn map_error(e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::Timeout(e.to_string())
        } else if e.is_connect() {
            BridgeError::OperationFailed(format!("Connection failed: {}", e))
        } else {
            BridgeError::OperationFailed(e.to_string())
        }
    }

    /// Worker side of an exchange. Stops as soon as the caller hangs up.
    fn exchange(req: RequestBuilder, url: String, progress: Sender<Progress>) {
        let mut response = match req.send() {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "HTTP request failed");
                let _ = progress.send(Progress::Failed(Self::map_error(e)));
                return;
            }
        };

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();
        if progress.send(Progress::Head { status, headers }).is_err() {
            return;
        }

        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let next = match response.read(&mut buf) {
                Ok(0) => Progress::Done,
                Ok(n) => Progress::Chunk(Bytes::copy_from_slice(&buf[..n])),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(url = %url, error = %e, "Reading HTTP response body failed");
                    Progress::Failed(BridgeError::OperationFailed(format!(
                        "Reading response body failed: {}",
                        e
                    )))
                }
            };
            let finished = !matches!(next, Progress::Chunk(_));
            if progress.send(next).is_err() || finished {
                return;
            }
        }
    }

    fn wait(progress: &Receiver<Progress>, limit: Duration, url: &str) -> Result<Progress> {
        progress.recv_timeout(limit).map_err(|e| match e {
            RecvTimeoutError::Timeout => {
                warn!(url = %url, limit_ms = limit.as_millis() as u64, "HTTP exchange stalled");
                BridgeError::Timeout(format!("No response data within {:?}", limit))
            }
            RecvTimeoutError::Disconnected => {
                BridgeError::OperationFailed("HTTP exchange ended without a result".to_string())
            }
        })
    }
}

impl Default for ReqwestBlockingClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockingHttpClient for ReqwestBlockingClient {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let client = self.client()?;
        let url = request.url.clone();
        let timeouts = request
            .timeouts
            .unwrap_or_else(|| Timeouts::new(self.connect_timeout, DEFAULT_READ_TIMEOUT));

        debug!(url = %url, method = ?request.method, "Executing HTTP request");

        let req = Self::build_request(&client, request);
        let (sender, progress) = mpsc::channel();
        let worker_url = url.clone();
        // A timed-out worker is left to finish on its own; its sends fail once
        // `progress` is dropped.
        thread::Builder::new()
            .name("http-exchange".to_string())
            .spawn(move || Self::exchange(req, worker_url, sender))
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to start HTTP exchange: {}", e))
            })?;

        let (status, headers) = match Self::wait(&progress, timeouts.total(), &url)? {
            Progress::Head { status, headers } => (status, headers),
            Progress::Failed(e) => return Err(e),
            Progress::Chunk(_) | Progress::Done => {
                return Err(BridgeError::OperationFailed(
                    "HTTP body arrived before its head".to_string(),
                ))
            }
        };

        let mut body = BytesMut::new();
        loop {
            match Self::wait(&progress, timeouts.read, &url)? {
                Progress::Chunk(chunk) => body.extend_from_slice(&chunk),
                Progress::Done => break,
                Progress::Failed(e) => return Err(e),
                Progress::Head { .. } => {
                    return Err(BridgeError::OperationFailed(
                        "HTTP response head repeated".to_string(),
                    ))
                }
            }
        }
        let body = body.freeze();

        debug!(url = %url, status, size = body.len(), "HTTP request finished");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
