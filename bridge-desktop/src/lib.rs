//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge capabilities that make sense outside
//! a mobile host (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `BlockingHttpClient` using `reqwest`'s blocking client
//! - `DocumentStore` using `std::fs`, treating picked locations as paths
//!
//! Ads, billing, consent and the document picker only exist on a real mobile
//! host and have no desktop counterpart here.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{LocalDocumentStore, ReqwestBlockingClient};
//! use bridge_traits::{BlockingHttpClient, HttpMethod, HttpRequest};
//!
//! let client = ReqwestBlockingClient::new();
//! let response = client.execute(HttpRequest::new(HttpMethod::Get, "https://example.com"))?;
//! ```

mod documents;
mod http;

pub use documents::LocalDocumentStore;
pub use http::{ReqwestBlockingClient, DEFAULT_CONNECT_TIMEOUT};
