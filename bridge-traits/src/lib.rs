//! # Host Bridge Traits
//!
//! Capability traits that every host platform must implement for the bridge
//! core, plus the event vocabulary the host uses to report asynchronous
//! results back.
//!
//! ## Overview
//!
//! The host platform offers asynchronous, callback-driven, main-thread-affine
//! services. The core never observes host callbacks directly: it calls a
//! capability with a [`CorrelationToken`] and the host later posts a
//! [`HostEvent`] tagged with the same token.
//!
//! ## Traits
//!
//! ### Documents & Network
//! - [`DocumentPicker`](documents::DocumentPicker) - Launch create/open document pickers
//! - [`DocumentStore`](documents::DocumentStore) - Byte streams on picked locations
//! - [`BlockingHttpClient`](http::BlockingHttpClient) - Synchronous HTTP with fixed timeouts
//!
//! ### Monetization & Privacy
//! - [`RewardedAds`](ads::RewardedAds) - Rewarded advertisement SDK
//! - [`BillingClient`](billing::BillingClient) - In-app purchase SDK
//! - [`ConsentProvider`](consent::ConsentProvider) - Privacy consent SDK
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | HTTP + documents |
//! | Android  | host application    | all capabilities |
//!
//! ## Error Handling
//!
//! All capabilities report immediate failures with
//! [`BridgeError`](error::BridgeError). A returned `Ok(())` only means the host
//! accepted the request; the real outcome always arrives as a `HostEvent`.
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync`. The core only calls capabilities from
//! its control thread, but the blocking HTTP client is also used from native
//! worker threads.

pub mod ads;
pub mod billing;
pub mod consent;
pub mod documents;
pub mod error;
pub mod events;
pub mod http;
pub mod time;
pub mod token;

pub use error::BridgeError;

// Re-export commonly used types
pub use ads::RewardedAds;
pub use billing::{BillingClient, BillingResponseCode, ProductDetails, Purchase, PurchaseState};
pub use consent::{ConsentProvider, ConsentRequest, ConsentStatus};
pub use documents::{DocumentLocation, DocumentPicker, DocumentStore, PickerOutcome, PickerRequest};
pub use events::HostEvent;
pub use http::{BlockingHttpClient, HttpMethod, HttpRequest, HttpResponse, Timeouts};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
pub use token::CorrelationToken;
