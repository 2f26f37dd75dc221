//! # Core Bridge
//!
//! Correlation and state-machine logic between a native core that issues
//! simple requests and a host whose services answer through asynchronous
//! callbacks.
//!
//! Every host interaction is fire-and-forget and carries a
//! [`CorrelationToken`](bridge_traits::CorrelationToken). Results come back as
//! [`HostEvent`](bridge_traits::HostEvent)s and are matched against the
//! [`CorrelationStore`], which allows at most one pending operation per
//! [`OperationKind`]. Results that do not match are dropped as stale.
//!
//! ## Components
//!
//! - [`CorrelationStore`] - pending operations and token matching
//! - [`BlockingFetch`] - synchronous request/response for the native core
//! - [`FileTransferBridge`] - export/import through the host document picker
//! - [`AdLifecycleManager`] - rewarded ad load/show/reload
//! - [`PurchaseFlowManager`] - catalog sync, purchases, consumption
//! - [`ConsentFlowManager`] - privacy consent form
//! - [`BridgeContext`] - owns all of the above and applies [`ControlMessage`]s

pub mod ads;
pub mod billing;
pub mod consent;
pub mod context;
pub mod correlation;
pub mod error;
pub mod fetch;
pub mod native;
pub mod transfer;

pub use ads::{AdLifecycleManager, AdState};
pub use billing::{ProductCatalog, PurchaseFlowManager, PurchaseRecord};
pub use consent::{ConsentFlowManager, ConsentState};
pub use context::{BridgeContext, BridgeSnapshot, ControlMessage, DeferredAction, Scheduler};
pub use correlation::{CorrelationStore, OperationKind, PendingOperation};
pub use error::{CoreBridgeError, Result};
pub use fetch::{BlockingFetch, CONNECT_TIMEOUT, READ_TIMEOUT};
pub use native::{NativeCore, NativeRequest};
pub use transfer::{FileTransferBridge, TransferPhase, TransferResult};
