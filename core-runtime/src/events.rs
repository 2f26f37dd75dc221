//! # Event Bus System
//!
//! Provides an event-driven side channel for the bridge using `tokio::sync::broadcast`.
//! State machines publish what happened (ad loaded, catalog incomplete, stale
//! host result dropped, ...) so that collaborators such as diagnostics screens
//! or tests can observe the bridge without touching its state.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies per bridge component
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   emit    ┌───────────┐
//! │ Correlation Store├──────────>│           │
//! └──────────────────┘           │           │
//!                                │ EventBus  │
//! ┌──────────────────┐   emit    │ (broadcast│   subscribe   ┌────────────┐
//! │ Ad / Billing /   ├──────────>│  channel) ├──────────────>│ Subscriber │
//! │ Consent managers │           │           │               └────────────┘
//! └──────────────────┘           │           │
//! ┌──────────────────┐   emit    │           │   subscribe   ┌────────────┐
//! │ Transfer bridge  ├──────────>│           ├──────────────>│ Subscriber │
//! └──────────────────┘           └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AdEvent, BridgeEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus.emit(BridgeEvent::Ads(AdEvent::Loaded)).ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event, BridgeEvent::Ads(AdEvent::Loaded));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! Emitting with no subscribers returns an error which publishers ignore; the
//! bus is purely observational and the bridge never depends on delivery.

use bridge_traits::{BillingResponseCode, ConsentStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Bridge Event Types
// ============================================================================

/// Top-level event enum encompassing all bridge components.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum BridgeEvent {
    /// Pending-operation bookkeeping
    Correlation(CorrelationEvent),
    /// Document export/import
    Transfer(TransferEvent),
    /// Rewarded ad lifecycle
    Ads(AdEvent),
    /// In-app billing
    Billing(BillingEvent),
    /// Privacy consent
    Consent(ConsentEvent),
}

impl BridgeEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            BridgeEvent::Correlation(e) => e.description(),
            BridgeEvent::Transfer(e) => e.description(),
            BridgeEvent::Ads(e) => e.description(),
            BridgeEvent::Billing(e) => e.description(),
            BridgeEvent::Consent(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            BridgeEvent::Transfer(TransferEvent::Failed { .. })
            | BridgeEvent::Billing(BillingEvent::SetupFailed { .. })
            | BridgeEvent::Ads(AdEvent::Disabled { .. }) => EventSeverity::Error,
            BridgeEvent::Correlation(CorrelationEvent::StaleDropped { .. })
            | BridgeEvent::Correlation(CorrelationEvent::Busy { .. })
            | BridgeEvent::Ads(AdEvent::LoadFailed { .. })
            | BridgeEvent::Ads(AdEvent::ShowFailed { .. })
            | BridgeEvent::Ads(AdEvent::RetryExhausted { .. })
            | BridgeEvent::Billing(BillingEvent::CatalogIncomplete { .. })
            | BridgeEvent::Billing(BillingEvent::PartiallyAcknowledged { .. })
            | BridgeEvent::Billing(BillingEvent::ConsumeFailed { .. })
            | BridgeEvent::Consent(ConsentEvent::InfoUpdateFailed { .. })
            | BridgeEvent::Consent(ConsentEvent::FormLoadFailed { .. }) => EventSeverity::Warning,
            BridgeEvent::Transfer(TransferEvent::Completed { .. })
            | BridgeEvent::Ads(AdEvent::RewardEarned)
            | BridgeEvent::Billing(BillingEvent::CatalogLoaded { .. })
            | BridgeEvent::Billing(BillingEvent::Consumed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Correlation Events
// ============================================================================

/// Events raised by the correlation store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CorrelationEvent {
    /// A request was rejected because one of the same kind is pending.
    Busy {
        /// Operation kind name (e.g. "FileExport").
        kind: String,
    },
    /// A host result did not match the pending operation and was dropped.
    StaleDropped {
        kind: String,
        /// Token carried by the dropped result.
        token: String,
    },
    /// Every pending operation was abandoned.
    Reset { abandoned: usize },
}

impl CorrelationEvent {
    fn description(&self) -> &str {
        match self {
            CorrelationEvent::Busy { .. } => "Request rejected, operation already pending",
            CorrelationEvent::StaleDropped { .. } => "Stale host result dropped",
            CorrelationEvent::Reset { .. } => "Pending operations reset",
        }
    }
}

// ============================================================================
// Transfer Events
// ============================================================================

/// Direction of a document transfer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransferDirection {
    Export,
    Import,
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::Export => write!(f, "export"),
            TransferDirection::Import => write!(f, "import"),
        }
    }
}

/// Events related to document export and import.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum TransferEvent {
    /// The host picker was launched.
    PickerLaunched {
        direction: TransferDirection,
        /// Suggested filename (never a full path).
        file_name: String,
    },
    /// Bytes were fully copied.
    Completed {
        direction: TransferDirection,
        display_name: Option<String>,
    },
    /// The user cancelled the picker.
    Aborted { direction: TransferDirection },
    /// Picker launch or streaming failed.
    Failed {
        direction: TransferDirection,
        message: String,
    },
}

impl TransferEvent {
    fn description(&self) -> &str {
        match self {
            TransferEvent::PickerLaunched { .. } => "Document picker launched",
            TransferEvent::Completed { .. } => "Document transfer completed",
            TransferEvent::Aborted { .. } => "Document transfer cancelled",
            TransferEvent::Failed { .. } => "Document transfer failed",
        }
    }
}

// ============================================================================
// Ad Events
// ============================================================================

/// Events related to the rewarded ad lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AdEvent {
    /// A load request was issued.
    LoadStarted {
        /// 1-based attempt number since the last successful load.
        attempt: u32,
    },
    /// An ad is ready to be shown.
    Loaded,
    /// The host failed to load an ad.
    LoadFailed { attempt: u32, message: String },
    /// The retry policy gave up.
    RetryExhausted { attempts: u32 },
    /// The ad went full screen.
    Shown,
    /// The user earned the reward for the current show.
    RewardEarned,
    /// The ad was dismissed.
    Dismissed,
    /// The host could not present the ad.
    ShowFailed { message: String },
    /// SDK initialization failed; no ads will be loaded.
    Disabled { message: String },
}

impl AdEvent {
    fn description(&self) -> &str {
        match self {
            AdEvent::LoadStarted { .. } => "Loading rewarded ad",
            AdEvent::Loaded => "Rewarded ad ready",
            AdEvent::LoadFailed { .. } => "Rewarded ad failed to load",
            AdEvent::RetryExhausted { .. } => "Rewarded ad retries exhausted",
            AdEvent::Shown => "Rewarded ad shown",
            AdEvent::RewardEarned => "Reward earned",
            AdEvent::Dismissed => "Rewarded ad dismissed",
            AdEvent::ShowFailed { .. } => "Rewarded ad failed to show",
            AdEvent::Disabled { .. } => "Rewarded ads disabled",
        }
    }
}

// ============================================================================
// Billing Events
// ============================================================================

/// Events related to in-app billing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum BillingEvent {
    /// The billing service connection is established.
    Connected,
    /// The billing setup finished with an error.
    SetupFailed { response: BillingResponseCode },
    /// The billing service connection dropped.
    Disconnected,
    /// Every configured product was found.
    CatalogLoaded { products: usize },
    /// The catalog response lacked configured products.
    CatalogIncomplete { missing: Vec<String> },
    /// A purchase flow was launched for a configured index.
    PurchaseLaunched { index: usize },
    /// A purchase was granted for every product and is being consumed.
    Acknowledged { product_ids: Vec<String> },
    /// At least one product of a purchase was not acknowledged.
    PartiallyAcknowledged {
        product_ids: Vec<String>,
        rejected: Vec<String>,
    },
    /// A purchase was consumed.
    Consumed { product_ids: Vec<String> },
    /// Consumption failed; the store will redeliver the purchase.
    ConsumeFailed { response: BillingResponseCode },
}

impl BillingEvent {
    fn description(&self) -> &str {
        match self {
            BillingEvent::Connected => "Billing connected",
            BillingEvent::SetupFailed { .. } => "Billing setup failed",
            BillingEvent::Disconnected => "Billing disconnected",
            BillingEvent::CatalogLoaded { .. } => "Product catalog loaded",
            BillingEvent::CatalogIncomplete { .. } => "Product catalog incomplete",
            BillingEvent::PurchaseLaunched { .. } => "Purchase flow launched",
            BillingEvent::Acknowledged { .. } => "Purchase acknowledged",
            BillingEvent::PartiallyAcknowledged { .. } => "Purchase partially acknowledged",
            BillingEvent::Consumed { .. } => "Purchase consumed",
            BillingEvent::ConsumeFailed { .. } => "Purchase consumption failed",
        }
    }
}

// ============================================================================
// Consent Events
// ============================================================================

/// Events related to the privacy consent flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ConsentEvent {
    /// Consent information refreshed.
    InfoUpdated {
        status: ConsentStatus,
        form_available: bool,
    },
    InfoUpdateFailed { message: String },
    /// Consent form ready to be shown.
    FormLoaded { status: ConsentStatus },
    FormLoadFailed { message: String },
    FormShown,
    FormDismissed,
}

impl ConsentEvent {
    fn description(&self) -> &str {
        match self {
            ConsentEvent::InfoUpdated { .. } => "Consent information updated",
            ConsentEvent::InfoUpdateFailed { .. } => "Consent information update failed",
            ConsentEvent::FormLoaded { .. } => "Consent form loaded",
            ConsentEvent::FormLoadFailed { .. } => "Consent form failed to load",
            ConsentEvent::FormShown => "Consent form shown",
            ConsentEvent::FormDismissed => "Consent form dismissed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for bridge events.
///
/// Cloning an `EventBus` yields another handle to the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BridgeEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero (enforced by the configuration builder).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are no active subscribers.
    pub fn emit(&self, event: BridgeEvent) -> Result<usize, SendError<BridgeEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventPredicate = Box<dyn Fn(&BridgeEvent) -> bool + Send + Sync>;

/// Subscriber that only yields events above a severity floor and matching
/// an optional predicate.
///
/// ```rust
/// use core_runtime::events::{BridgeEvent, EventBus, EventSeverity, EventStream};
///
/// let bus = EventBus::new(16);
/// let billing_problems = EventStream::new(bus.subscribe())
///     .at_least(EventSeverity::Warning)
///     .filter(|event| matches!(event, BridgeEvent::Billing(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<BridgeEvent>,
    floor: EventSeverity,
    predicate: Option<EventPredicate>,
}

impl EventStream {
    pub fn new(receiver: Receiver<BridgeEvent>) -> Self {
        Self {
            receiver,
            floor: EventSeverity::Debug,
            predicate: None,
        }
    }

    pub fn at_least(mut self, severity: EventSeverity) -> Self {
        self.floor = severity;
        self
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&BridgeEvent) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    fn wants(&self, event: &BridgeEvent) -> bool {
        event.severity() >= self.floor && self.predicate.as_ref().map_or(true, |p| p(event))
    }

    /// Next matching event. Lagging is reported, not skipped.
    pub async fn recv(&mut self) -> Result<BridgeEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.wants(&event) {
                return Ok(event);
            }
        }
    }

    /// Next matching event already queued, if any.
    pub fn try_recv(&mut self) -> Option<Result<BridgeEvent, RecvError>> {
        use broadcast::error::TryRecvError;

        loop {
            let event = match self.receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Lagged(missed)) => return Some(Err(RecvError::Lagged(missed))),
                Err(TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            };
            if self.wants(&event) {
                return Some(Ok(event));
            }
        }
    }

    /// Drain every matching event queued right now.
    pub fn drain(&mut self) -> Vec<BridgeEvent> {
        let mut events = Vec::new();
        while let Some(next) = self.try_recv() {
            match next {
                Ok(event) => events.push(event),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("floor", &self.floor)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
