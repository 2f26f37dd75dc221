//! # Correlation Store
//!
//! Tracks at most one in-flight operation per [`OperationKind`] and matches
//! asynchronous host results back to the request that caused them.
//!
//! Every host call made by the bridge carries the [`CorrelationToken`] handed
//! out by [`CorrelationStore::begin`]. When the host answers, the owning
//! manager resolves the token against the store:
//!
//! - a matching token yields the [`PendingOperation`] and frees the slot
//! - any other token is *stale*: the result is dropped, a warning is logged
//!   and a [`CorrelationEvent::StaleDropped`] is published, nothing else
//!
//! A second request of a kind that is already pending is rejected with
//! [`CoreBridgeError::Busy`], never queued. The store never retries.

use bridge_traits::{Clock, CorrelationToken};
use chrono::{DateTime, Utc};
use core_runtime::events::{BridgeEvent, CorrelationEvent, EventBus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{CoreBridgeError, Result};

/// Category of pending operation. Each kind has its own slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    FileExport,
    FileImport,
    AdLoad,
    AdShow,
    CatalogSync,
    PurchaseFlow,
    ConsentFlow,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::FileExport,
        OperationKind::FileImport,
        OperationKind::AdLoad,
        OperationKind::AdShow,
        OperationKind::CatalogSync,
        OperationKind::PurchaseFlow,
        OperationKind::ConsentFlow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::FileExport => "FileExport",
            OperationKind::FileImport => "FileImport",
            OperationKind::AdLoad => "AdLoad",
            OperationKind::AdShow => "AdShow",
            OperationKind::CatalogSync => "CatalogSync",
            OperationKind::PurchaseFlow => "PurchaseFlow",
            OperationKind::ConsentFlow => "ConsentFlow",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation waiting for its host result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub kind: OperationKind,
    pub token: CorrelationToken,
    pub requested_at: DateTime<Utc>,
    /// Internal file the operation works on, for transfers
    pub resource_path: Option<PathBuf>,
}

/// Owner of every [`PendingOperation`].
pub struct CorrelationStore {
    pending: HashMap<OperationKind, PendingOperation>,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
}

impl CorrelationStore {
    pub fn new(clock: Arc<dyn Clock>, event_bus: EventBus) -> Self {
        Self {
            pending: HashMap::new(),
            clock,
            event_bus,
        }
    }

    /// Register a new operation of `kind`.
    ///
    /// # Errors
    ///
    /// [`CoreBridgeError::Busy`] if an operation of the same kind is pending.
    pub fn begin(&mut self, kind: OperationKind) -> Result<CorrelationToken> {
        self.insert(kind, None)
    }

    /// Register a new operation of `kind` working on `path`.
    pub fn begin_with_resource(
        &mut self,
        kind: OperationKind,
        path: impl Into<PathBuf>,
    ) -> Result<CorrelationToken> {
        self.insert(kind, Some(path.into()))
    }

    fn insert(&mut self, kind: OperationKind, resource_path: Option<PathBuf>) -> Result<CorrelationToken> {
        if self.pending.contains_key(&kind) {
            warn!(kind = %kind, "Rejecting request, operation already pending");
            let _ = self
                .event_bus
                .emit(BridgeEvent::Correlation(CorrelationEvent::Busy {
                    kind: kind.to_string(),
                }));
            return Err(CoreBridgeError::Busy { kind });
        }

        let token = CorrelationToken::new();
        self.pending.insert(
            kind,
            PendingOperation {
                kind,
                token,
                requested_at: self.clock.now(),
                resource_path,
            },
        );

        debug!(kind = %kind, token = %token, "Operation pending");
        Ok(token)
    }

    /// Resolve the pending operation of `kind` with the token carried by a
    /// host result, freeing the slot.
    ///
    /// # Errors
    ///
    /// [`CoreBridgeError::Stale`] when nothing of that kind is pending or the
    /// token belongs to another request. The pending operation, if any, is
    /// left untouched.
    pub fn resolve(&mut self, kind: OperationKind, token: CorrelationToken) -> Result<PendingOperation> {
        if !self.matches(kind, token) {
            self.report_stale(kind, token);
            return Err(CoreBridgeError::Stale { kind });
        }

        let resolved = self
            .pending
            .remove(&kind)
            .ok_or(CoreBridgeError::Stale { kind })?;
        debug!(
            kind = %kind,
            elapsed_ms = self.clock.millis_since(resolved.requested_at),
            "Operation resolved"
        );
        Ok(resolved)
    }

    /// Drop the pending operation of `kind` without a result. Its late result
    /// will be stale.
    pub fn abandon(&mut self, kind: OperationKind) -> Option<PendingOperation> {
        let abandoned = self.pending.remove(&kind)?;
        debug!(kind = %kind, token = %abandoned.token, "Operation abandoned");
        Some(abandoned)
    }

    /// Like [`resolve`](Self::resolve) but keeps the operation pending, for
    /// intermediate results of a multi-step flow.
    pub fn verify(&self, kind: OperationKind, token: CorrelationToken) -> Result<()> {
        if self.matches(kind, token) {
            Ok(())
        } else {
            self.report_stale(kind, token);
            Err(CoreBridgeError::Stale { kind })
        }
    }

    /// Peek: does `token` belong to the pending operation of `kind`?
    pub fn matches(&self, kind: OperationKind, token: CorrelationToken) -> bool {
        self.pending
            .get(&kind)
            .map_or(false, |pending| pending.token == token)
    }

    pub fn is_pending(&self, kind: OperationKind) -> bool {
        self.pending.contains_key(&kind)
    }

    pub fn pending(&self, kind: OperationKind) -> Option<&PendingOperation> {
        self.pending.get(&kind)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Abandon every pending operation. Late results for them become stale.
    pub fn reset(&mut self) -> usize {
        let abandoned = self.pending.len();
        self.pending.clear();

        if abandoned > 0 {
            info!(abandoned, "Abandoned pending operations");
        }
        let _ = self
            .event_bus
            .emit(BridgeEvent::Correlation(CorrelationEvent::Reset { abandoned }));

        abandoned
    }

    fn report_stale(&self, kind: OperationKind, token: CorrelationToken) {
        warn!(kind = %kind, token = %token, "Dropping stale host result");
        let _ = self
            .event_bus
            .emit(BridgeEvent::Correlation(CorrelationEvent::StaleDropped {
                kind: kind.to_string(),
                token: token.to_string(),
            }));
    }
}

impl fmt::Debug for CorrelationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationStore")
            .field("pending", &self.pending.keys().collect::<Vec<_>>())
            .finish()
    }
}
