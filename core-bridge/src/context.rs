//! # Bridge Context
//!
//! Owns every piece of bridge state and applies [`ControlMessage`]s to it.
//!
//! The context is single-writer: whoever owns it (usually the control thread
//! of `core-service`, or a host main loop) is the only one calling
//! [`BridgeContext::handle`]. Other threads observe [`BridgeSnapshot`]s.

use bridge_traits::{CorrelationToken, HostEvent};
use core_runtime::config::BridgeConfig;
use core_runtime::events::{EventBus, TransferDirection};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::ads::AdLifecycleManager;
use crate::billing::PurchaseFlowManager;
use crate::consent::ConsentFlowManager;
use crate::correlation::{CorrelationStore, OperationKind};
use crate::error::{CoreBridgeError, Result};
use crate::fetch::BlockingFetch;
use crate::native::{NativeCore, NativeRequest};
use crate::transfer::FileTransferBridge;

/// Work a manager asks to be re-entered with later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeferredAction {
    ReloadAd,
}

/// Delivers a [`DeferredAction`] back to the context after `delay`.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, action: DeferredAction);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    Native(NativeRequest),
    Host(HostEvent),
    Deferred(DeferredAction),
}

impl ControlMessage {
    pub fn name(&self) -> &'static str {
        match self {
            ControlMessage::Native(request) => request.name(),
            ControlMessage::Host(event) => event.name(),
            ControlMessage::Deferred(DeferredAction::ReloadAd) => "reload_ad",
        }
    }
}

/// Read-only view of the bridge, published after every message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSnapshot {
    pub ad_ready: bool,
    pub billing_ready: bool,
    pub consent_form_ready: bool,
    pub export_pending: bool,
    pub import_pending: bool,
}

pub struct BridgeContext {
    correlations: CorrelationStore,
    export: FileTransferBridge,
    import: FileTransferBridge,
    fetch: BlockingFetch,
    ads: Option<AdLifecycleManager>,
    billing: Option<PurchaseFlowManager>,
    consent: Option<ConsentFlowManager>,
    native: Arc<dyn NativeCore>,
    scheduler: Arc<dyn Scheduler>,
    event_bus: EventBus,
}

impl BridgeContext {
    /// Build the context from a configuration.
    ///
    /// Managers exist only for enabled features.
    pub fn new(
        config: BridgeConfig,
        native: Arc<dyn NativeCore>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(config.event_buffer_size);
        let correlations = CorrelationStore::new(config.clock.clone(), event_bus.clone());

        let export = FileTransferBridge::new(
            TransferDirection::Export,
            &config.internal_root,
            config.document_picker.clone(),
            config.document_store.clone(),
            event_bus.clone(),
        );
        let import = FileTransferBridge::new(
            TransferDirection::Import,
            &config.internal_root,
            config.document_picker.clone(),
            config.document_store.clone(),
            event_bus.clone(),
        );

        let ads = match (&config.rewarded_ads, config.features.enable_ads) {
            (Some(ads), true) => Some(AdLifecycleManager::new(
                ads.clone(),
                config.ad_unit_id.clone(),
                config.ad_retry,
                event_bus.clone(),
            )),
            _ => None,
        };

        let billing = match (&config.billing_client, config.features.enable_billing) {
            (Some(client), true) => Some(PurchaseFlowManager::new(
                client.clone(),
                config.product_ids.clone(),
                event_bus.clone(),
            )),
            _ => None,
        };

        let consent = match (&config.consent_provider, config.features.enable_consent) {
            (Some(provider), true) => Some(ConsentFlowManager::new(
                provider.clone(),
                config.consent_request,
                event_bus.clone(),
            )),
            _ => None,
        };

        Ok(Self {
            correlations,
            export,
            import,
            fetch: BlockingFetch::new(config.http_client.clone()),
            ads,
            billing,
            consent,
            native,
            scheduler,
            event_bus,
        })
    }

    /// Kick off the host pipelines: consent refresh, ad SDK start, billing
    /// connection. Each step is fire-and-forget; a failure only disables its
    /// own feature.
    #[instrument(skip(self))]
    pub fn start(&mut self) {
        if let Some(consent) = self.consent.as_mut() {
            if let Err(e) = consent.start(&mut self.correlations) {
                warn!(error = %e, "Consent flow did not start");
            }
        }

        if let Some(ads) = self.ads.as_mut() {
            if let Err(e) = ads.start(&mut self.correlations) {
                warn!(error = %e, "Ad lifecycle did not start");
            }
        }

        if let Some(billing) = self.billing.as_mut() {
            if let Err(e) = billing.connect() {
                warn!(error = %e, "Billing connection did not start");
            }
        }

        info!(
            ads = self.ads.is_some(),
            billing = self.billing.is_some(),
            consent = self.consent.is_some(),
            "Bridge started"
        );
    }

    /// Apply one message.
    pub fn handle(&mut self, message: ControlMessage) -> Result<()> {
        debug!(message = message.name(), "Handling control message");
        match message {
            ControlMessage::Native(request) => self.handle_native(request),
            ControlMessage::Host(event) => self.handle_host(event),
            ControlMessage::Deferred(DeferredAction::ReloadAd) => self.reload_ad(),
        }
    }

    fn handle_native(&mut self, request: NativeRequest) -> Result<()> {
        let native = self.native.as_ref();
        match request {
            NativeRequest::RequestExport { path } => self
                .export
                .request(&mut self.correlations, native, &path)
                .map(|_| ()),
            NativeRequest::RequestImport { path } => self
                .import
                .request(&mut self.correlations, native, &path)
                .map(|_| ()),
            NativeRequest::ShowAd => enabled(&mut self.ads, "ads")?.show(&mut self.correlations),
            NativeRequest::Buy { index } => {
                enabled(&mut self.billing, "billing")?.buy(&mut self.correlations, index)
            }
            NativeRequest::ShowConsentForm => {
                enabled(&mut self.consent, "consent")?.show_form(&mut self.correlations)
            }
        }
    }

    fn handle_host(&mut self, event: HostEvent) -> Result<()> {
        let native = self.native.as_ref();
        let correlations = &mut self.correlations;

        match event {
            HostEvent::DocumentPicked { token, outcome } => {
                let bridge = if correlations.matches(OperationKind::FileImport, token) {
                    &mut self.import
                } else {
                    &mut self.export
                };
                bridge.on_picked(correlations, native, token, outcome).map(|_| ())
            }

            HostEvent::AdLoaded { token } => enabled(&mut self.ads, "ads")?.on_loaded(correlations, token),
            HostEvent::AdLoadFailed { token, message } => enabled(&mut self.ads, "ads")?.on_load_failed(
                correlations,
                self.scheduler.as_ref(),
                token,
                &message,
            ),
            HostEvent::AdShown { token } => enabled(&mut self.ads, "ads")?.on_shown(correlations, token),
            HostEvent::AdRewardEarned { token } => {
                enabled(&mut self.ads, "ads")?.on_reward(correlations, native, token)
            }
            HostEvent::AdShowFailed { token, message } => {
                enabled(&mut self.ads, "ads")?.on_show_failed(correlations, token, &message)
            }
            HostEvent::AdDismissed { token } => enabled(&mut self.ads, "ads")?.on_dismissed(correlations, token),

            HostEvent::BillingSetupFinished { response } => {
                enabled(&mut self.billing, "billing")?.on_setup_finished(correlations, response)
            }
            HostEvent::BillingServiceDisconnected => enabled(&mut self.billing, "billing")?.on_disconnected(),
            HostEvent::ProductDetailsReceived {
                token,
                response,
                products,
            } => enabled(&mut self.billing, "billing")?.on_product_details(correlations, token, response, products),
            HostEvent::PurchasesUpdated {
                origin,
                response,
                purchases,
            } => enabled(&mut self.billing, "billing")?.on_purchases_updated(
                correlations,
                native,
                origin,
                response,
                purchases,
            ),
            HostEvent::ConsumeFinished {
                purchase_token,
                response,
            } => enabled(&mut self.billing, "billing")?.on_consume_finished(&purchase_token, response),

            HostEvent::ConsentInfoUpdated {
                token,
                status,
                form_available,
            } => enabled(&mut self.consent, "consent")?.on_info_updated(correlations, token, status, form_available),
            HostEvent::ConsentInfoUpdateFailed { token, message } => {
                enabled(&mut self.consent, "consent")?.on_info_update_failed(correlations, token, &message)
            }
            HostEvent::ConsentFormLoaded { token, status } => {
                enabled(&mut self.consent, "consent")?.on_form_loaded(correlations, token, status)
            }
            HostEvent::ConsentFormLoadFailed { token, message } => {
                enabled(&mut self.consent, "consent")?.on_form_load_failed(correlations, token, &message)
            }
            HostEvent::ConsentFormDismissed { token } => {
                enabled(&mut self.consent, "consent")?.on_form_dismissed(correlations, token)
            }
        }
    }

    /// Issue an ad load if none is loading or held. Used by the retry
    /// scheduler and after retries were exhausted.
    pub fn reload_ad(&mut self) -> Result<()> {
        enabled(&mut self.ads, "ads")?.load(&mut self.correlations)
    }

    pub fn snapshot(&self) -> BridgeSnapshot {
        BridgeSnapshot {
            ad_ready: self.ads.as_ref().map_or(false, AdLifecycleManager::is_ready),
            billing_ready: self.billing.as_ref().map_or(false, PurchaseFlowManager::is_ready),
            consent_form_ready: self
                .consent
                .as_ref()
                .map_or(false, ConsentFlowManager::is_form_ready),
            export_pending: self.correlations.is_pending(OperationKind::FileExport),
            import_pending: self.correlations.is_pending(OperationKind::FileImport),
        }
    }

    /// Abandon every pending operation, e.g. when the host UI is torn down.
    /// Late results for them are dropped as stale; no native callback fires.
    pub fn reset(&mut self) -> usize {
        self.export.abandon();
        self.import.abandon();
        if let Some(ads) = self.ads.as_mut() {
            ads.abandon();
        }
        self.correlations.reset()
    }

    pub fn is_pending(&self, kind: OperationKind) -> bool {
        self.correlations.is_pending(kind)
    }

    pub fn pending_token(&self, kind: OperationKind) -> Option<CorrelationToken> {
        self.correlations.pending(kind).map(|pending| pending.token)
    }

    /// Blocking fetch handle. Callable from any thread; it touches no
    /// context state.
    pub fn fetcher(&self) -> BlockingFetch {
        self.fetch.clone()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn ads(&self) -> Option<&AdLifecycleManager> {
        self.ads.as_ref()
    }

    pub fn billing(&self) -> Option<&PurchaseFlowManager> {
        self.billing.as_ref()
    }

    pub fn consent(&self) -> Option<&ConsentFlowManager> {
        self.consent.as_ref()
    }

    /// Resolve a native path the way transfers do.
    pub fn internal_path(&self, path: &Path) -> Result<std::path::PathBuf> {
        self.export.internal_path(path)
    }
}

fn enabled<'a, T>(manager: &'a mut Option<T>, feature: &str) -> Result<&'a mut T> {
    manager.as_mut().ok_or_else(|| {
        debug!(feature, "Feature disabled, ignoring");
        CoreBridgeError::NotReady(format!("{} disabled", feature))
    })
}

impl fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeContext")
            .field("correlations", &self.correlations)
            .field("export", &self.export)
            .field("import", &self.import)
            .field("ads", &self.ads)
            .field("billing", &self.billing)
            .field("consent", &self.consent)
            .finish_non_exhaustive()
    }
}
