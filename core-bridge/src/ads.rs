//! # Ad Lifecycle Manager
//!
//! Holds at most one rewarded ad and keeps it loaded.
//!
//! ```text
//! Empty -> Loading -> Ready -> Showing -> Empty (reload)
//!            |
//!            +-- load failed --> Empty (retry per RetryPolicy)
//! ```
//!
//! Loads are no-ops unless the manager is `Empty`. Show is accepted only in
//! `Ready`. Dismissal and show failure both return to `Empty` and reload.

use bridge_traits::{CorrelationToken, RewardedAds};
use core_runtime::events::{AdEvent, BridgeEvent, EventBus};
use core_runtime::retry::RetryPolicy;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::context::{DeferredAction, Scheduler};
use crate::correlation::{CorrelationStore, OperationKind};
use crate::error::{CoreBridgeError, Result};
use crate::native::NativeCore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdState {
    Empty,
    Loading,
    Ready,
    Showing,
}

pub struct AdLifecycleManager {
    state: AdState,
    enabled: bool,
    ads: Arc<dyn RewardedAds>,
    ad_unit_id: String,
    retry: RetryPolicy,
    /// Consecutive load attempts since the last successful load
    attempts: u32,
    /// Reward already delivered for the current show
    rewarded: bool,
    event_bus: EventBus,
}

impl AdLifecycleManager {
    pub fn new(
        ads: Arc<dyn RewardedAds>,
        ad_unit_id: impl Into<String>,
        retry: RetryPolicy,
        event_bus: EventBus,
    ) -> Self {
        Self {
            state: AdState::Empty,
            enabled: true,
            ads,
            ad_unit_id: ad_unit_id.into(),
            retry,
            attempts: 0,
            rewarded: false,
            event_bus,
        }
    }

    pub fn state(&self) -> AdState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.enabled && self.state == AdState::Ready
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Forget a load or show abandoned by a forced reset.
    pub fn abandon(&mut self) {
        if matches!(self.state, AdState::Loading | AdState::Showing) {
            self.state = AdState::Empty;
        }
        self.rewarded = false;
    }

    /// Initialize the ad SDK, then issue the first load.
    ///
    /// An initialization failure disables the manager for the process.
    #[instrument(skip_all)]
    pub fn start(&mut self, correlations: &mut CorrelationStore) -> Result<()> {
        if let Err(e) = self.ads.initialize() {
            warn!(error = %e, "Ad SDK initialization failed, ads disabled");
            self.enabled = false;
            let _ = self.event_bus.emit(BridgeEvent::Ads(AdEvent::Disabled {
                message: e.to_string(),
            }));
            return Err(e.into());
        }

        info!("Ad SDK initialized");
        self.load(correlations)
    }

    /// Issue a load unless an ad is already loading or held.
    pub fn load(&mut self, correlations: &mut CorrelationStore) -> Result<()> {
        if !self.enabled || self.state != AdState::Empty {
            debug!(state = ?self.state, enabled = self.enabled, "Skipping ad load");
            return Ok(());
        }

        let token = correlations.begin(OperationKind::AdLoad)?;
        self.attempts = self.attempts.saturating_add(1);
        self.state = AdState::Loading;

        if let Err(e) = self.ads.load(&self.ad_unit_id, token) {
            warn!(error = %e, attempt = self.attempts, "Ad load rejected by host");
            let _ = correlations.resolve(OperationKind::AdLoad, token);
            self.state = AdState::Empty;
            return Err(e.into());
        }

        debug!(attempt = self.attempts, "Ad load issued");
        let _ = self.event_bus.emit(BridgeEvent::Ads(AdEvent::LoadStarted {
            attempt: self.attempts,
        }));
        Ok(())
    }

    pub fn on_loaded(&mut self, correlations: &mut CorrelationStore, token: CorrelationToken) -> Result<()> {
        correlations.resolve(OperationKind::AdLoad, token)?;

        info!(attempts = self.attempts, "Rewarded ad loaded");
        self.state = AdState::Ready;
        self.attempts = 0;
        let _ = self.event_bus.emit(BridgeEvent::Ads(AdEvent::Loaded));
        Ok(())
    }

    pub fn on_load_failed(
        &mut self,
        correlations: &mut CorrelationStore,
        scheduler: &dyn Scheduler,
        token: CorrelationToken,
        message: &str,
    ) -> Result<()> {
        correlations.resolve(OperationKind::AdLoad, token)?;

        warn!(attempt = self.attempts, error = %message, "Rewarded ad failed to load");
        self.state = AdState::Empty;
        let _ = self.event_bus.emit(BridgeEvent::Ads(AdEvent::LoadFailed {
            attempt: self.attempts,
            message: message.to_string(),
        }));

        if !self.retry.allows_retry(self.attempts) {
            warn!(attempts = self.attempts, "Ad load retries exhausted");
            let _ = self.event_bus.emit(BridgeEvent::Ads(AdEvent::RetryExhausted {
                attempts: self.attempts,
            }));
            self.attempts = 0;
            return Ok(());
        }

        let delay = self.retry.delay_for_attempt(self.attempts);
        if delay.is_zero() {
            self.load(correlations)
        } else {
            debug!(delay_ms = delay.as_millis() as u64, "Scheduling ad reload");
            scheduler.schedule(delay, DeferredAction::ReloadAd);
            Ok(())
        }
    }

    /// Present the held ad.
    ///
    /// # Errors
    ///
    /// [`CoreBridgeError::NotReady`] unless an ad is `Ready`; nothing is sent
    /// to the host in that case.
    #[instrument(skip_all)]
    pub fn show(&mut self, correlations: &mut CorrelationStore) -> Result<()> {
        if !self.is_ready() {
            warn!(state = ?self.state, "Show requested without a ready ad");
            return Err(CoreBridgeError::NotReady(format!("ad is {:?}", self.state)));
        }

        let token = correlations.begin(OperationKind::AdShow)?;
        self.state = AdState::Showing;
        self.rewarded = false;

        if let Err(e) = self.ads.show(token) {
            if let Err(reload) = self.show_ended(correlations, token, &e.to_string()) {
                warn!(error = %reload, "Ad reload after show failure did not start");
            }
            return Err(e.into());
        }

        Ok(())
    }

    pub fn on_shown(&mut self, correlations: &CorrelationStore, token: CorrelationToken) -> Result<()> {
        correlations.verify(OperationKind::AdShow, token)?;
        debug!("Rewarded ad shown");
        let _ = self.event_bus.emit(BridgeEvent::Ads(AdEvent::Shown));
        Ok(())
    }

    pub fn on_reward(
        &mut self,
        correlations: &CorrelationStore,
        native: &dyn NativeCore,
        token: CorrelationToken,
    ) -> Result<()> {
        correlations.verify(OperationKind::AdShow, token)?;

        if self.state != AdState::Showing || self.rewarded {
            debug!(state = ?self.state, "Ignoring duplicate reward");
            return Ok(());
        }

        info!("User earned ad reward");
        self.rewarded = true;
        native.on_ad_reward();
        let _ = self.event_bus.emit(BridgeEvent::Ads(AdEvent::RewardEarned));
        Ok(())
    }

    pub fn on_dismissed(&mut self, correlations: &mut CorrelationStore, token: CorrelationToken) -> Result<()> {
        correlations.resolve(OperationKind::AdShow, token)?;

        debug!("Rewarded ad dismissed");
        self.state = AdState::Empty;
        let _ = self.event_bus.emit(BridgeEvent::Ads(AdEvent::Dismissed));
        self.load(correlations)
    }

    pub fn on_show_failed(
        &mut self,
        correlations: &mut CorrelationStore,
        token: CorrelationToken,
        message: &str,
    ) -> Result<()> {
        self.show_ended(correlations, token, message)
    }

    fn show_ended(&mut self, correlations: &mut CorrelationStore, token: CorrelationToken, message: &str) -> Result<()> {
        correlations.resolve(OperationKind::AdShow, token)?;

        warn!(error = %message, "Rewarded ad failed to show");
        self.state = AdState::Empty;
        let _ = self.event_bus.emit(BridgeEvent::Ads(AdEvent::ShowFailed {
            message: message.to_string(),
        }));
        self.load(correlations)
    }
}

impl std::fmt::Debug for AdLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdLifecycleManager")
            .field("state", &self.state)
            .field("enabled", &self.enabled)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}
