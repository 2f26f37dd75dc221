//! Privacy consent flow: refresh consent information, keep the consent form
//! loaded, show it when the user must answer or when the native core asks.
//!
//! The state is advisory. It never gates ads or purchases.

use bridge_traits::{ConsentProvider, ConsentRequest, ConsentStatus, CorrelationToken};
use core_runtime::events::{BridgeEvent, ConsentEvent, EventBus};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::correlation::{CorrelationStore, OperationKind};
use crate::error::{CoreBridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentState {
    Unknown,
    NotRequired,
    FormReady,
    FormShown,
}

pub struct ConsentFlowManager {
    state: ConsentState,
    provider: Arc<dyn ConsentProvider>,
    request: ConsentRequest,
    event_bus: EventBus,
}

impl ConsentFlowManager {
    pub fn new(provider: Arc<dyn ConsentProvider>, request: ConsentRequest, event_bus: EventBus) -> Self {
        Self {
            state: ConsentState::Unknown,
            provider,
            request,
            event_bus,
        }
    }

    pub fn state(&self) -> ConsentState {
        self.state
    }

    pub fn is_form_ready(&self) -> bool {
        self.state == ConsentState::FormReady
    }

    /// Request a consent information refresh.
    #[instrument(skip_all)]
    pub fn start(&mut self, correlations: &mut CorrelationStore) -> Result<()> {
        let token = correlations.begin(OperationKind::ConsentFlow)?;

        if let Err(e) = self.provider.request_info_update(&self.request, token) {
            warn!(error = %e, "Consent info update rejected by host");
            let _ = correlations.resolve(OperationKind::ConsentFlow, token);
            return Err(e.into());
        }
        Ok(())
    }

    pub fn on_info_updated(
        &mut self,
        correlations: &mut CorrelationStore,
        token: CorrelationToken,
        status: ConsentStatus,
        form_available: bool,
    ) -> Result<()> {
        correlations.resolve(OperationKind::ConsentFlow, token)?;

        info!(status = ?status, form_available, "Consent information updated");
        let _ = self
            .event_bus
            .emit(BridgeEvent::Consent(ConsentEvent::InfoUpdated {
                status,
                form_available,
            }));

        if form_available {
            self.load_form(correlations)
        } else {
            self.state = ConsentState::NotRequired;
            Ok(())
        }
    }

    pub fn on_info_update_failed(
        &mut self,
        correlations: &mut CorrelationStore,
        token: CorrelationToken,
        message: &str,
    ) -> Result<()> {
        correlations.resolve(OperationKind::ConsentFlow, token)?;

        warn!(error = %message, "Consent info update failed");
        self.state = ConsentState::Unknown;
        let _ = self
            .event_bus
            .emit(BridgeEvent::Consent(ConsentEvent::InfoUpdateFailed {
                message: message.to_string(),
            }));
        Ok(())
    }

    fn load_form(&mut self, correlations: &mut CorrelationStore) -> Result<()> {
        let token = correlations.begin(OperationKind::ConsentFlow)?;

        if let Err(e) = self.provider.load_form(token) {
            warn!(error = %e, "Consent form load rejected by host");
            let _ = correlations.resolve(OperationKind::ConsentFlow, token);
            self.state = ConsentState::Unknown;
            return Err(e.into());
        }

        debug!("Consent form load issued");
        Ok(())
    }

    /// A loaded form is shown right away when consent is required.
    pub fn on_form_loaded(
        &mut self,
        correlations: &mut CorrelationStore,
        token: CorrelationToken,
        status: ConsentStatus,
    ) -> Result<()> {
        correlations.resolve(OperationKind::ConsentFlow, token)?;

        info!(status = ?status, "Consent form loaded");
        self.state = ConsentState::FormReady;
        let _ = self
            .event_bus
            .emit(BridgeEvent::Consent(ConsentEvent::FormLoaded { status }));

        if status == ConsentStatus::Required {
            self.show_form(correlations)?;
        }
        Ok(())
    }

    pub fn on_form_load_failed(
        &mut self,
        correlations: &mut CorrelationStore,
        token: CorrelationToken,
        message: &str,
    ) -> Result<()> {
        correlations.resolve(OperationKind::ConsentFlow, token)?;

        warn!(error = %message, "Consent form failed to load");
        self.state = ConsentState::Unknown;
        let _ = self
            .event_bus
            .emit(BridgeEvent::Consent(ConsentEvent::FormLoadFailed {
                message: message.to_string(),
            }));
        Ok(())
    }

    /// Show the loaded form.
    ///
    /// # Errors
    ///
    /// [`CoreBridgeError::NotReady`] unless the form is `FormReady`.
    pub fn show_form(&mut self, correlations: &mut CorrelationStore) -> Result<()> {
        if self.state != ConsentState::FormReady {
            warn!(state = ?self.state, "Consent form requested but not ready");
            return Err(CoreBridgeError::NotReady(format!(
                "consent form is {:?}",
                self.state
            )));
        }

        let token = correlations.begin(OperationKind::ConsentFlow)?;
        if let Err(e) = self.provider.show_form(token) {
            warn!(error = %e, "Consent form could not be shown");
            let _ = correlations.resolve(OperationKind::ConsentFlow, token);
            return Err(e.into());
        }

        self.state = ConsentState::FormShown;
        let _ = self.event_bus.emit(BridgeEvent::Consent(ConsentEvent::FormShown));
        Ok(())
    }

    /// Every dismissal reloads the form so it can be shown again.
    pub fn on_form_dismissed(&mut self, correlations: &mut CorrelationStore, token: CorrelationToken) -> Result<()> {
        correlations.resolve(OperationKind::ConsentFlow, token)?;

        debug!("Consent form dismissed, reloading");
        let _ = self
            .event_bus
            .emit(BridgeEvent::Consent(ConsentEvent::FormDismissed));
        self.load_form(correlations)
    }
}

impl std::fmt::Debug for ConsentFlowManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentFlowManager")
            .field("state", &self.state)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}
