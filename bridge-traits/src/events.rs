//! Host-to-core callback events
//!
//! Host SDK listeners never call into the core directly. Instead the host
//! adapter translates each callback into a [`HostEvent`] and posts it to the
//! control thread, where it is matched against the pending operation that
//! caused it.

use serde::{Deserialize, Serialize};

use crate::billing::{BillingResponseCode, ProductDetails, Purchase};
use crate::consent::ConsentStatus;
use crate::documents::PickerOutcome;
use crate::token::CorrelationToken;

/// Asynchronous result delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum HostEvent {
    /// The document picker closed
    DocumentPicked {
        token: CorrelationToken,
        outcome: PickerOutcome,
    },

    /// A rewarded ad finished loading
    AdLoaded { token: CorrelationToken },
    /// A rewarded ad failed to load
    AdLoadFailed {
        token: CorrelationToken,
        message: String,
    },
    /// The ad went full screen
    AdShown { token: CorrelationToken },
    /// The user earned the reward
    AdRewardEarned { token: CorrelationToken },
    /// The ad could not be presented
    AdShowFailed {
        token: CorrelationToken,
        message: String,
    },
    /// The full screen ad was dismissed
    AdDismissed { token: CorrelationToken },

    /// The billing connection setup finished
    BillingSetupFinished { response: BillingResponseCode },
    /// The billing service dropped the connection
    BillingServiceDisconnected,
    /// Product details query answered
    ProductDetailsReceived {
        token: CorrelationToken,
        response: BillingResponseCode,
        products: Vec<ProductDetails>,
    },
    /// Purchases were updated. `origin` carries the launch token when the
    /// update answers a purchase launch, `None` for unsolicited redeliveries.
    PurchasesUpdated {
        origin: Option<CorrelationToken>,
        response: BillingResponseCode,
        purchases: Vec<Purchase>,
    },
    /// A consume request finished
    ConsumeFinished {
        purchase_token: String,
        response: BillingResponseCode,
    },

    /// Consent information refreshed
    ConsentInfoUpdated {
        token: CorrelationToken,
        status: ConsentStatus,
        form_available: bool,
    },
    /// Consent information refresh failed
    ConsentInfoUpdateFailed {
        token: CorrelationToken,
        message: String,
    },
    /// Consent form loaded
    ConsentFormLoaded {
        token: CorrelationToken,
        status: ConsentStatus,
    },
    /// Consent form failed to load
    ConsentFormLoadFailed {
        token: CorrelationToken,
        message: String,
    },
    /// Consent form was dismissed by the user
    ConsentFormDismissed { token: CorrelationToken },
}

impl HostEvent {
    /// Correlation token carried by the event, if any.
    pub fn token(&self) -> Option<CorrelationToken> {
        match self {
            HostEvent::DocumentPicked { token, .. }
            | HostEvent::AdLoaded { token }
            | HostEvent::AdLoadFailed { token, .. }
            | HostEvent::AdShown { token }
            | HostEvent::AdRewardEarned { token }
            | HostEvent::AdShowFailed { token, .. }
            | HostEvent::AdDismissed { token }
            | HostEvent::ProductDetailsReceived { token, .. }
            | HostEvent::ConsentInfoUpdated { token, .. }
            | HostEvent::ConsentInfoUpdateFailed { token, .. }
            | HostEvent::ConsentFormLoaded { token, .. }
            | HostEvent::ConsentFormLoadFailed { token, .. }
            | HostEvent::ConsentFormDismissed { token } => Some(*token),
            HostEvent::PurchasesUpdated { origin, .. } => *origin,
            HostEvent::BillingSetupFinished { .. }
            | HostEvent::BillingServiceDisconnected
            | HostEvent::ConsumeFinished { .. } => None,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::DocumentPicked { .. } => "document_picked",
            HostEvent::AdLoaded { .. } => "ad_loaded",
            HostEvent::AdLoadFailed { .. } => "ad_load_failed",
            HostEvent::AdShown { .. } => "ad_shown",
            HostEvent::AdRewardEarned { .. } => "ad_reward_earned",
            HostEvent::AdShowFailed { .. } => "ad_show_failed",
            HostEvent::AdDismissed { .. } => "ad_dismissed",
            HostEvent::BillingSetupFinished { .. } => "billing_setup_finished",
            HostEvent::BillingServiceDisconnected => "billing_service_disconnected",
            HostEvent::ProductDetailsReceived { .. } => "product_details_received",
            HostEvent::PurchasesUpdated { .. } => "purchases_updated",
            HostEvent::ConsumeFinished { .. } => "consume_finished",
            HostEvent::ConsentInfoUpdated { .. } => "consent_info_updated",
            HostEvent::ConsentInfoUpdateFailed { .. } => "consent_info_update_failed",
            HostEvent::ConsentFormLoaded { .. } => "consent_form_loaded",
            HostEvent::ConsentFormLoadFailed { .. } => "consent_form_load_failed",
            HostEvent::ConsentFormDismissed { .. } => "consent_form_dismissed",
        }
    }
}
