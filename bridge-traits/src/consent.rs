//! Privacy Consent SDK Abstraction

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::token::CorrelationToken;

/// Parameters sent with a consent information refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsentRequest {
    /// Whether the user should be treated as under the age of consent
    pub tag_for_under_age_of_consent: bool,
}

/// Consent status as reported by the consent SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentStatus {
    Unknown,
    NotRequired,
    Required,
    Obtained,
}

/// Consent SDK (UMP or equivalent)
///
/// Outcomes come back as `HostEvent::ConsentInfoUpdated`,
/// `ConsentInfoUpdateFailed`, `ConsentFormLoaded`, `ConsentFormLoadFailed` and
/// `ConsentFormDismissed`, tagged with the token passed here.
pub trait ConsentProvider: Send + Sync {
    /// Refresh the stored consent information
    fn request_info_update(&self, request: &ConsentRequest, token: CorrelationToken)
        -> Result<()>;

    /// Load the consent form
    fn load_form(&self, token: CorrelationToken) -> Result<()>;

    /// Show the loaded consent form
    fn show_form(&self, token: CorrelationToken) -> Result<()>;
}
