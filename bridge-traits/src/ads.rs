//! Rewarded Advertisement SDK Abstraction

use crate::error::Result;
use crate::token::CorrelationToken;

/// Rewarded ad SDK (AdMob or equivalent)
///
/// Every call is fire-and-forget. Load outcomes come back as
/// `HostEvent::AdLoaded` / `HostEvent::AdLoadFailed`, presentation outcomes as
/// `AdShown`, `AdRewardEarned`, `AdShowFailed` and `AdDismissed`, all tagged
/// with the token passed here.
pub trait RewardedAds: Send + Sync {
    /// Initialize the SDK. Called once before the first load.
    fn initialize(&self) -> Result<()>;

    /// Start loading a rewarded ad for the given unit
    fn load(&self, ad_unit_id: &str, token: CorrelationToken) -> Result<()>;

    /// Present the currently loaded ad full screen
    fn show(&self, token: CorrelationToken) -> Result<()>;
}
