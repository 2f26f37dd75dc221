use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Callbacks into the native core.
///
/// Invoked only from the control thread. Transfer callbacks fire exactly once
/// per accepted request; busy rejections produce no callback.
pub trait NativeCore: Send + Sync {
    fn on_export_done(&self, success: bool, display_name: Option<String>);

    fn on_import_done(&self, success: bool, display_name: Option<String>);

    /// The user earned the reward of the ad being shown.
    fn on_ad_reward(&self);

    /// Grant the product at `index`. Returning `false` blocks consumption of
    /// the whole purchase.
    fn on_purchase_acknowledge(&self, index: usize) -> bool;
}

/// Requests issued by the native core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request")]
pub enum NativeRequest {
    /// Path is relative to the internal storage root.
    RequestExport { path: PathBuf },
    RequestImport { path: PathBuf },
    ShowAd,
    Buy { index: usize },
    ShowConsentForm,
}

impl NativeRequest {
    pub fn name(&self) -> &'static str {
        match self {
            NativeRequest::RequestExport { .. } => "request_export",
            NativeRequest::RequestImport { .. } => "request_import",
            NativeRequest::ShowAd => "request_show_ad",
            NativeRequest::Buy { .. } => "request_buy",
            NativeRequest::ShowConsentForm => "request_show_consent_form",
        }
    }
}
