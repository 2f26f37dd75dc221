//! # Bridge Configuration Module
//!
//! Provides configuration management for the host bridge.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `BridgeConfig` instance that holds every host capability and setting the
//! bridge needs. It fails fast: a capability required by an enabled feature
//! that is neither injected nor available as a platform default is reported
//! as [`Error::CapabilityMissing`] at build time, never later at first use.
//!
//! ## Required Capabilities
//!
//! - `DocumentPicker` - Always required (export/import)
//! - `RewardedAds` - Required when `enable_ads` is set
//! - `BillingClient` - Required when `enable_billing` is set
//! - `ConsentProvider` - Required when `enable_consent` is set
//!
//! ## Capabilities with platform defaults
//!
//! - `DocumentStore` - desktop default: `std::fs` paths
//! - `BlockingHttpClient` - desktop default: reqwest blocking client
//! - `Clock` - defaults to the system clock
//!
//! When the `desktop-shims` feature is enabled, the `bridge-desktop` defaults
//! are injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::BridgeConfig;
//! use std::sync::Arc;
//!
//! let config = BridgeConfig::builder()
//!     .internal_root("/data/user/0/app/files")
//!     .product_ids(["paid_0", "paid_1"])
//!     .document_picker(Arc::new(HostPicker::new(activity)))
//!     .rewarded_ads(Arc::new(HostAds::new(activity)))
//!     .billing_client(Arc::new(HostBilling::new(activity)))
//!     .consent_provider(Arc::new(HostConsent::new(activity)))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::retry::RetryPolicy;
use bridge_traits::{
    BillingClient, BlockingHttpClient, Clock, ConsentProvider, ConsentRequest, DocumentPicker,
    DocumentStore, RewardedAds, SystemClock,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Rewarded ad unit used when none is configured (the SDK's public test unit).
pub const TEST_AD_UNIT_ID: &str = "ca-app-pub-3940256099942544/5224354917";

/// Upper bound for the event bus buffer.
pub const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Bridge configuration.
///
/// Use [`BridgeConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct BridgeConfig {
    /// Root of the application's internal storage; transfer paths are relative to it
    pub internal_root: PathBuf,

    /// One-time products, in native index order
    pub product_ids: Vec<String>,

    /// Rewarded ad unit identifier
    pub ad_unit_id: String,

    /// Retry policy for failed ad loads
    pub ad_retry: RetryPolicy,

    /// Parameters sent with consent information refreshes
    pub consent_request: ConsentRequest,

    /// Feature flags
    pub features: FeatureFlags,

    /// Event bus buffer size
    pub event_buffer_size: usize,

    pub document_picker: Arc<dyn DocumentPicker>,
    pub document_store: Arc<dyn DocumentStore>,
    pub http_client: Arc<dyn BlockingHttpClient>,
    pub rewarded_ads: Option<Arc<dyn RewardedAds>>,
    pub billing_client: Option<Arc<dyn BillingClient>>,
    pub consent_provider: Option<Arc<dyn ConsentProvider>>,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for BridgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeConfig")
            .field("internal_root", &self.internal_root)
            .field("product_ids", &self.product_ids)
            .field("ad_unit_id", &self.ad_unit_id)
            .field("ad_retry", &self.ad_retry)
            .field("consent_request", &self.consent_request)
            .field("features", &self.features)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("document_picker", &"DocumentPicker { ... }")
            .field("document_store", &"DocumentStore { ... }")
            .field("http_client", &"BlockingHttpClient { ... }")
            .field(
                "rewarded_ads",
                &self.rewarded_ads.as_ref().map(|_| "RewardedAds { ... }"),
            )
            .field(
                "billing_client",
                &self.billing_client.as_ref().map(|_| "BillingClient { ... }"),
            )
            .field(
                "consent_provider",
                &self
                    .consent_provider
                    .as_ref()
                    .map(|_| "ConsentProvider { ... }"),
            )
            .finish()
    }
}

/// Feature flags control which host flows the bridge drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Drive the rewarded ad lifecycle (requires RewardedAds)
    pub enable_ads: bool,

    /// Drive in-app billing (requires BillingClient)
    pub enable_billing: bool,

    /// Drive the privacy consent flow (requires ConsentProvider)
    pub enable_consent: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_ads: true,
            enable_billing: true,
            enable_consent: true,
        }
    }
}

impl FeatureFlags {
    /// Only document transfer and fetch
    pub fn transfers_only() -> Self {
        Self {
            enable_ads: false,
            enable_billing: false,
            enable_consent: false,
        }
    }
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Internal root is not empty
    /// - Product ids are non-empty and unique, and present when billing is on
    /// - Ad unit id is present when ads are on
    /// - Retry policy is consistent
    /// - Event buffer size is within bounds
    /// - Feature flags are backed by the matching capability
    pub fn validate(&self) -> Result<()> {
        if self.internal_root.as_os_str().is_empty() {
            return Err(Error::Config(
                "Internal storage root cannot be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for id in &self.product_ids {
            if id.trim().is_empty() {
                return Err(Error::Config("Product ids cannot be empty".to_string()));
            }
            if !seen.insert(id.as_str()) {
                return Err(Error::Config(format!("Duplicate product id: {}", id)));
            }
        }

        if self.features.enable_billing && self.product_ids.is_empty() {
            return Err(Error::Config(
                "Billing enabled but no product ids configured. \
                 Use .product_ids() or disable billing."
                    .to_string(),
            ));
        }

        if self.features.enable_ads && self.ad_unit_id.trim().is_empty() {
            return Err(Error::Config("Ad unit id cannot be empty".to_string()));
        }

        self.ad_retry.validate()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        if self.features.enable_ads && self.rewarded_ads.is_none() {
            return Err(capability_missing(
                "RewardedAds",
                "Ads enabled but no RewardedAds provided. \
                 Disable the feature or inject the host ad SDK adapter.",
            ));
        }

        if self.features.enable_billing && self.billing_client.is_none() {
            return Err(capability_missing(
                "BillingClient",
                "Billing enabled but no BillingClient provided. \
                 Disable the feature or inject the host billing adapter.",
            ));
        }

        if self.features.enable_consent && self.consent_provider.is_none() {
            return Err(capability_missing(
                "ConsentProvider",
                "Consent enabled but no ConsentProvider provided. \
                 Disable the feature or inject the host consent adapter.",
            ));
        }

        Ok(())
    }
}

fn capability_missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_document_store() -> Result<Arc<dyn DocumentStore>> {
    use bridge_desktop::LocalDocumentStore;

    let store: Arc<dyn DocumentStore> = Arc::new(LocalDocumentStore::new());
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_document_store() -> Result<Arc<dyn DocumentStore>> {
    Err(capability_missing(
        "DocumentStore",
        "DocumentStore implementation is required to stream picked documents. \
         Desktop: ensure the 'desktop-shims' feature is enabled to use the default LocalDocumentStore. \
         Android: inject a ContentResolver-backed store.",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn BlockingHttpClient>> {
    use bridge_desktop::ReqwestBlockingClient;

    let client: Arc<dyn BlockingHttpClient> = Arc::new(ReqwestBlockingClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn BlockingHttpClient>> {
    Err(capability_missing(
        "BlockingHttpClient",
        "BlockingHttpClient implementation is required for blocking fetches. \
         Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestBlockingClient. \
         Android: inject an HttpURLConnection-backed client.",
    ))
}

/// Builder for constructing [`BridgeConfig`] instances.
pub struct BridgeConfigBuilder {
    internal_root: Option<PathBuf>,
    product_ids: Vec<String>,
    ad_unit_id: Option<String>,
    ad_retry: RetryPolicy,
    consent_request: ConsentRequest,
    features: FeatureFlags,
    event_buffer_size: Option<usize>,
    document_picker: Option<Arc<dyn DocumentPicker>>,
    document_store: Option<Arc<dyn DocumentStore>>,
    http_client: Option<Arc<dyn BlockingHttpClient>>,
    rewarded_ads: Option<Arc<dyn RewardedAds>>,
    billing_client: Option<Arc<dyn BillingClient>>,
    consent_provider: Option<Arc<dyn ConsentProvider>>,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for BridgeConfigBuilder {
    fn default() -> Self {
        Self {
            internal_root: None,
            product_ids: Vec::new(),
            ad_unit_id: None,
            ad_retry: RetryPolicy::default(),
            consent_request: ConsentRequest::default(),
            features: FeatureFlags::default(),
            event_buffer_size: None,
            document_picker: None,
            document_store: None,
            http_client: None,
            rewarded_ads: None,
            billing_client: None,
            consent_provider: None,
            clock: None,
        }
    }
}

impl BridgeConfigBuilder {
    /// Sets the application's internal storage root.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::BridgeConfig;
    ///
    /// let builder = BridgeConfig::builder()
    ///     .internal_root("/data/user/0/app/files");
    /// ```
    pub fn internal_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.internal_root = Some(path.into());
        self
    }

    /// Sets the one-time products. Order is significant: the position of an id
    /// is the index the native core uses to buy it and to receive it.
    pub fn product_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.product_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the rewarded ad unit id.
    ///
    /// Default: the SDK test unit ([`TEST_AD_UNIT_ID`])
    pub fn ad_unit_id(mut self, id: impl Into<String>) -> Self {
        self.ad_unit_id = Some(id.into());
        self
    }

    /// Sets the retry policy for failed ad loads.
    ///
    /// Default: retry immediately, forever
    pub fn ad_retry(mut self, policy: RetryPolicy) -> Self {
        self.ad_retry = policy;
        self
    }

    pub fn consent_request(mut self, request: ConsentRequest) -> Self {
        self.consent_request = request;
        self
    }

    pub fn enable_ads(mut self, enabled: bool) -> Self {
        self.features.enable_ads = enabled;
        self
    }

    pub fn enable_billing(mut self, enabled: bool) -> Self {
        self.features.enable_billing = enabled;
        self
    }

    pub fn enable_consent(mut self, enabled: bool) -> Self {
        self.features.enable_consent = enabled;
        self
    }

    /// Sets all feature flags at once.
    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Default: [`DEFAULT_EVENT_BUFFER_SIZE`]
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the document picker implementation (required).
    pub fn document_picker(mut self, picker: Arc<dyn DocumentPicker>) -> Self {
        self.document_picker = Some(picker);
        self
    }

    /// Sets the document store implementation.
    ///
    /// If not provided, the desktop default is used when the `desktop-shims`
    /// feature is enabled.
    pub fn document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.document_store = Some(store);
        self
    }

    /// Sets the blocking HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest) is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn BlockingHttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn rewarded_ads(mut self, ads: Arc<dyn RewardedAds>) -> Self {
        self.rewarded_ads = Some(ads);
        self
    }

    pub fn billing_client(mut self, client: Arc<dyn BillingClient>) -> Self {
        self.billing_client = Some(client);
        self
    }

    pub fn consent_provider(mut self, provider: Arc<dyn ConsentProvider>) -> Self {
        self.consent_provider = Some(provider);
        self
    }

    /// Sets the time source. Default: [`SystemClock`]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `BridgeConfig` instance.
    ///
    /// # Errors
    ///
    /// - `Error::Config` when a value is missing or invalid
    /// - `Error::CapabilityMissing` when a required capability is absent
    pub fn build(self) -> Result<BridgeConfig> {
        let internal_root = self.internal_root.ok_or_else(|| {
            Error::Config(
                "Internal storage root is required. Use .internal_root() to set it.".to_string(),
            )
        })?;

        let document_picker = self.document_picker.ok_or_else(|| {
            capability_missing(
                "DocumentPicker",
                "DocumentPicker implementation is required for export and import. \
                 Inject the host document picker adapter.",
            )
        })?;

        let document_store = match self.document_store {
            Some(store) => store,
            None => provide_default_document_store()?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = BridgeConfig {
            internal_root,
            product_ids: self.product_ids,
            ad_unit_id: self
                .ad_unit_id
                .unwrap_or_else(|| TEST_AD_UNIT_ID.to_string()),
            ad_retry: self.ad_retry,
            consent_request: self.consent_request,
            features: self.features,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            document_picker,
            document_store,
            http_client,
            rewarded_ads: self.rewarded_ads,
            billing_client: self.billing_client,
            consent_provider: self.consent_provider,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        BridgeError, CorrelationToken, DocumentLocation, HttpRequest, HttpResponse,
        PickerRequest, ProductDetails,
    };
    use std::io::{Read, Write};

    struct NoopPicker;

    impl DocumentPicker for NoopPicker {
        fn pick_destination(&self, _request: PickerRequest) -> BridgeResult<()> {
            Ok(())
        }

        fn pick_source(&self, _request: PickerRequest) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct NoopStore;

    impl DocumentStore for NoopStore {
        fn open_read(&self, _location: &DocumentLocation) -> BridgeResult<Box<dyn Read + Send>> {
            Ok(Box::new(std::io::empty()))
        }

        fn open_write(&self, _location: &DocumentLocation) -> BridgeResult<Box<dyn Write + Send>> {
            Ok(Box::new(std::io::sink()))
        }
    }

    struct NoopHttp;

    impl BlockingHttpClient for NoopHttp {
        fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Err(BridgeError::NotAvailable("offline".to_string()))
        }
    }

    struct NoopAds;

    impl RewardedAds for NoopAds {
        fn initialize(&self) -> BridgeResult<()> {
            Ok(())
        }

        fn load(&self, _ad_unit_id: &str, _token: CorrelationToken) -> BridgeResult<()> {
            Ok(())
        }

        fn show(&self, _token: CorrelationToken) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct NoopBilling;

    impl BillingClient for NoopBilling {
        fn start_connection(&self) -> BridgeResult<()> {
            Ok(())
        }

        fn query_products(
            &self,
            _product_ids: &[String],
            _token: CorrelationToken,
        ) -> BridgeResult<()> {
            Ok(())
        }

        fn launch_purchase(
            &self,
            _product: &ProductDetails,
            _token: CorrelationToken,
        ) -> BridgeResult<()> {
            Ok(())
        }

        fn consume(&self, _purchase_token: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct NoopConsent;

    impl ConsentProvider for NoopConsent {
        fn request_info_update(
            &self,
            _request: &ConsentRequest,
            _token: CorrelationToken,
        ) -> BridgeResult<()> {
            Ok(())
        }

        fn load_form(&self, _token: CorrelationToken) -> BridgeResult<()> {
            Ok(())
        }

        fn show_form(&self, _token: CorrelationToken) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn transfer_builder() -> BridgeConfigBuilder {
        BridgeConfig::builder()
            .internal_root("/data/app/files")
            .features(FeatureFlags::transfers_only())
            .document_picker(Arc::new(NoopPicker))
            .document_store(Arc::new(NoopStore))
            .http_client(Arc::new(NoopHttp))
    }

    fn full_builder() -> BridgeConfigBuilder {
        transfer_builder()
            .features(FeatureFlags::default())
            .product_ids(["paid_0", "paid_1"])
            .rewarded_ads(Arc::new(NoopAds))
            .billing_client(Arc::new(NoopBilling))
            .consent_provider(Arc::new(NoopConsent))
    }

    #[test]
    fn test_builder_with_all_capabilities() {
        let config = full_builder().build().unwrap();

        assert_eq!(config.internal_root, PathBuf::from("/data/app/files"));
        assert_eq!(config.product_ids, vec!["paid_0", "paid_1"]);
        assert_eq!(config.ad_unit_id, TEST_AD_UNIT_ID);
        assert_eq!(config.ad_retry, RetryPolicy::immediate());
        assert!(!config.consent_request.tag_for_under_age_of_consent);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(config.features, FeatureFlags::default());
    }

    #[test]
    fn test_builder_requires_internal_root() {
        let result = BridgeConfig::builder()
            .features(FeatureFlags::transfers_only())
            .document_picker(Arc::new(NoopPicker))
            .document_store(Arc::new(NoopStore))
            .http_client(Arc::new(NoopHttp))
            .build();

        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("internal_root")));
    }

    #[test]
    fn test_builder_requires_document_picker() {
        let result = BridgeConfig::builder()
            .internal_root("/data/app/files")
            .features(FeatureFlags::transfers_only())
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { capability, .. }) if capability == "DocumentPicker"
        ));
    }

    #[test]
    fn test_enabled_feature_requires_capability() {
        let result = transfer_builder()
            .enable_ads(true)
            .build();
        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { capability, .. }) if capability == "RewardedAds"
        ));

        let result = transfer_builder()
            .enable_billing(true)
            .product_ids(["paid_0"])
            .build();
        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { capability, .. }) if capability == "BillingClient"
        ));

        let result = transfer_builder().enable_consent(true).build();
        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { capability, .. }) if capability == "ConsentProvider"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_product_ids() {
        let duplicate = full_builder().product_ids(["paid_0", "paid_0"]).build();
        assert!(matches!(duplicate, Err(Error::Config(msg)) if msg.contains("Duplicate")));

        let blank = full_builder().product_ids(["paid_0", " "]).build();
        assert!(matches!(blank, Err(Error::Config(_))));

        let none = full_builder().product_ids(Vec::<String>::new()).build();
        assert!(matches!(none, Err(Error::Config(msg)) if msg.contains("product ids")));
    }

    #[test]
    fn test_validate_rejects_event_buffer_bounds() {
        assert!(full_builder().event_buffer_size(0).build().is_err());
        assert!(full_builder()
            .event_buffer_size(MAX_EVENT_BUFFER_SIZE + 1)
            .build()
            .is_err());
        assert!(full_builder().event_buffer_size(16).build().is_ok());
    }

    #[test]
    fn test_validate_rejects_invalid_retry_policy() {
        let result = full_builder()
            .ad_retry(RetryPolicy::new(10_000, 100))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_custom_settings_are_kept() {
        let config = full_builder()
            .ad_unit_id("ca-app-pub-123/456")
            .ad_retry(RetryPolicy::new(500, 30_000).with_max_attempts(5))
            .consent_request(ConsentRequest {
                tag_for_under_age_of_consent: true,
            })
            .build()
            .unwrap();

        assert_eq!(config.ad_unit_id, "ca-app-pub-123/456");
        assert_eq!(config.ad_retry.max_attempts(), Some(5));
        assert!(config.consent_request.tag_for_under_age_of_consent);
    }

    #[test]
    fn test_debug_hides_capabilities() {
        let config = full_builder().build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(rendered.contains("DocumentPicker { ... }"));
        assert!(rendered.contains("paid_1"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_store_without_desktop_shims() {
        let result = BridgeConfig::builder()
            .internal_root("/data/app/files")
            .features(FeatureFlags::transfers_only())
            .document_picker(Arc::new(NoopPicker))
            .http_client(Arc::new(NoopHttp))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { capability, .. }) if capability == "DocumentStore"
        ));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = BridgeConfig::builder()
            .internal_root(std::env::temp_dir())
            .features(FeatureFlags::transfers_only())
            .document_picker(Arc::new(NoopPicker))
            .build()
            .unwrap();

        assert!(format!("{:?}", config).contains("BlockingHttpClient { ... }"));
    }

    #[cfg(feature = "desktop-shims")]
    #[tokio::test]
    async fn test_build_with_desktop_defaults_inside_runtime() {
        // The reqwest blocking client is created lazily, so building from an
        // async context must not panic.
        let result = BridgeConfig::builder()
            .internal_root(std::env::temp_dir())
            .features(FeatureFlags::transfers_only())
            .document_picker(Arc::new(NoopPicker))
            .build();

        assert!(result.is_ok());
    }
}
