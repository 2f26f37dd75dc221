//! # Purchase Flow Manager
//!
//! Connects to the host billing service, keeps the product catalog in sync,
//! launches purchases by native index and turns purchase updates into
//! `on_purchase_acknowledge` calls followed by consumption.
//!
//! ## Catalog
//!
//! The configured product ids are ordered; a product's position is its native
//! index. A catalog query succeeds only if every configured id is present.
//! Any omission leaves the loaded catalog empty and billing not ready.
//!
//! ## Purchase delivery
//!
//! Updates arrive independently of launches (the store also redelivers
//! unconsumed purchases). For each `Purchased` purchase every product is
//! acknowledged by the native core; the purchase is consumed only if all of
//! them were. Otherwise it is forgotten, and a redelivery starts from scratch.

use bridge_traits::{
    BillingClient, BillingResponseCode, CorrelationToken, ProductDetails, Purchase, PurchaseState,
};
use core_runtime::events::{BillingEvent, BridgeEvent, EventBus};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::correlation::{CorrelationStore, OperationKind};
use crate::error::{CoreBridgeError, Result};
use crate::native::NativeCore;

/// Configured products and the details last loaded for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCatalog {
    product_ids: Vec<String>,
    loaded: Vec<ProductDetails>,
}

impl ProductCatalog {
    pub fn new(product_ids: Vec<String>) -> Self {
        Self {
            product_ids,
            loaded: Vec::new(),
        }
    }

    pub fn product_ids(&self) -> &[String] {
        &self.product_ids
    }

    /// Native index of `product_id`, if configured.
    pub fn index_of(&self, product_id: &str) -> Option<usize> {
        self.product_ids.iter().position(|id| id == product_id)
    }

    pub fn is_loaded(&self) -> bool {
        !self.product_ids.is_empty() && self.loaded.len() == self.product_ids.len()
    }

    /// Loaded details in native index order.
    pub fn loaded(&self) -> &[ProductDetails] {
        &self.loaded
    }

    pub fn get(&self, index: usize) -> Option<&ProductDetails> {
        self.loaded.get(index)
    }

    /// Configured ids absent from `received`, in configured order.
    pub fn missing(&self, received: &[ProductDetails]) -> Vec<String> {
        let received: HashSet<&str> = received.iter().map(|p| p.product_id.as_str()).collect();
        self.product_ids
            .iter()
            .filter(|id| !received.contains(id.as_str()))
            .cloned()
            .collect()
    }

    /// Replace the loaded catalog wholesale.
    ///
    /// Any missing configured id clears the catalog and is returned as the
    /// error. Unconfigured products are ignored.
    pub fn replace(&mut self, received: Vec<ProductDetails>) -> std::result::Result<(), Vec<String>> {
        let missing = self.missing(&received);
        if !missing.is_empty() {
            self.loaded.clear();
            return Err(missing);
        }

        let mut by_id: HashMap<String, ProductDetails> = received
            .into_iter()
            .map(|product| (product.product_id.clone(), product))
            .collect();

        self.loaded = self
            .product_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.loaded.clear();
    }
}

/// A purchase whose consumption is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRecord {
    pub purchase_token: String,
    pub product_ids: Vec<String>,
    pub state: PurchaseState,
}

pub struct PurchaseFlowManager {
    client: Arc<dyn BillingClient>,
    catalog: ProductCatalog,
    connected: bool,
    consuming: HashMap<String, PurchaseRecord>,
    event_bus: EventBus,
}

impl PurchaseFlowManager {
    pub fn new(client: Arc<dyn BillingClient>, product_ids: Vec<String>, event_bus: EventBus) -> Self {
        Self {
            client,
            catalog: ProductCatalog::new(product_ids),
            connected: false,
            consuming: HashMap::new(),
            event_bus,
        }
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_ready(&self) -> bool {
        self.catalog.is_loaded()
    }

    pub fn consuming(&self) -> impl Iterator<Item = &PurchaseRecord> {
        self.consuming.values()
    }

    pub fn connect(&mut self) -> Result<()> {
        debug!("Connecting to billing service");
        self.client.start_connection()?;
        Ok(())
    }

    pub fn on_setup_finished(
        &mut self,
        correlations: &mut CorrelationStore,
        response: BillingResponseCode,
    ) -> Result<()> {
        if !response.is_ok() {
            error!(response = ?response, "Billing setup failed");
            self.connected = false;
            let _ = self
                .event_bus
                .emit(BridgeEvent::Billing(BillingEvent::SetupFailed { response }));
            return Ok(());
        }

        info!("Billing service connected");
        self.connected = true;
        let _ = self.event_bus.emit(BridgeEvent::Billing(BillingEvent::Connected));

        // A query sent over the previous connection may never be answered.
        if correlations.abandon(OperationKind::CatalogSync).is_some() {
            debug!("Superseding catalog query from previous connection");
        }
        self.sync_catalog(correlations)
    }

    /// Mark the service lost and reconnect. The loaded catalog is kept.
    pub fn on_disconnected(&mut self) -> Result<()> {
        info!("Billing service disconnected, reconnecting");
        self.connected = false;
        let _ = self
            .event_bus
            .emit(BridgeEvent::Billing(BillingEvent::Disconnected));
        self.connect()
    }

    pub fn sync_catalog(&mut self, correlations: &mut CorrelationStore) -> Result<()> {
        let token = correlations.begin(OperationKind::CatalogSync)?;

        if let Err(e) = self.client.query_products(self.catalog.product_ids(), token) {
            warn!(error = %e, "Product query rejected by host");
            let _ = correlations.resolve(OperationKind::CatalogSync, token);
            return Err(e.into());
        }

        debug!(products = self.catalog.product_ids().len(), "Product query issued");
        Ok(())
    }

    pub fn on_product_details(
        &mut self,
        correlations: &mut CorrelationStore,
        token: CorrelationToken,
        response: BillingResponseCode,
        products: Vec<ProductDetails>,
    ) -> Result<()> {
        correlations.resolve(OperationKind::CatalogSync, token)?;

        if !response.is_ok() {
            error!(response = ?response, "Product query failed");
            return Ok(());
        }

        match self.catalog.replace(products) {
            Ok(()) => {
                info!(products = self.catalog.loaded().len(), "Product catalog loaded");
                let _ = self
                    .event_bus
                    .emit(BridgeEvent::Billing(BillingEvent::CatalogLoaded {
                        products: self.catalog.loaded().len(),
                    }));
            }
            Err(missing) => {
                error!(missing = ?missing, "Product catalog incomplete");
                let _ = self
                    .event_bus
                    .emit(BridgeEvent::Billing(BillingEvent::CatalogIncomplete { missing }));
            }
        }
        Ok(())
    }

    /// Launch the purchase flow for the product at `index`.
    ///
    /// # Errors
    ///
    /// [`CoreBridgeError::NotReady`] when the catalog is not loaded or the
    /// index is out of range; the host is not contacted.
    #[instrument(skip(self, correlations))]
    pub fn buy(&mut self, correlations: &mut CorrelationStore, index: usize) -> Result<()> {
        if !self.catalog.is_loaded() {
            warn!("Purchase requested before catalog loaded");
            return Err(CoreBridgeError::NotReady("catalog not loaded".to_string()));
        }

        let product = match self.catalog.get(index) {
            Some(product) => product.clone(),
            None => {
                warn!("Purchase requested for unknown product index");
                return Err(CoreBridgeError::NotReady(format!(
                    "no product at index {}",
                    index
                )));
            }
        };

        let token = correlations.begin(OperationKind::PurchaseFlow)?;
        if let Err(e) = self.client.launch_purchase(&product, token) {
            error!(error = %e, "Failed to launch purchase flow");
            let _ = correlations.resolve(OperationKind::PurchaseFlow, token);
            return Err(e.into());
        }

        info!(product_id = %product.product_id, "Purchase flow launched");
        let _ = self
            .event_bus
            .emit(BridgeEvent::Billing(BillingEvent::PurchaseLaunched { index }));
        Ok(())
    }

    /// Process a purchases update.
    ///
    /// An `origin` token ends the launch it belongs to. A stale origin is
    /// reported but the purchases are still processed, since they are real
    /// store state.
    #[instrument(skip_all, fields(purchases = purchases.len()))]
    pub fn on_purchases_updated(
        &mut self,
        correlations: &mut CorrelationStore,
        native: &dyn NativeCore,
        origin: Option<CorrelationToken>,
        response: BillingResponseCode,
        purchases: Vec<Purchase>,
    ) -> Result<()> {
        if let Some(origin) = origin {
            let _ = correlations.resolve(OperationKind::PurchaseFlow, origin);
        }

        if !response.is_ok() {
            warn!(response = ?response, "Purchase update failed");
            return Ok(());
        }

        for purchase in purchases {
            self.handle_purchase(native, purchase);
        }
        Ok(())
    }

    fn handle_purchase(&mut self, native: &dyn NativeCore, purchase: Purchase) {
        if purchase.state != PurchaseState::Purchased {
            debug!(state = ?purchase.state, "Ignoring purchase that is not completed");
            return;
        }

        if self.consuming.contains_key(&purchase.purchase_token) {
            debug!("Purchase already being consumed, skipping redelivery");
            return;
        }

        let mut rejected = Vec::new();
        for product_id in &purchase.product_ids {
            let acknowledged = match self.catalog.index_of(product_id) {
                Some(index) => native.on_purchase_acknowledge(index),
                None => {
                    warn!(product_id = %product_id, "Purchased product is not configured");
                    false
                }
            };
            if !acknowledged {
                rejected.push(product_id.clone());
            }
        }

        if !rejected.is_empty() {
            warn!(rejected = ?rejected, "Purchase not fully acknowledged, not consuming");
            let _ = self
                .event_bus
                .emit(BridgeEvent::Billing(BillingEvent::PartiallyAcknowledged {
                    product_ids: purchase.product_ids,
                    rejected,
                }));
            return;
        }

        let purchase_token = purchase.purchase_token.clone();
        let product_ids = purchase.product_ids.clone();
        self.consuming.insert(
            purchase_token.clone(),
            PurchaseRecord {
                purchase_token: purchase.purchase_token,
                product_ids: purchase.product_ids,
                state: purchase.state,
            },
        );

        if let Err(e) = self.client.consume(&purchase_token) {
            error!(error = %e, "Failed to start consumption");
            self.consuming.remove(&purchase_token);
            let _ = self
                .event_bus
                .emit(BridgeEvent::Billing(BillingEvent::ConsumeFailed {
                    response: BillingResponseCode::Error,
                }));
            return;
        }

        info!(products = product_ids.len(), "Purchase acknowledged, consuming");
        let _ = self
            .event_bus
            .emit(BridgeEvent::Billing(BillingEvent::Acknowledged { product_ids }));
    }

    pub fn on_consume_finished(&mut self, purchase_token: &str, response: BillingResponseCode) -> Result<()> {
        let record = match self.consuming.remove(purchase_token) {
            Some(record) => record,
            None => {
                debug!("Consume result for unknown purchase");
                return Ok(());
            }
        };

        if response.is_ok() {
            info!("Purchase consumed");
            let _ = self
                .event_bus
                .emit(BridgeEvent::Billing(BillingEvent::Consumed {
                    product_ids: record.product_ids,
                }));
        } else {
            error!(response = ?response, "Purchase consumption failed");
            let _ = self
                .event_bus
                .emit(BridgeEvent::Billing(BillingEvent::ConsumeFailed { response }));
        }
        Ok(())
    }
}

impl std::fmt::Debug for PurchaseFlowManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurchaseFlowManager")
            .field("catalog", &self.catalog)
            .field("connected", &self.connected)
            .field("consuming", &self.consuming.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::{BridgeError, SystemClock};
    use mockall::mock;
    use std::sync::Mutex;

    mock! {
        Billing {}

        impl BillingClient for Billing {
            fn start_connection(&self) -> bridge_traits::error::Result<()>;
            fn query_products(&self, product_ids: &[String], token: CorrelationToken) -> bridge_traits::error::Result<()>;
            fn launch_purchase(&self, product: &ProductDetails, token: CorrelationToken) -> bridge_traits::error::Result<()>;
            fn consume(&self, purchase_token: &str) -> bridge_traits::error::Result<()>;
        }
    }

    /// Acknowledges every index except the rejected ones.
    struct Granting {
        rejected: Vec<usize>,
        calls: Mutex<Vec<usize>>,
    }

    impl Granting {
        fn all() -> Self {
            Self::rejecting(vec![])
        }

        fn rejecting(rejected: Vec<usize>) -> Self {
            Self {
                rejected,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl NativeCore for Granting {
        fn on_export_done(&self, _success: bool, _display_name: Option<String>) {}
        fn on_import_done(&self, _success: bool, _display_name: Option<String>) {}
        fn on_ad_reward(&self) {}

        fn on_purchase_acknowledge(&self, index: usize) -> bool {
            self.calls.lock().unwrap().push(index);
            !self.rejected.contains(&index)
        }
    }

    fn ids() -> Vec<String> {
        vec!["paid_0".to_string(), "paid_1".to_string(), "paid_2".to_string()]
    }

    fn details(ids: &[&str]) -> Vec<ProductDetails> {
        ids.iter().map(|id| ProductDetails::new(*id)).collect()
    }

    fn purchased(token: &str, products: &[&str]) -> Purchase {
        Purchase {
            purchase_token: token.to_string(),
            product_ids: products.iter().map(|p| p.to_string()).collect(),
            state: PurchaseState::Purchased,
        }
    }

    fn correlations() -> CorrelationStore {
        CorrelationStore::new(Arc::new(SystemClock), EventBus::new(16))
    }

    fn loaded_manager(client: MockBilling, store: &mut CorrelationStore) -> PurchaseFlowManager {
        let mut manager = PurchaseFlowManager::new(Arc::new(client), ids(), EventBus::new(16));
        manager.on_setup_finished(store, BillingResponseCode::Ok).unwrap();
        let token = store.pending(OperationKind::CatalogSync).unwrap().token;
        manager
            .on_product_details(
                store,
                token,
                BillingResponseCode::Ok,
                details(&["paid_2", "paid_0", "paid_1"]),
            )
            .unwrap();
        manager
    }

    #[test]
    fn test_catalog_orders_by_native_index_and_ignores_extras() {
        let mut catalog = ProductCatalog::new(ids());
        catalog
            .replace(details(&["bonus", "paid_1", "paid_2", "paid_0"]))
            .unwrap();

        let loaded: Vec<_> = catalog.loaded().iter().map(|p| p.product_id.as_str()).collect();
        assert_eq!(loaded, vec!["paid_0", "paid_1", "paid_2"]);
        assert!(catalog.is_loaded());
    }

    #[test]
    fn test_catalog_missing_product_clears_everything() {
        let mut catalog = ProductCatalog::new(ids());
        catalog.replace(details(&["paid_0", "paid_1", "paid_2"])).unwrap();

        let missing = catalog.replace(details(&["paid_0", "paid_2"])).unwrap_err();

        assert_eq!(missing, vec!["paid_1".to_string()]);
        assert!(catalog.loaded().is_empty());
        assert!(!catalog.is_loaded());
    }

    #[test]
    fn test_setup_success_syncs_catalog() {
        let mut client = MockBilling::new();
        client
            .expect_query_products()
            .withf(|ids, _| ids.len() == 3 && ids[0] == "paid_0")
            .times(1)
            .returning(|_, _| Ok(()));
        let mut store = correlations();

        let manager = loaded_manager(client, &mut store);

        assert!(manager.is_connected());
        assert!(manager.is_ready());
    }

    #[test]
    fn test_incomplete_catalog_is_not_ready() {
        let mut client = MockBilling::new();
        client.expect_query_products().returning(|_, _| Ok(()));
        let mut store = correlations();
        let mut manager = PurchaseFlowManager::new(Arc::new(client), ids(), EventBus::new(16));

        manager.on_setup_finished(&mut store, BillingResponseCode::Ok).unwrap();
        let token = store.pending(OperationKind::CatalogSync).unwrap().token;
        manager
            .on_product_details(&mut store, token, BillingResponseCode::Ok, details(&["paid_0", "paid_1"]))
            .unwrap();

        assert!(!manager.is_ready());
        assert!(manager.catalog().loaded().is_empty());
    }

    #[test]
    fn test_reconnect_supersedes_unanswered_catalog_query() {
        let mut client = MockBilling::new();
        client.expect_start_connection().times(1).returning(|| Ok(()));
        client.expect_query_products().times(2).returning(|_, _| Ok(()));
        let mut store = correlations();
        let mut manager = PurchaseFlowManager::new(Arc::new(client), ids(), EventBus::new(16));

        manager.on_setup_finished(&mut store, BillingResponseCode::Ok).unwrap();
        let first = store.pending(OperationKind::CatalogSync).unwrap().token;
        manager.on_disconnected().unwrap();
        manager.on_setup_finished(&mut store, BillingResponseCode::Ok).unwrap();
        let second = store.pending(OperationKind::CatalogSync).unwrap().token;
        assert_ne!(first, second);

        let late = manager.on_product_details(
            &mut store,
            first,
            BillingResponseCode::ServiceDisconnected,
            vec![],
        );
        assert!(matches!(late, Err(CoreBridgeError::Stale { .. })));
        assert!(store.matches(OperationKind::CatalogSync, second));

        manager
            .on_product_details(&mut store, second, BillingResponseCode::Ok, details(&["paid_0", "paid_1", "paid_2"]))
            .unwrap();
        assert!(manager.is_ready());
    }

    #[test]
    fn test_failed_setup_does_not_query() {
        let mut client = MockBilling::new();
        client.expect_query_products().times(0);
        let mut store = correlations();
        let mut manager = PurchaseFlowManager::new(Arc::new(client), ids(), EventBus::new(16));

        manager
            .on_setup_finished(&mut store, BillingResponseCode::ServiceUnavailable)
            .unwrap();

        assert!(!manager.is_connected());
        assert!(!manager.is_ready());
    }

    #[test]
    fn test_buy_rejected_without_host_call() {
        let mut client = MockBilling::new();
        client.expect_query_products().returning(|_, _| Ok(()));
        client.expect_launch_purchase().times(0);
        let mut store = correlations();
        let mut unloaded = PurchaseFlowManager::new(Arc::new(MockBilling::new()), ids(), EventBus::new(4));

        assert!(matches!(unloaded.buy(&mut store, 0), Err(CoreBridgeError::NotReady(_))));

        let mut manager = loaded_manager(client, &mut store);
        assert!(matches!(manager.buy(&mut store, 3), Err(CoreBridgeError::NotReady(_))));
    }

    #[test]
    fn test_buy_launches_indexed_product() {
        let mut client = MockBilling::new();
        client.expect_query_products().returning(|_, _| Ok(()));
        client
            .expect_launch_purchase()
            .withf(|product, _| product.product_id == "paid_1")
            .times(1)
            .returning(|_, _| Ok(()));
        let mut store = correlations();
        let mut manager = loaded_manager(client, &mut store);

        manager.buy(&mut store, 1).unwrap();

        assert!(store.is_pending(OperationKind::PurchaseFlow));
        assert!(matches!(manager.buy(&mut store, 1), Err(CoreBridgeError::Busy { .. })));
    }

    #[test]
    fn test_buy_launch_failure_frees_slot() {
        let mut client = MockBilling::new();
        client.expect_query_products().returning(|_, _| Ok(()));
        client
            .expect_launch_purchase()
            .returning(|_, _| Err(BridgeError::OperationFailed("no activity".to_string())));
        let mut store = correlations();
        let mut manager = loaded_manager(client, &mut store);

        assert!(manager.buy(&mut store, 0).is_err());
        assert!(!store.is_pending(OperationKind::PurchaseFlow));
    }

    #[test]
    fn test_fully_acknowledged_purchase_is_consumed() {
        let mut client = MockBilling::new();
        client.expect_query_products().returning(|_, _| Ok(()));
        client
            .expect_consume()
            .withf(|token| token.to_string() == "tok-1")
            .times(1)
            .returning(|_| Ok(()));
        let mut store = correlations();
        let native = Granting::all();
        let mut manager = loaded_manager(client, &mut store);

        manager
            .on_purchases_updated(
                &mut store,
                &native,
                None,
                BillingResponseCode::Ok,
                vec![purchased("tok-1", &["paid_0", "paid_2"])],
            )
            .unwrap();

        assert_eq!(*native.calls.lock().unwrap(), vec![0, 2]);
        assert_eq!(manager.consuming().count(), 1);

        manager.on_consume_finished("tok-1", BillingResponseCode::Ok).unwrap();
        assert_eq!(manager.consuming().count(), 0);
    }

    #[test]
    fn test_partial_acknowledgment_blocks_consumption_and_redelivery_restarts() {
        let mut client = MockBilling::new();
        client.expect_query_products().returning(|_, _| Ok(()));
        client.expect_consume().times(0);
        let mut store = correlations();
        let native = Granting::rejecting(vec![1]);
        let mut manager = loaded_manager(client, &mut store);
        let purchase = purchased("tok-2", &["paid_0", "paid_1"]);

        for _ in 0..2 {
            manager
                .on_purchases_updated(
                    &mut store,
                    &native,
                    None,
                    BillingResponseCode::Ok,
                    vec![purchase.clone()],
                )
                .unwrap();
        }

        // Every product is asked each time, no short-circuit
        assert_eq!(*native.calls.lock().unwrap(), vec![0, 1, 0, 1]);
        assert_eq!(manager.consuming().count(), 0);
    }

    #[test]
    fn test_unknown_product_counts_as_unacknowledged() {
        let mut client = MockBilling::new();
        client.expect_query_products().returning(|_, _| Ok(()));
        client.expect_consume().times(0);
        let mut store = correlations();
        let native = Granting::all();
        let mut manager = loaded_manager(client, &mut store);

        manager
            .on_purchases_updated(
                &mut store,
                &native,
                None,
                BillingResponseCode::Ok,
                vec![purchased("tok-3", &["retired_sku", "paid_0"])],
            )
            .unwrap();

        assert_eq!(*native.calls.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_pending_and_failed_updates_are_ignored() {
        let mut client = MockBilling::new();
        client.expect_query_products().returning(|_, _| Ok(()));
        client.expect_consume().times(0);
        let mut store = correlations();
        let native = Granting::all();
        let mut manager = loaded_manager(client, &mut store);

        let mut pending = purchased("tok-4", &["paid_0"]);
        pending.state = PurchaseState::Pending;
        manager
            .on_purchases_updated(&mut store, &native, None, BillingResponseCode::Ok, vec![pending])
            .unwrap();
        manager
            .on_purchases_updated(
                &mut store,
                &native,
                None,
                BillingResponseCode::UserCanceled,
                vec![purchased("tok-5", &["paid_0"])],
            )
            .unwrap();

        assert!(native.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_redelivery_while_consuming_is_skipped() {
        let mut client = MockBilling::new();
        client.expect_query_products().returning(|_, _| Ok(()));
        client.expect_consume().times(1).returning(|_| Ok(()));
        let mut store = correlations();
        let native = Granting::all();
        let mut manager = loaded_manager(client, &mut store);
        let purchase = purchased("tok-6", &["paid_1"]);

        for _ in 0..2 {
            manager
                .on_purchases_updated(
                    &mut store,
                    &native,
                    None,
                    BillingResponseCode::Ok,
                    vec![purchase.clone()],
                )
                .unwrap();
        }

        assert_eq!(*native.calls.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_update_with_origin_ends_launch() {
        let mut client = MockBilling::new();
        client.expect_query_products().returning(|_, _| Ok(()));
        client.expect_launch_purchase().returning(|_, _| Ok(()));
        let mut store = correlations();
        let native = Granting::all();
        let mut manager = loaded_manager(client, &mut store);

        manager.buy(&mut store, 0).unwrap();
        let origin = store.pending(OperationKind::PurchaseFlow).unwrap().token;
        manager
            .on_purchases_updated(&mut store, &native, Some(origin), BillingResponseCode::UserCanceled, vec![])
            .unwrap();

        assert!(!store.is_pending(OperationKind::PurchaseFlow));
    }

    #[test]
    fn test_disconnect_reconnects_and_keeps_catalog() {
        let mut client = MockBilling::new();
        client.expect_query_products().returning(|_, _| Ok(()));
        client.expect_start_connection().times(1).returning(|| Ok(()));
        let mut store = correlations();
        let mut manager = loaded_manager(client, &mut store);

        manager.on_disconnected().unwrap();

        assert!(!manager.is_connected());
        assert!(manager.is_ready());
    }
}
