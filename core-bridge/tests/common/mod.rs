#![allow(dead_code)]

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BillingClient, BlockingHttpClient, BridgeError, ConsentProvider, ConsentRequest,
    CorrelationToken, DocumentLocation, DocumentPicker, DocumentStore, HttpRequest, HttpResponse,
    PickerRequest, ProductDetails, RewardedAds,
};
use core_bridge::{DeferredAction, NativeCore, Scheduler};
use core_runtime::config::{BridgeConfig, BridgeConfigBuilder};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Everything the bridge asked the host to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    PickDestination(PickerRequest),
    PickSource(PickerRequest),
    AdInitialize,
    AdLoad(CorrelationToken),
    AdShow(CorrelationToken),
    BillingConnect,
    QueryProducts(CorrelationToken),
    LaunchPurchase(String, CorrelationToken),
    Consume(String),
    ConsentInfo(CorrelationToken),
    ConsentLoadForm(CorrelationToken),
    ConsentShowForm(CorrelationToken),
    Http(String),
}

/// Host fake implementing every capability, with documents kept under a
/// scratch directory.
pub struct FakeHost {
    pub calls: Mutex<Vec<HostCall>>,
    pub documents: PathBuf,
    pub fail_ad_init: bool,
    pub http_status: u16,
}

impl FakeHost {
    pub fn new(documents: PathBuf) -> Self {
        fs::create_dir_all(&documents).unwrap();
        Self {
            calls: Mutex::new(Vec::new()),
            documents,
            fail_ad_init: false,
            http_status: 200,
        }
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&HostCall) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn document_path(&self, location: &DocumentLocation) -> PathBuf {
        self.documents.join(location.as_str().trim_start_matches("doc://"))
    }
}

impl DocumentPicker for FakeHost {
    fn pick_destination(&self, request: PickerRequest) -> BridgeResult<()> {
        self.record(HostCall::PickDestination(request));
        Ok(())
    }

    fn pick_source(&self, request: PickerRequest) -> BridgeResult<()> {
        self.record(HostCall::PickSource(request));
        Ok(())
    }
}

impl DocumentStore for FakeHost {
    fn open_read(&self, location: &DocumentLocation) -> BridgeResult<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(self.document_path(location))?))
    }

    fn open_write(&self, location: &DocumentLocation) -> BridgeResult<Box<dyn Write + Send>> {
        Ok(Box::new(File::create(self.document_path(location))?))
    }
}

impl BlockingHttpClient for FakeHost {
    fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.record(HostCall::Http(request.url.clone()));
        Ok(HttpResponse {
            status: self.http_status,
            headers: HashMap::new(),
            body: request.body.unwrap_or_default(),
        })
    }
}

impl RewardedAds for FakeHost {
    fn initialize(&self) -> BridgeResult<()> {
        self.record(HostCall::AdInitialize);
        if self.fail_ad_init {
            return Err(BridgeError::NotAvailable("ad sdk".to_string()));
        }
        Ok(())
    }

    fn load(&self, _ad_unit_id: &str, token: CorrelationToken) -> BridgeResult<()> {
        self.record(HostCall::AdLoad(token));
        Ok(())
    }

    fn show(&self, token: CorrelationToken) -> BridgeResult<()> {
        self.record(HostCall::AdShow(token));
        Ok(())
    }
}

impl BillingClient for FakeHost {
    fn start_connection(&self) -> BridgeResult<()> {
        self.record(HostCall::BillingConnect);
        Ok(())
    }

    fn query_products(&self, _product_ids: &[String], token: CorrelationToken) -> BridgeResult<()> {
        self.record(HostCall::QueryProducts(token));
        Ok(())
    }

    fn launch_purchase(&self, product: &ProductDetails, token: CorrelationToken) -> BridgeResult<()> {
        self.record(HostCall::LaunchPurchase(product.product_id.clone(), token));
        Ok(())
    }

    fn consume(&self, purchase_token: &str) -> BridgeResult<()> {
        self.record(HostCall::Consume(purchase_token.to_string()));
        Ok(())
    }
}

impl ConsentProvider for FakeHost {
    fn request_info_update(&self, _request: &ConsentRequest, token: CorrelationToken) -> BridgeResult<()> {
        self.record(HostCall::ConsentInfo(token));
        Ok(())
    }

    fn load_form(&self, token: CorrelationToken) -> BridgeResult<()> {
        self.record(HostCall::ConsentLoadForm(token));
        Ok(())
    }

    fn show_form(&self, token: CorrelationToken) -> BridgeResult<()> {
        self.record(HostCall::ConsentShowForm(token));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    ExportDone(bool, Option<String>),
    ImportDone(bool, Option<String>),
    AdReward,
    Acknowledge(usize),
}

/// Native core fake. Indices listed in `rejected` are not acknowledged.
#[derive(Default)]
pub struct RecordingNative {
    pub calls: Mutex<Vec<NativeCall>>,
    pub rejected: Mutex<Vec<usize>>,
}

impl RecordingNative {
    pub fn calls(&self) -> Vec<NativeCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl NativeCore for RecordingNative {
    fn on_export_done(&self, success: bool, display_name: Option<String>) {
        self.calls
            .lock()
            .unwrap()
            .push(NativeCall::ExportDone(success, display_name));
    }

    fn on_import_done(&self, success: bool, display_name: Option<String>) {
        self.calls
            .lock()
            .unwrap()
            .push(NativeCall::ImportDone(success, display_name));
    }

    fn on_ad_reward(&self) {
        self.calls.lock().unwrap().push(NativeCall::AdReward);
    }

    fn on_purchase_acknowledge(&self, index: usize) -> bool {
        self.calls.lock().unwrap().push(NativeCall::Acknowledge(index));
        !self.rejected.lock().unwrap().contains(&index)
    }
}

#[derive(Default)]
pub struct RecordingScheduler {
    pub scheduled: Mutex<Vec<(Duration, DeferredAction)>>,
}

impl Scheduler for RecordingScheduler {
    fn schedule(&self, delay: Duration, action: DeferredAction) {
        self.scheduled.lock().unwrap().push((delay, action));
    }
}

pub fn scratch_dir(prefix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Builder with every capability backed by `host`.
pub fn config_builder(root: &PathBuf, host: &Arc<FakeHost>) -> BridgeConfigBuilder {
    BridgeConfig::builder()
        .internal_root(root)
        .product_ids(["paid_0", "paid_1"])
        .document_picker(host.clone())
        .document_store(host.clone())
        .http_client(host.clone())
        .rewarded_ads(host.clone())
        .billing_client(host.clone())
        .consent_provider(host.clone())
}
