//! Bridge service façade.
//!
//! Runs a [`BridgeContext`] on a dedicated `bridge-control` thread and hands
//! out cloneable [`BridgeHandle`]s to the native core and to the host.
//!
//! - Native requests and host events are queued on an unbounded channel and
//!   applied one at a time on the control thread, so bridge state has a
//!   single writer and no locks.
//! - After every message a [`BridgeSnapshot`] is published through a `watch`
//!   channel; the `is_*_ready` queries read it from any thread.
//! - [`BridgeHandle::fetch_blocking`] runs on the calling thread and never
//!   touches the control thread.
//!
//! Desktop hosts typically enable the `desktop-shims` feature so the default
//! document store and HTTP client from `bridge-desktop` are injected.
//!
//! ```ignore
//! use core_service::BridgeService;
//!
//! let service = BridgeService::spawn(config, native)?;
//! let handle = service.handle();
//! handle.request_export("saves/slot1.dat")?;
//! if handle.is_ad_ready() {
//!     handle.request_show_ad()?;
//! }
//! ```

pub mod error;

pub use error::{Result, ServiceError};

pub use core_bridge::{BridgeSnapshot, NativeCore, NativeRequest};

use bridge_traits::HostEvent;
use bytes::Bytes;
use core_bridge::{BlockingFetch, BridgeContext, ControlMessage, DeferredAction, Scheduler};
use core_runtime::config::BridgeConfig;
use core_runtime::events::{EventBus, EventStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

const CONTROL_THREAD_NAME: &str = "bridge-control";

enum ServiceCommand {
    Control(ControlMessage),
    Reset,
    /// Replies once every earlier command has been applied
    Barrier(oneshot::Sender<()>),
    Shutdown,
}

/// Re-enters deferred actions through the control channel after a delay.
struct ServiceScheduler {
    sender: mpsc::UnboundedSender<ServiceCommand>,
}

impl Scheduler for ServiceScheduler {
    fn schedule(&self, delay: Duration, action: DeferredAction) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(?action, "No control runtime, dropping deferred action");
                return;
            }
        };

        let sender = self.sender.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sender.send(ServiceCommand::Control(ControlMessage::Deferred(action)));
        });
    }
}

/// Owner of the control thread.
pub struct BridgeService {
    handle: BridgeHandle,
    thread: Option<JoinHandle<()>>,
}

impl BridgeService {
    /// Build the bridge from `config` and start the control thread.
    ///
    /// The host pipelines (consent, ads, billing) are started on the control
    /// thread before any queued message is applied.
    pub fn spawn(config: BridgeConfig, native: Arc<dyn NativeCore>) -> Result<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let scheduler = Arc::new(ServiceScheduler {
            sender: sender.clone(),
        });

        let mut context = BridgeContext::new(config, native, scheduler)?;
        let (snapshot_tx, snapshot_rx) = watch::channel(context.snapshot());

        let handle = BridgeHandle {
            sender,
            snapshot: snapshot_rx,
            fetch: context.fetcher(),
            event_bus: context.event_bus().clone(),
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;

        let thread = std::thread::Builder::new()
            .name(CONTROL_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    context.start();
                    let _ = snapshot_tx.send(context.snapshot());

                    while let Some(command) = receiver.recv().await {
                        match command {
                            ServiceCommand::Control(message) => {
                                let name = message.name();
                                if let Err(e) = context.handle(message) {
                                    debug!(message = name, error = %e, "Control message not applied");
                                }
                            }
                            ServiceCommand::Reset => {
                                context.reset();
                            }
                            ServiceCommand::Barrier(reply) => {
                                let _ = reply.send(());
                            }
                            ServiceCommand::Shutdown => break,
                        }
                        let _ = snapshot_tx.send(context.snapshot());
                    }

                    info!("Bridge control loop stopped");
                });
            })?;

        info!("Bridge service started");
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> BridgeHandle {
        self.handle.clone()
    }

    /// Stop the control thread and wait for it. Pending operations are
    /// abandoned.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let thread = match self.thread.take() {
            Some(thread) => thread,
            None => return Ok(()),
        };

        let _ = self.handle.sender.send(ServiceCommand::Shutdown);
        thread
            .join()
            .map_err(|_| ServiceError::ControlThreadPanicked)
    }
}

impl Drop for BridgeService {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "Bridge service did not stop cleanly");
        }
    }
}

/// Entry point for the native core and the host. Cheap to clone, usable from
/// any thread.
#[derive(Clone)]
pub struct BridgeHandle {
    sender: mpsc::UnboundedSender<ServiceCommand>,
    snapshot: watch::Receiver<BridgeSnapshot>,
    fetch: BlockingFetch,
    event_bus: EventBus,
}

impl BridgeHandle {
    fn send(&self, command: ServiceCommand) -> Result<()> {
        self.sender.send(command).map_err(|_| ServiceError::Stopped)
    }

    fn send_native(&self, request: NativeRequest) -> Result<()> {
        self.send(ServiceCommand::Control(ControlMessage::Native(request)))
    }

    /// Export an internal file; answered by `on_export_done`.
    pub fn request_export(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.send_native(NativeRequest::RequestExport { path: path.into() })
    }

    /// Import into an internal file; answered by `on_import_done`.
    pub fn request_import(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.send_native(NativeRequest::RequestImport { path: path.into() })
    }

    /// Synchronous fetch on the calling thread. `None` on any failure.
    ///
    /// Must not be called from inside an async runtime.
    pub fn fetch_blocking(&self, url: &str, body: Option<&[u8]>) -> Option<Bytes> {
        self.fetch.fetch(url, body).ok()
    }

    pub fn is_ad_ready(&self) -> bool {
        self.snapshot.borrow().ad_ready
    }

    pub fn request_show_ad(&self) -> Result<()> {
        self.send_native(NativeRequest::ShowAd)
    }

    pub fn is_billing_ready(&self) -> bool {
        self.snapshot.borrow().billing_ready
    }

    pub fn request_buy(&self, index: usize) -> Result<()> {
        self.send_native(NativeRequest::Buy { index })
    }

    pub fn is_consent_form_ready(&self) -> bool {
        self.snapshot.borrow().consent_form_ready
    }

    pub fn request_show_consent_form(&self) -> Result<()> {
        self.send_native(NativeRequest::ShowConsentForm)
    }

    /// Deliver a host callback result.
    pub fn post_host_event(&self, event: HostEvent) -> Result<()> {
        self.send(ServiceCommand::Control(ControlMessage::Host(event)))
    }

    /// Request an ad load, e.g. after retries were exhausted.
    pub fn reload_ad(&self) -> Result<()> {
        self.send(ServiceCommand::Control(ControlMessage::Deferred(
            DeferredAction::ReloadAd,
        )))
    }

    /// Abandon every pending operation (host teardown).
    pub fn reset(&self) -> Result<()> {
        self.send(ServiceCommand::Reset)
    }

    pub fn snapshot(&self) -> BridgeSnapshot {
        *self.snapshot.borrow()
    }

    /// Observe bridge events from now on. Past events are not replayed.
    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// Block until every message sent before this call has been applied.
    ///
    /// Must not be called from inside an async runtime.
    pub fn flush(&self) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.send(ServiceCommand::Barrier(reply))?;
        done.blocking_recv().map_err(|_| ServiceError::Stopped)
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }
}

impl std::fmt::Debug for BridgeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeHandle")
            .field("snapshot", &*self.snapshot.borrow())
            .field("running", &self.is_running())
            .finish()
    }
}
