//! # File Transfer Bridge
//!
//! Turns a native "export/import this internal path" request into a host
//! document picker session and streams the bytes once the user has chosen.
//!
//! Each direction is an independent state machine:
//!
//! ```text
//! Idle -> Requested -> AwaitingHostPicker -> {Completed, Aborted, Failed} -> Idle
//! ```
//!
//! Every accepted request ends with exactly one `on_export_done` /
//! `on_import_done` call. A request made while the same direction is pending
//! is rejected with [`CoreBridgeError::Busy`] and produces no callback.

use bridge_traits::{
    CorrelationToken, DocumentLocation, DocumentPicker, DocumentStore, PickerOutcome,
    PickerRequest,
};
use core_runtime::events::{BridgeEvent, EventBus, TransferDirection, TransferEvent};
use core_runtime::logging::strip_path;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::correlation::{CorrelationStore, OperationKind};
use crate::error::{CoreBridgeError, Result};
use crate::native::NativeCore;

const ANY_MIME: &str = "*/*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    Idle,
    Requested,
    AwaitingHostPicker,
}

/// Outcome delivered to the native core, once per transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub success: bool,
    pub user_visible_name: Option<String>,
}

impl TransferResult {
    pub fn completed(user_visible_name: Option<String>) -> Self {
        Self {
            success: true,
            user_visible_name,
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            user_visible_name: None,
        }
    }
}

/// MIME hint for the picker, from the file extension (case-insensitive).
pub fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => ANY_MIME,
    }
}

/// Suggested file name: the last path component.
pub fn default_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub struct FileTransferBridge {
    direction: TransferDirection,
    phase: TransferPhase,
    internal_root: PathBuf,
    picker: Arc<dyn DocumentPicker>,
    store: Arc<dyn DocumentStore>,
    event_bus: EventBus,
}

impl FileTransferBridge {
    pub fn new(
        direction: TransferDirection,
        internal_root: impl Into<PathBuf>,
        picker: Arc<dyn DocumentPicker>,
        store: Arc<dyn DocumentStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            direction,
            phase: TransferPhase::Idle,
            internal_root: internal_root.into(),
            picker,
            store,
            event_bus,
        }
    }

    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub fn phase(&self) -> TransferPhase {
        self.phase
    }

    pub fn kind(&self) -> OperationKind {
        match self.direction {
            TransferDirection::Export => OperationKind::FileExport,
            TransferDirection::Import => OperationKind::FileImport,
        }
    }

    /// Drop an in-flight session without a callback, after a forced reset.
    pub fn abandon(&mut self) {
        self.phase = TransferPhase::Idle;
    }

    /// Resolve a native path against the internal storage root. Leading
    /// separators and `.` are ignored.
    ///
    /// # Errors
    ///
    /// [`CoreBridgeError::InvalidPath`] for `..` or a drive prefix.
    pub fn internal_path(&self, path: &Path) -> Result<PathBuf> {
        let mut resolved = self.internal_root.clone();
        for component in path.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::RootDir | Component::CurDir => {}
                Component::ParentDir | Component::Prefix(_) => {
                    return Err(CoreBridgeError::InvalidPath(path.to_path_buf()));
                }
            }
        }
        Ok(resolved)
    }

    /// Launch the host picker for `path`.
    ///
    /// A synchronous picker failure ends the transfer as failed (one native
    /// callback) and is returned as the error.
    #[instrument(skip_all, fields(direction = %self.direction))]
    pub fn request(
        &mut self,
        correlations: &mut CorrelationStore,
        native: &dyn NativeCore,
        path: &Path,
    ) -> Result<CorrelationToken> {
        let kind = self.kind();
        let internal = match self.internal_path(path) {
            Ok(internal) => internal,
            Err(e) if correlations.is_pending(kind) => return Err(e),
            Err(e) => {
                warn!(error = %e, "Transfer path rejected");
                self.finish(native, TransferResult::failed(), Some(e.to_string()));
                return Err(e);
            }
        };
        let token = correlations.begin_with_resource(kind, &internal)?;
        self.phase = TransferPhase::Requested;

        let file_name = default_file_name(path);
        let request = PickerRequest {
            token,
            mime_type: mime_for(path).to_string(),
            suggested_name: file_name.clone(),
        };

        let launched = match self.direction {
            TransferDirection::Export => self.picker.pick_destination(request),
            TransferDirection::Import => self.picker.pick_source(request),
        };

        match launched {
            Ok(()) => {
                self.phase = TransferPhase::AwaitingHostPicker;
                info!(file = %strip_path(&internal.to_string_lossy()), "Document picker launched");
                let _ = self
                    .event_bus
                    .emit(BridgeEvent::Transfer(TransferEvent::PickerLaunched {
                        direction: self.direction,
                        file_name,
                    }));
                Ok(token)
            }
            Err(e) => {
                warn!(error = %e, "Document picker launch failed");
                let _ = correlations.resolve(kind, token);
                self.finish(native, TransferResult::failed(), Some(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Handle the picker result tagged with `token`.
    ///
    /// A stale token is dropped without any native callback.
    #[instrument(skip_all, fields(direction = %self.direction, token = %token))]
    pub fn on_picked(
        &mut self,
        correlations: &mut CorrelationStore,
        native: &dyn NativeCore,
        token: CorrelationToken,
        outcome: PickerOutcome,
    ) -> Result<TransferResult> {
        let pending = correlations.resolve(self.kind(), token)?;

        let (location, display_name) = match outcome {
            PickerOutcome::Cancelled => {
                info!("Document transfer cancelled by user");
                let result = TransferResult::failed();
                self.finish(native, result.clone(), None);
                return Ok(result);
            }
            PickerOutcome::Chosen {
                location,
                display_name,
            } => (location, display_name),
        };

        let internal = match pending.resource_path {
            Some(path) => path,
            None => {
                let result = TransferResult::failed();
                self.finish(native, result.clone(), Some("No internal path".to_string()));
                return Ok(result);
            }
        };

        let copied = match self.direction {
            TransferDirection::Export => self.export_to(&internal, &location),
            TransferDirection::Import => self.import_from(&location, &internal),
        };

        let result = match copied {
            Ok(bytes) => {
                debug!(bytes, "Document streamed");
                let result = TransferResult::completed(display_name);
                self.finish(native, result.clone(), None);
                result
            }
            Err(e) => {
                warn!(error = %e, "Document streaming failed");
                let result = TransferResult::failed();
                self.finish(native, result.clone(), Some(e.to_string()));
                result
            }
        };

        Ok(result)
    }

    fn export_to(&self, internal: &Path, location: &DocumentLocation) -> Result<u64> {
        let mut reader = BufReader::new(File::open(internal)?);
        let mut writer = self.store.open_write(location)?;
        let bytes = io::copy(&mut reader, &mut writer)?;
        writer.flush()?;
        Ok(bytes)
    }

    fn import_from(&self, location: &DocumentLocation, internal: &Path) -> Result<u64> {
        let mut reader = self.store.open_read(location)?;
        let copied = write_internal(&mut reader, internal);

        if copied.is_err() && internal.exists() {
            if let Err(e) = fs::remove_file(internal) {
                warn!(error = %e, "Failed to remove partial import");
            }
        }

        copied
    }

    fn finish(&mut self, native: &dyn NativeCore, result: TransferResult, failure: Option<String>) {
        let event = if result.success {
            TransferEvent::Completed {
                direction: self.direction,
                display_name: result.user_visible_name.clone(),
            }
        } else if let Some(message) = failure {
            TransferEvent::Failed {
                direction: self.direction,
                message,
            }
        } else {
            TransferEvent::Aborted {
                direction: self.direction,
            }
        };

        self.phase = TransferPhase::Idle;
        match self.direction {
            TransferDirection::Export => {
                native.on_export_done(result.success, result.user_visible_name)
            }
            TransferDirection::Import => {
                native.on_import_done(result.success, result.user_visible_name)
            }
        }
        let _ = self.event_bus.emit(BridgeEvent::Transfer(event));
    }
}

impl std::fmt::Debug for FileTransferBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTransferBridge")
            .field("direction", &self.direction)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

fn write_internal(reader: &mut dyn Read, internal: &Path) -> Result<u64> {
    if let Some(parent) = internal.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(internal)?);
    let bytes = io::copy(reader, &mut writer)?;
    writer.flush()?;
    Ok(bytes)
}
