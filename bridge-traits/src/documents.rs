//! Document Picker and Document Stream Abstractions
//!
//! The host owns the document UI (Storage Access Framework on Android, a file
//! dialog on desktop). The core only asks for a location and later opens byte
//! streams on whatever the user chose.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};

use crate::error::Result;
use crate::token::CorrelationToken;

/// Opaque host-side document location (a content URI, a file path, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentLocation(String);

impl DocumentLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameters for a picker launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerRequest {
    /// Token the host must echo back in `HostEvent::DocumentPicked`
    pub token: CorrelationToken,
    /// Best-effort MIME hint (`*/*` when unknown)
    pub mime_type: String,
    /// Filename proposed to the user
    pub suggested_name: String,
}

/// What the user did with the picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickerOutcome {
    /// The user chose a location
    Chosen {
        location: DocumentLocation,
        /// Name the user sees for the document, when the host can resolve it
        display_name: Option<String>,
    },
    /// The user dismissed the picker
    Cancelled,
}

/// Host document picker
///
/// Both calls return as soon as the picker UI has been launched. The outcome is
/// reported later through `HostEvent::DocumentPicked` carrying
/// `request.token`. An `Err` means the picker could not be launched at all.
pub trait DocumentPicker: Send + Sync {
    /// Ask the user where a new document should be created
    fn pick_destination(&self, request: PickerRequest) -> Result<()>;

    /// Ask the user for an existing document to read
    fn pick_source(&self, request: PickerRequest) -> Result<()>;
}

/// Byte stream access to host document locations.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::documents::{DocumentLocation, DocumentStore};
///
/// fn touch(store: &dyn DocumentStore, location: &DocumentLocation) -> Result<()> {
///     let mut writer = store.open_write(location)?;
///     writer.flush()?;
///     Ok(())
/// }
/// ```
pub trait DocumentStore: Send + Sync {
    /// Open a location for reading
    fn open_read(&self, location: &DocumentLocation) -> Result<Box<dyn Read + Send>>;

    /// Open a location for writing, truncating any previous content
    fn open_write(&self, location: &DocumentLocation) -> Result<Box<dyn Write + Send>>;
}
