use bridge_traits::BridgeError;
use thiserror::Error;

use crate::correlation::OperationKind;

#[derive(Error, Debug)]
pub enum CoreBridgeError {
    #[error("Operation already pending: {kind}")]
    Busy { kind: OperationKind },

    #[error("Stale host result for {kind}")]
    Stale { kind: OperationKind },

    #[error("Not ready: {0}")]
    NotReady(String),

    /// Carries no cause; diagnostics only go to the log.
    #[error("Transport failure")]
    Transport,

    #[error("Path leaves internal storage: {}", .0.display())]
    InvalidPath(std::path::PathBuf),

    #[error("Partial failure: {0}")]
    PartialFailure(String),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Host capability error: {0}")]
    Capability(#[from] BridgeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreBridgeError>;
