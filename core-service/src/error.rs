use core_bridge::CoreBridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Bridge initialization failed: {0}")]
    Initialization(#[from] CoreBridgeError),

    #[error("Bridge control thread is not running")]
    Stopped,

    #[error("Bridge control thread panicked")]
    ControlThreadPanicked,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServiceError>;
