use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid bridge configuration: {0}")]
    Config(String),

    #[error("Missing host capability {capability}: {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;
