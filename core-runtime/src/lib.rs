//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the host bridge:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//! - Retry policy
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the bridge state machines and
//! the service façade depend on. It establishes the logging conventions,
//! the fail-fast configuration builder and the observational event bus.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod retry;

pub use error::{Error, Result};
