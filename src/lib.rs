//! Workspace facade crate.
//!
//! Exposes the feature flags that map onto the individual workspace crates
//! (`core-service` and, through it, `core-runtime` and `bridge-desktop`).
//! Host applications can depend on `host-bridge-workspace` and enable the
//! documented features without wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::{BridgeHandle, BridgeService};
