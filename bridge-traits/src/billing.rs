//! In-App Billing SDK Abstraction
//!
//! Mirrors the subset of a store billing client the bridge relies on:
//! connection setup, product detail queries, purchase launch and consumption
//! of one-time products.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::token::CorrelationToken;

/// Response code attached to billing callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BillingResponseCode {
    Ok,
    UserCanceled,
    ServiceUnavailable,
    ServiceDisconnected,
    ItemAlreadyOwned,
    ItemUnavailable,
    DeveloperError,
    Error,
}

impl BillingResponseCode {
    pub fn is_ok(&self) -> bool {
        matches!(self, BillingResponseCode::Ok)
    }
}

/// Store-side description of a purchasable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub product_id: String,
    pub title: Option<String>,
    pub formatted_price: Option<String>,
}

impl ProductDetails {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            title: None,
            formatted_price: None,
        }
    }
}

/// Purchase state as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PurchaseState {
    Unspecified,
    Pending,
    Purchased,
}

/// A purchase delivered by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub purchase_token: String,
    pub product_ids: Vec<String>,
    pub state: PurchaseState,
}

/// Billing client
///
/// Results are reported through `HostEvent::BillingSetupFinished`,
/// `BillingServiceDisconnected`, `ProductDetailsReceived`, `PurchasesUpdated`
/// and `ConsumeFinished`. Purchase updates may arrive at any time, including
/// redeliveries of purchases that were never consumed.
pub trait BillingClient: Send + Sync {
    /// Connect (or reconnect) to the store service
    fn start_connection(&self) -> Result<()>;

    /// Query details for the given one-time products
    fn query_products(&self, product_ids: &[String], token: CorrelationToken) -> Result<()>;

    /// Launch the store purchase UI for one product
    fn launch_purchase(&self, product: &ProductDetails, token: CorrelationToken) -> Result<()>;

    /// Consume a purchase so the product can be bought again
    fn consume(&self, purchase_token: &str) -> Result<()>;
}
