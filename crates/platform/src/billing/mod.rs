//! Billing: hosted checkout/onboarding links and the purchase webhook.
//!
//! Payment processing stays with the billing platform. The platform only asks
//! its callable functions for redirect URLs and listens for completed
//! checkouts to grant purchased credits.

pub mod client;
pub mod error;
pub mod webhook;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storeloom_core::{AccountId, StoreId};
use url::Url;
use uuid::Uuid;

pub use client::BillingClient;
pub use error::BillingError;
pub use webhook::{EventLedger, MemoryEventLedger, WebhookEvent, WebhookHandler};

/// Subscription or credit-pack checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub success_url: Url,
    pub cancel_url: Url,
}

/// Checkout for a product sold by a generated store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCheckoutRequest {
    pub store_id: StoreId,
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub success_url: Url,
    pub cancel_url: Url,
}

const fn default_quantity() -> u32 {
    1
}

/// Return location after leaving a hosted billing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub return_url: Url,
}

/// Callable billing functions. Each returns a URL to redirect the user to.
#[async_trait]
pub trait BillingFunctions: Send + Sync {
    /// Hosted checkout for a subscription or credit pack.
    async fn create_checkout_session(
        &self,
        account: &AccountId,
        request: &CheckoutRequest,
    ) -> Result<Url, BillingError>;

    /// Onboarding link for the account's connected (seller) account.
    async fn create_connect_link(
        &self,
        account: &AccountId,
        request: &ReturnRequest,
    ) -> Result<Url, BillingError>;

    /// Self-service billing portal.
    async fn create_portal_session(
        &self,
        account: &AccountId,
        request: &ReturnRequest,
    ) -> Result<Url, BillingError>;

    /// Hosted checkout for a store product, paid out to the store owner.
    async fn create_product_checkout(
        &self,
        account: &AccountId,
        request: &ProductCheckoutRequest,
    ) -> Result<Url, BillingError>;
}
