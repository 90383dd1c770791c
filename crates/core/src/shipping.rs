//! Shipping options offered at checkout.

use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Identifier of a delivery method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingOptionId {
    /// Ebook-only orders: delivered by email.
    Digital,
    /// Collected in person at the church.
    Pickup,
    /// Hand delivery inside Cerejeiras.
    Cerejeiras,
    /// Correios standard parcel.
    Pac,
    /// Correios express parcel.
    Sedex,
    /// Jadlog economy courier.
    Jadlog,
}

/// A delivery method with its price and lead time.
///
/// Options are recomputed whenever the destination region changes and are
/// never persisted; only the chosen option's name and price end up on the
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    pub id: ShippingOptionId,
    pub name: String,
    pub price: Money,
    pub delivery_time: String,
}
