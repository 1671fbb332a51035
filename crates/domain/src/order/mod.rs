//! The order fulfillment engine.

mod service;

pub use service::OrderService;

use common::{Order, OrderItem, PetId, StoreId};
use serde::{Deserialize, Serialize};

use crate::error::PartialFulfillmentError;

/// A checkout request from an already authenticated customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderInput {
    pub customer_id: String,
    pub store_id: StoreId,
    /// Pets to buy, processed in this order.
    pub pet_ids: Vec<PetId>,
}

impl CreateOrderInput {
    pub fn new(customer_id: impl Into<String>, store_id: StoreId, pet_ids: Vec<PetId>) -> Self {
        Self {
            customer_id: customer_id.into(),
            store_id,
            pet_ids,
        }
    }
}

/// Result of a committed checkout.
///
/// `rejection` is set when only part of the request could be sold; the
/// order and its items are persisted either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderOutcome {
    pub order: Order,
    /// Purchase records, in request order.
    pub items: Vec<OrderItem>,
    pub rejection: Option<PartialFulfillmentError>,
}

impl OrderOutcome {
    pub fn is_partial(&self) -> bool {
        self.rejection.is_some()
    }

    pub fn rejected(&self) -> &[PetId] {
        self.rejection
            .as_ref()
            .map(|r| r.rejected.as_slice())
            .unwrap_or_default()
    }

    pub fn fulfilled(&self) -> impl Iterator<Item = PetId> + '_ {
        self.items.iter().map(|item| item.pet_id)
    }
}
