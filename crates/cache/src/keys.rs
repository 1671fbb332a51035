//! Cache key layout.
//!
//! Keys are namespaced by record type and, for catalog data, by store, so
//! that a whole store's listings can be dropped with one pattern.

use common::{OrderId, PetId, StoreId};

/// A single pet.
pub fn pet(store_id: StoreId, pet_id: PetId) -> String {
    format!("pet:{store_id}:{pet_id}")
}

/// Pattern covering every cached listing page of a store.
pub fn pet_listings(store_id: StoreId) -> String {
    format!("pets:list:{store_id}:*")
}

/// One listing page of a store, keyed by its query shape.
pub fn pet_listing(store_id: StoreId, query: &str) -> String {
    format!("pets:list:{store_id}:{query}")
}

/// The pets purchased by an order.
pub fn order_pets(order_id: OrderId) -> String {
    format!("order:pets:{order_id}")
}

pub fn store(store_id: StoreId) -> String {
    format!("store:{store_id}")
}

pub fn store_by_owner(owner_id: &str) -> String {
    format!("store:owner:{owner_id}")
}
