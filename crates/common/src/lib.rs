//! Shared identities and persisted records for the pet store.
//!
//! Every crate in the workspace speaks in these types: the ledger persists
//! them, the cache serializes them and the domain services hand them back to
//! callers.

pub mod ids;
pub mod models;

pub use ids::{OrderId, OrderItemId, PetId, StoreId};
pub use models::{
    Order, OrderItem, ParseEnumError, Pet, PetFilter, PetPage, PetStatus, Species, Store,
};
