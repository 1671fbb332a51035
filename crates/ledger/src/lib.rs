//! Inventory ledger for the pet store.
//!
//! The ledger is the single source of truth for pet availability. It exposes
//! a small transaction protocol ([`InventoryLedger`] / [`LedgerTransaction`])
//! used by checkout, and plain CRUD ([`CatalogStore`]) for everything else.
//!
//! Two implementations are provided: [`PostgresLedger`] for production and
//! [`InMemoryLedger`] for tests, which honours the same per-row locking rules.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{
    Order, OrderId, OrderItem, OrderItemId, Pet, PetFilter, PetId, PetPage, PetStatus, Species,
    Store, StoreId,
};
pub use error::{LedgerError, Result};
pub use memory::{InMemoryLedger, InMemoryTransaction};
pub use postgres::{PostgresLedger, PostgresTransaction, TransactionLimits};
pub use store::{CatalogStore, InventoryLedger, LedgerTransaction};
