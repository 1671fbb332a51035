use async_trait::async_trait;

use crate::{
    Order, OrderId, OrderItem, Pet, PetFilter, PetId, PetPage, PetStatus, Result, Store, StoreId,
};

/// One open ledger transaction.
///
/// Writes become visible to other transactions only on [`commit`]. Dropping
/// the transaction without committing rolls it back and releases every row
/// it holds.
///
/// [`commit`]: LedgerTransaction::commit
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Inserts the order row if its store exists.
    ///
    /// Returns `false`, writing nothing, when the store is unknown.
    async fn insert_order(&mut self, order: &Order) -> Result<bool>;

    /// Takes an exclusive hold on the pet row if, and only if, it belongs to
    /// `store_id` and is currently in the `from` state, then moves it to `to`.
    ///
    /// Returns `false` when no such row exists (already moved, other store,
    /// unknown id) or when the guarded update affects no row. The hold lasts
    /// until the transaction ends; competing transactions wait on it.
    async fn try_acquire_and_transition(
        &mut self,
        pet_id: PetId,
        store_id: StoreId,
        from: PetStatus,
        to: PetStatus,
    ) -> Result<bool>;

    /// Inserts a purchase record.
    async fn insert_order_item(&mut self, item: &OrderItem) -> Result<()>;

    /// Corrects the declared pet count of an order written in this transaction.
    async fn update_order_total(&mut self, order_id: OrderId, total_pets: u32) -> Result<()>;

    /// Makes every write of this transaction durable and releases its holds.
    async fn commit(self) -> Result<()>;

    /// Discards every write of this transaction and releases its holds.
    async fn rollback(self) -> Result<()>;
}

/// Transactional access to orders and pet availability.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    type Transaction: LedgerTransaction;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Loads an order by id.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Loads the purchase records of an order in purchase order.
    async fn get_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Loads the pets bought by an order, in purchase order.
    async fn get_order_pets(&self, order_id: OrderId) -> Result<Vec<Pet>>;
}

/// Plain CRUD on the catalog, outside the checkout path.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_pet(&self, pet: &Pet) -> Result<()>;

    async fn get_pet(&self, pet_id: PetId) -> Result<Option<Pet>>;

    /// Lists pets matching the filter, newest first, with the unpaged total.
    async fn list_pets(&self, filter: &PetFilter) -> Result<PetPage>;

    /// Deletes a pet that is still available.
    /// Returns false if no available pet has this id.
    async fn delete_pet(&self, pet_id: PetId) -> Result<bool>;

    /// Marks a single pet sold in its own transaction.
    /// Returns false if it did not exist.
    async fn mark_pet_sold(&self, pet_id: PetId) -> Result<bool>;

    async fn insert_store(&self, store: &Store) -> Result<()>;

    async fn get_store(&self, store_id: StoreId) -> Result<Option<Store>>;

    async fn get_store_by_owner(&self, owner_id: &str) -> Result<Option<Store>>;

    /// Lists every store ordered by name.
    async fn list_stores(&self) -> Result<Vec<Store>>;
}
