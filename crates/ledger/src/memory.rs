use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    CatalogStore, InventoryLedger, LedgerError, LedgerTransaction, Order, OrderId, OrderItem, Pet,
    PetFilter, PetId, PetPage, PetStatus, Result, Store, StoreId,
};

/// Default bound on how long a transaction waits for a held pet row.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Page size used when a listing does not ask for one.
const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Default, Clone)]
struct LedgerState {
    stores: HashMap<StoreId, Store>,
    pets: HashMap<PetId, Pet>,
    orders: HashMap<OrderId, Order>,
    /// Kept in insertion order.
    order_items: Vec<OrderItem>,
}

/// One async mutex per pet row that is held or waited on. Entries are
/// removed as soon as no transaction references them.
type RowLocks = Arc<std::sync::Mutex<HashMap<PetId, Arc<Mutex<()>>>>>;

/// Drops the row mutex of `pet_id` once only the map still references it.
fn forget_idle_row(row_locks: &RowLocks, pet_id: PetId) {
    let mut locks = row_locks.lock().unwrap_or_else(PoisonError::into_inner);
    if locks
        .get(&pet_id)
        .is_some_and(|lock| Arc::strong_count(lock) == 1)
    {
        locks.remove(&pet_id);
    }
}

/// Exclusive hold on one pet row, released on drop.
struct RowGuard {
    pet_id: PetId,
    row_locks: RowLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RowGuard {
    fn drop(&mut self) {
        // The guard owns a reference to the mutex; release it before counting.
        drop(self.guard.take());
        forget_idle_row(&self.row_locks, self.pet_id);
    }
}

/// In-memory inventory ledger for testing.
///
/// Provides the same interface and locking behaviour as the PostgreSQL
/// implementation: every pet row has its own async mutex, a transaction keeps
/// the rows it transitions locked until it ends, and its writes are applied
/// to the shared state only on commit.
#[derive(Clone)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
    row_locks: RowLocks,
    lock_timeout: Duration,
    fail_on_commit: Arc<AtomicBool>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            row_locks: Arc::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            fail_on_commit: Arc::default(),
        }
    }
}

impl InMemoryLedger {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how long a transaction waits for a locked pet row before failing
    /// with [`LedgerError::Timeout`].
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    /// Makes every subsequent commit fail, rolling the transaction back.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of committed purchase records.
    pub async fn order_item_count(&self) -> usize {
        self.state.read().await.order_items.len()
    }

    /// Returns the number of purchase records referencing a pet.
    pub async fn purchases_of(&self, pet_id: PetId) -> usize {
        self.state
            .read()
            .await
            .order_items
            .iter()
            .filter(|item| item.pet_id == pet_id)
            .count()
    }

    /// Clears all rows.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = LedgerState::default();
        self.row_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    async fn lock_row(
        row_locks: &RowLocks,
        lock_timeout: Duration,
        pet_id: PetId,
    ) -> Result<RowGuard> {
        let lock = {
            let mut locks = row_locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(pet_id).or_default().clone()
        };

        let acquired = tokio::time::timeout(lock_timeout, lock.lock_owned()).await;
        match acquired {
            Ok(guard) => Ok(RowGuard {
                pet_id,
                row_locks: row_locks.clone(),
                guard: Some(guard),
            }),
            Err(_) => {
                forget_idle_row(row_locks, pet_id);
                Err(LedgerError::Timeout(format!(
                    "waited more than {lock_timeout:?} for pet {pet_id}"
                )))
            }
        }
    }

    /// Number of pet rows currently held or waited on.
    #[cfg(test)]
    fn tracked_rows(&self) -> usize {
        self.row_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[derive(Debug)]
enum PendingWrite {
    Order(Order),
    Item(OrderItem),
    Transition {
        pet_id: PetId,
        to: PetStatus,
        at: DateTime<Utc>,
    },
    OrderTotal {
        order_id: OrderId,
        total_pets: u32,
    },
}

/// A transaction against [`InMemoryLedger`].
pub struct InMemoryTransaction {
    state: Arc<RwLock<LedgerState>>,
    row_locks: RowLocks,
    lock_timeout: Duration,
    fail_on_commit: bool,
    held: HashMap<PetId, RowGuard>,
    writes: Vec<PendingWrite>,
}

impl InMemoryTransaction {
    /// Status of a pet as seen from inside this transaction.
    fn visible_status(&self, pet: &Pet) -> PetStatus {
        self.writes
            .iter()
            .rev()
            .find_map(|write| match write {
                PendingWrite::Transition { pet_id, to, .. } if *pet_id == pet.id => Some(*to),
                _ => None,
            })
            .unwrap_or(pet.status)
    }

    fn apply(state: &mut LedgerState, write: PendingWrite) -> Result<()> {
        match write {
            PendingWrite::Order(order) => {
                if state.orders.contains_key(&order.id) {
                    return Err(LedgerError::Duplicate(format!("order {}", order.id)));
                }
                state.orders.insert(order.id, order);
            }
            PendingWrite::Item(item) => {
                if state.order_items.iter().any(|i| i.pet_id == item.pet_id) {
                    return Err(LedgerError::Duplicate(format!(
                        "purchase of pet {}",
                        item.pet_id
                    )));
                }
                state.order_items.push(item);
            }
            PendingWrite::Transition { pet_id, to, at } => {
                let pet = state
                    .pets
                    .get_mut(&pet_id)
                    .ok_or_else(|| LedgerError::Corrupt(format!("pet {pet_id} vanished")))?;
                pet.status = to;
                pet.updated_at = at;
            }
            PendingWrite::OrderTotal {
                order_id,
                total_pets,
            } => {
                let order = state
                    .orders
                    .get_mut(&order_id)
                    .ok_or_else(|| LedgerError::Corrupt(format!("order {order_id} vanished")))?;
                order.total_pets = total_pets;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn insert_order(&mut self, order: &Order) -> Result<bool> {
        if !self.state.read().await.stores.contains_key(&order.store_id) {
            return Ok(false);
        }
        self.writes.push(PendingWrite::Order(order.clone()));
        Ok(true)
    }

    async fn try_acquire_and_transition(
        &mut self,
        pet_id: PetId,
        store_id: StoreId,
        from: PetStatus,
        to: PetStatus,
    ) -> Result<bool> {
        let newly_acquired = if self.held.contains_key(&pet_id) {
            None
        } else {
            Some(InMemoryLedger::lock_row(&self.row_locks, self.lock_timeout, pet_id).await?)
        };

        let matched = {
            let state = self.state.read().await;
            state
                .pets
                .get(&pet_id)
                .is_some_and(|pet| pet.store_id == store_id && self.visible_status(pet) == from)
        };

        if !matched {
            // Nothing matched, so nothing stays locked.
            return Ok(false);
        }

        if let Some(guard) = newly_acquired {
            self.held.insert(pet_id, guard);
        }
        self.writes.push(PendingWrite::Transition {
            pet_id,
            to,
            at: Utc::now(),
        });
        Ok(true)
    }

    async fn insert_order_item(&mut self, item: &OrderItem) -> Result<()> {
        self.writes.push(PendingWrite::Item(item.clone()));
        Ok(())
    }

    async fn update_order_total(&mut self, order_id: OrderId, total_pets: u32) -> Result<()> {
        self.writes.push(PendingWrite::OrderTotal {
            order_id,
            total_pets,
        });
        Ok(())
    }

    async fn commit(self) -> Result<()> {
        if self.fail_on_commit {
            return Err(LedgerError::Unavailable(
                "commit rejected by injected failure".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        // Apply to a scratch copy so a failing write leaves nothing behind.
        let mut next = state.clone();
        for write in self.writes {
            Self::apply(&mut next, write)?;
        }
        *state = next;

        // Row holds are released when `self.held` drops here.
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl InventoryLedger for InMemoryLedger {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        Ok(InMemoryTransaction {
            state: self.state.clone(),
            row_locks: self.row_locks.clone(),
            lock_timeout: self.lock_timeout,
            fail_on_commit: self.fail_on_commit.load(Ordering::SeqCst),
            held: HashMap::new(),
            writes: Vec::new(),
        })
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn get_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let state = self.state.read().await;
        let mut items: Vec<_> = state
            .order_items
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        items.sort_by_key(|item| item.purchased_at);
        Ok(items)
    }

    async fn get_order_pets(&self, order_id: OrderId) -> Result<Vec<Pet>> {
        let items = self.get_order_items(order_id).await?;
        let state = self.state.read().await;
        Ok(items
            .iter()
            .filter_map(|item| state.pets.get(&item.pet_id).cloned())
            .collect())
    }
}

#[async_trait]
impl CatalogStore for InMemoryLedger {
    async fn insert_pet(&self, pet: &Pet) -> Result<()> {
        let mut state = self.state.write().await;
        if state.pets.contains_key(&pet.id) {
            return Err(LedgerError::Duplicate(format!("pet {}", pet.id)));
        }
        state.pets.insert(pet.id, pet.clone());
        Ok(())
    }

    async fn get_pet(&self, pet_id: PetId) -> Result<Option<Pet>> {
        Ok(self.state.read().await.pets.get(&pet_id).cloned())
    }

    async fn list_pets(&self, filter: &PetFilter) -> Result<PetPage> {
        let state = self.state.read().await;
        let mut pets: Vec<_> = state
            .pets
            .values()
            .filter(|pet| filter.matches(pet))
            .cloned()
            .collect();
        pets.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = pets.len();
        let limit = if filter.limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            filter.limit
        };
        let pets = pets.into_iter().skip(filter.offset).take(limit).collect();

        Ok(PetPage { pets, total })
    }

    async fn delete_pet(&self, pet_id: PetId) -> Result<bool> {
        let _guard = Self::lock_row(&self.row_locks, self.lock_timeout, pet_id).await?;
        let mut state = self.state.write().await;
        if !state.pets.get(&pet_id).is_some_and(Pet::is_available) {
            return Ok(false);
        }
        state.pets.remove(&pet_id);
        Ok(true)
    }

    async fn mark_pet_sold(&self, pet_id: PetId) -> Result<bool> {
        let _guard = Self::lock_row(&self.row_locks, self.lock_timeout, pet_id).await?;
        let mut state = self.state.write().await;
        match state.pets.get_mut(&pet_id) {
            Some(pet) => {
                pet.status = PetStatus::Sold;
                pet.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_store(&self, store: &Store) -> Result<()> {
        let mut state = self.state.write().await;
        if state.stores.values().any(|s| s.owner_id == store.owner_id) {
            return Err(LedgerError::Duplicate(format!(
                "store for owner {}",
                store.owner_id
            )));
        }
        state.stores.insert(store.id, store.clone());
        Ok(())
    }

    async fn get_store(&self, store_id: StoreId) -> Result<Option<Store>> {
        Ok(self.state.read().await.stores.get(&store_id).cloned())
    }

    async fn get_store_by_owner(&self, owner_id: &str) -> Result<Option<Store>> {
        Ok(self
            .state
            .read()
            .await
            .stores
            .values()
            .find(|store| store.owner_id == owner_id)
            .cloned())
    }

    async fn list_stores(&self) -> Result<Vec<Store>> {
        let mut stores: Vec<_> = self.state.read().await.stores.values().cloned().collect();
        stores.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderItemId, Species};

    async fn seed_store(ledger: &InMemoryLedger) -> StoreId {
        let now = Utc::now();
        let store = Store {
            id: StoreId::new(),
            name: "Paws".to_string(),
            owner_id: format!("owner-{}", StoreId::new()),
            created_at: now,
            updated_at: now,
        };
        ledger.insert_store(&store).await.unwrap();
        store.id
    }

    fn pet_in(store_id: StoreId) -> Pet {
        let now = Utc::now();
        Pet {
            id: PetId::new(),
            store_id,
            name: "Whiskers".to_string(),
            species: Species::Cat,
            age: 2,
            picture_url: None,
            description: None,
            breeder_name: "Ann".to_string(),
            breeder_email_encrypted: "ciphertext".to_string(),
            status: PetStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }

    fn order_for(store_id: StoreId, total_pets: u32) -> Order {
        Order {
            id: OrderId::new(),
            customer_id: "customer1".to_string(),
            store_id,
            total_pets,
            created_at: Utc::now(),
        }
    }

    fn item_for(order_id: OrderId, pet_id: PetId) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(),
            order_id,
            pet_id,
            purchased_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn transition_is_visible_only_after_commit() {
        let ledger = InMemoryLedger::new();
        let store = seed_store(&ledger).await;
        let pet = pet_in(store);
        ledger.insert_pet(&pet).await.unwrap();

        let mut tx = ledger.begin().await.unwrap();
        let acquired = tx
            .try_acquire_and_transition(pet.id, store, PetStatus::Available, PetStatus::Sold)
            .await
            .unwrap();
        assert!(acquired);

        let before = ledger.get_pet(pet.id).await.unwrap().unwrap();
        assert_eq!(before.status, PetStatus::Available);

        tx.commit().await.unwrap();

        let after = ledger.get_pet(pet.id).await.unwrap().unwrap();
        assert_eq!(after.status, PetStatus::Sold);
    }

    #[tokio::test]
    async fn wrong_store_or_state_is_not_acquired() {
        let ledger = InMemoryLedger::new();
        let store = seed_store(&ledger).await;
        let pet = pet_in(store);
        ledger.insert_pet(&pet).await.unwrap();

        let mut tx = ledger.begin().await.unwrap();
        let other_store = tx
            .try_acquire_and_transition(
                pet.id,
                StoreId::new(),
                PetStatus::Available,
                PetStatus::Sold,
            )
            .await
            .unwrap();
        let wrong_state = tx
            .try_acquire_and_transition(pet.id, store, PetStatus::Sold, PetStatus::Available)
            .await
            .unwrap();
        let unknown = tx
            .try_acquire_and_transition(PetId::new(), store, PetStatus::Available, PetStatus::Sold)
            .await
            .unwrap();

        assert!(!other_store);
        assert!(!wrong_state);
        assert!(!unknown);
    }

    #[tokio::test]
    async fn second_acquire_in_same_transaction_sees_own_write() {
        let ledger = InMemoryLedger::new();
        let store = seed_store(&ledger).await;
        let pet = pet_in(store);
        ledger.insert_pet(&pet).await.unwrap();

        let mut tx = ledger.begin().await.unwrap();
        assert!(
            tx.try_acquire_and_transition(pet.id, store, PetStatus::Available, PetStatus::Sold)
                .await
                .unwrap()
        );
        assert!(
            !tx.try_acquire_and_transition(pet.id, store, PetStatus::Available, PetStatus::Sold)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn competing_transaction_waits_then_sees_sold() {
        let ledger = InMemoryLedger::new();
        let store = seed_store(&ledger).await;
        let pet = pet_in(store);
        ledger.insert_pet(&pet).await.unwrap();

        let mut first = ledger.begin().await.unwrap();
        assert!(
            first
                .try_acquire_and_transition(pet.id, store, PetStatus::Available, PetStatus::Sold)
                .await
                .unwrap()
        );

        let contender = {
            let ledger = ledger.clone();
            let pet_id = pet.id;
            tokio::spawn(async move {
                let mut second = ledger.begin().await.unwrap();
                second
                    .try_acquire_and_transition(pet_id, store, PetStatus::Available, PetStatus::Sold)
                    .await
                    .unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        first.commit().await.unwrap();

        assert!(!contender.await.unwrap());
    }

    #[tokio::test]
    async fn lock_wait_is_bounded() {
        let ledger = InMemoryLedger::new().with_lock_timeout(Duration::from_millis(20));
        let store = seed_store(&ledger).await;
        let pet = pet_in(store);
        ledger.insert_pet(&pet).await.unwrap();

        let mut first = ledger.begin().await.unwrap();
        first
            .try_acquire_and_transition(pet.id, store, PetStatus::Available, PetStatus::Sold)
            .await
            .unwrap();

        let mut second = ledger.begin().await.unwrap();
        let err = second
            .try_acquire_and_transition(pet.id, store, PetStatus::Available, PetStatus::Sold)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn dropped_transaction_releases_rows_and_writes_nothing() {
        let ledger = InMemoryLedger::new();
        let store = seed_store(&ledger).await;
        let pet = pet_in(store);
        ledger.insert_pet(&pet).await.unwrap();

        {
            let mut tx = ledger.begin().await.unwrap();
            let order = order_for(store, 1);
            assert!(tx.insert_order(&order).await.unwrap());
            tx.try_acquire_and_transition(pet.id, store, PetStatus::Available, PetStatus::Sold)
                .await
                .unwrap();
            tx.insert_order_item(&item_for(order.id, pet.id)).await.unwrap();
        }

        assert_eq!(ledger.order_count().await, 0);
        assert_eq!(ledger.order_item_count().await, 0);

        let mut tx = ledger.begin().await.unwrap();
        assert!(
            tx.try_acquire_and_transition(pet.id, store, PetStatus::Available, PetStatus::Sold)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn failed_commit_leaves_no_rows() {
        let ledger = InMemoryLedger::new();
        let store = seed_store(&ledger).await;
        let pet = pet_in(store);
        ledger.insert_pet(&pet).await.unwrap();
        ledger.set_fail_on_commit(true);

        let mut tx = ledger.begin().await.unwrap();
        let order = order_for(store, 1);
        assert!(tx.insert_order(&order).await.unwrap());
        tx.try_acquire_and_transition(pet.id, store, PetStatus::Available, PetStatus::Sold)
            .await
            .unwrap();
        tx.insert_order_item(&item_for(order.id, pet.id)).await.unwrap();

        assert!(tx.commit().await.is_err());
        assert_eq!(ledger.order_count().await, 0);
        assert_eq!(
            ledger.get_pet(pet.id).await.unwrap().unwrap().status,
            PetStatus::Available
        );
    }

    #[tokio::test]
    async fn order_total_update_and_pet_join() {
        let ledger = InMemoryLedger::new();
        let store = seed_store(&ledger).await;
        let first = pet_in(store);
        let second = pet_in(store);
        ledger.insert_pet(&first).await.unwrap();
        ledger.insert_pet(&second).await.unwrap();

        let order = order_for(store, 3);
        let mut tx = ledger.begin().await.unwrap();
        assert!(tx.insert_order(&order).await.unwrap());
        for pet in [&first, &second] {
            tx.try_acquire_and_transition(pet.id, store, PetStatus::Available, PetStatus::Sold)
                .await
                .unwrap();
            tx.insert_order_item(&item_for(order.id, pet.id)).await.unwrap();
        }
        tx.update_order_total(order.id, 2).await.unwrap();
        tx.commit().await.unwrap();

        let stored = ledger.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.total_pets, 2);

        let pets = ledger.get_order_pets(order.id).await.unwrap();
        let ids: Vec<_> = pets.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn list_pets_pages_newest_first() {
        let ledger = InMemoryLedger::new();
        let store = seed_store(&ledger).await;
        let mut pets = Vec::new();
        for offset in 0..5 {
            let mut pet = pet_in(store);
            pet.created_at = Utc::now() - chrono::Duration::minutes(offset);
            ledger.insert_pet(&pet).await.unwrap();
            pets.push(pet);
        }
        ledger.insert_pet(&pet_in(StoreId::new())).await.unwrap();

        let page = ledger
            .list_pets(&PetFilter::new().store(store).limit(2).offset(1))
            .await
            .unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.pets.len(), 2);
        assert_eq!(page.pets[0].id, pets[1].id);
        assert_eq!(page.pets[1].id, pets[2].id);
    }

    #[tokio::test]
    async fn one_store_per_owner() {
        let ledger = InMemoryLedger::new();
        let now = Utc::now();
        let store = Store {
            id: StoreId::new(),
            name: "Paws".to_string(),
            owner_id: "merchant1".to_string(),
            created_at: now,
            updated_at: now,
        };
        ledger.insert_store(&store).await.unwrap();

        let duplicate = Store {
            id: StoreId::new(),
            ..store.clone()
        };
        let err = ledger.insert_store(&duplicate).await.unwrap_err();
        assert!(matches!(err, LedgerError::Duplicate(_)));

        let found = ledger.get_store_by_owner("merchant1").await.unwrap();
        assert_eq!(found, Some(store));
    }

    #[tokio::test]
    async fn row_locks_are_forgotten_once_released() {
        let ledger = InMemoryLedger::new();
        let store = seed_store(&ledger).await;
        let pet = pet_in(store);
        ledger.insert_pet(&pet).await.unwrap();

        let mut tx = ledger.begin().await.unwrap();
        for _ in 0..1000 {
            let acquired = tx
                .try_acquire_and_transition(
                    PetId::new(),
                    store,
                    PetStatus::Available,
                    PetStatus::Sold,
                )
                .await
                .unwrap();
            assert!(!acquired);
        }
        assert_eq!(ledger.tracked_rows(), 0);

        assert!(
            tx.try_acquire_and_transition(pet.id, store, PetStatus::Available, PetStatus::Sold)
                .await
                .unwrap()
        );
        assert_eq!(ledger.tracked_rows(), 1);

        tx.commit().await.unwrap();
        assert_eq!(ledger.tracked_rows(), 0);

        assert!(ledger.delete_pet(PetId::new()).await.is_ok());
        assert!(ledger.mark_pet_sold(PetId::new()).await.is_ok());
        assert_eq!(ledger.tracked_rows(), 0);
    }

    #[tokio::test]
    async fn timed_out_waiter_does_not_leave_a_row_behind() {
        let ledger = InMemoryLedger::new().with_lock_timeout(Duration::from_millis(20));
        let store = seed_store(&ledger).await;
        let pet = pet_in(store);
        ledger.insert_pet(&pet).await.unwrap();

        let mut first = ledger.begin().await.unwrap();
        first
            .try_acquire_and_transition(pet.id, store, PetStatus::Available, PetStatus::Sold)
            .await
            .unwrap();

        let mut second = ledger.begin().await.unwrap();
        assert!(
            second
                .try_acquire_and_transition(pet.id, store, PetStatus::Available, PetStatus::Sold)
                .await
                .is_err()
        );
        assert_eq!(ledger.tracked_rows(), 1);

        first.rollback().await.unwrap();
        assert_eq!(ledger.tracked_rows(), 0);
    }

    #[tokio::test]
    async fn order_for_unknown_store_is_not_written() {
        let ledger = InMemoryLedger::new();

        let order = order_for(StoreId::new(), 1);
        let mut tx = ledger.begin().await.unwrap();
        assert!(!tx.insert_order(&order).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(ledger.order_count().await, 0);
    }

    #[tokio::test]
    async fn sold_pet_is_not_deleted() {
        let ledger = InMemoryLedger::new();
        let store = seed_store(&ledger).await;
        let pet = pet_in(store);
        ledger.insert_pet(&pet).await.unwrap();
        ledger.mark_pet_sold(pet.id).await.unwrap();

        assert!(!ledger.delete_pet(pet.id).await.unwrap());
        assert!(ledger.get_pet(pet.id).await.unwrap().is_some());

        let available = pet_in(store);
        ledger.insert_pet(&available).await.unwrap();
        assert!(ledger.delete_pet(available.id).await.unwrap());
        assert!(!ledger.delete_pet(available.id).await.unwrap());
    }
}
