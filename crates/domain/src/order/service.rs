//! Order service: checkout and order reads.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cache::{Cache, keys};
use chrono::Utc;
use common::{Order, OrderId, OrderItem, OrderItemId, Pet, PetId, PetStatus, StoreId};
use ledger::{InventoryLedger, LedgerTransaction};

use crate::advisory_cache;
use crate::error::{DomainError, PartialFulfillmentError};
use crate::validation::{sanitize, validate_create_order};

use super::{CreateOrderInput, OrderOutcome};

/// Default lifetime of an order's cached pets. Orders never change after
/// commit, so this only bounds memory.
pub const ORDER_PETS_TTL: Duration = Duration::from_secs(10 * 60);

/// Message of the business-rule error raised when nothing could be sold.
pub const NOTHING_AVAILABLE: &str = "no items were available";

/// What the transaction produced before the cache is reconciled.
struct Fulfillment {
    order: Order,
    items: Vec<OrderItem>,
    rejected: Vec<PetId>,
}

/// Service for checkout and order lookups.
///
/// Checkout runs as one ledger transaction: every requested pet is locked
/// and flipped to `Sold` in request order, pets that cannot be locked are
/// rejected without aborting the order, and the cache is reconciled only
/// after commit.
pub struct OrderService<L: InventoryLedger> {
    ledger: L,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl<L: InventoryLedger> OrderService<L> {
    /// Creates a new order service.
    pub fn new(ledger: L, cache: Arc<dyn Cache>) -> Self {
        Self {
            ledger,
            cache,
            ttl: ORDER_PETS_TTL,
        }
    }

    /// Overrides how long an order's pets stay cached.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns a reference to the underlying ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Buys the requested pets for a customer.
    ///
    /// Returns `Err` only when nothing was persisted: invalid input, no pet
    /// available, or a ledger failure (which rolls the transaction back).
    /// A partially fulfilled order comes back as `Ok` with
    /// [`OrderOutcome::rejection`] set.
    #[tracing::instrument(
        skip(self, input),
        fields(store_id = %input.store_id, requested = input.pet_ids.len())
    )]
    pub async fn create_order(&self, input: CreateOrderInput) -> Result<OrderOutcome, DomainError> {
        if let Err(e) = validate_create_order(&input) {
            metrics::counter!("orders_rejected_total", "reason" => "validation").increment(1);
            return Err(e.into());
        }

        let started = Instant::now();
        let customer_id = sanitize(&input.customer_id);
        let result = self
            .fulfill(customer_id, input.store_id, &input.pet_ids)
            .await;
        metrics::histogram!("order_create_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        let Fulfillment {
            order,
            items,
            rejected,
        } = match result {
            Ok(fulfillment) => fulfillment,
            Err(e) => {
                let reason = match &e {
                    DomainError::BusinessRule(_) => "unavailable",
                    e if e.is_retryable() => "retryable",
                    _ => "ledger",
                };
                metrics::counter!("orders_rejected_total", "reason" => reason).increment(1);
                tracing::info!(error = %e, "Order not created");
                return Err(e);
            }
        };

        self.reconcile_cache(order.store_id, &items).await;

        metrics::counter!("orders_created_total").increment(1);
        let rejection = if rejected.is_empty() {
            tracing::info!(order_id = %order.id, sold = items.len(), "Order created");
            None
        } else {
            metrics::counter!("orders_partially_fulfilled_total").increment(1);
            tracing::info!(
                order_id = %order.id,
                sold = items.len(),
                rejected = rejected.len(),
                "Order partially fulfilled"
            );
            Some(PartialFulfillmentError { rejected })
        };

        Ok(OrderOutcome {
            order,
            items,
            rejection,
        })
    }

    /// Runs the checkout transaction.
    ///
    /// Any `?` below drops the open transaction, which rolls it back.
    async fn fulfill(
        &self,
        customer_id: String,
        store_id: StoreId,
        pet_ids: &[PetId],
    ) -> Result<Fulfillment, DomainError> {
        let mut tx = self.ledger.begin().await?;

        let mut order = Order {
            id: OrderId::new(),
            customer_id,
            store_id,
            total_pets: pet_ids.len() as u32,
            created_at: Utc::now(),
        };
        if !tx.insert_order(&order).await? {
            tracing::debug!(%store_id, "Store does not exist");
            if let Err(e) = tx.rollback().await {
                tracing::warn!(error = %e, "Rollback of empty order failed");
            }
            return Err(DomainError::BusinessRule(NOTHING_AVAILABLE.to_string()));
        }

        let mut items = Vec::with_capacity(pet_ids.len());
        let mut rejected = Vec::new();

        for &pet_id in pet_ids {
            // Sold elsewhere, wrong store, missing, or a lost race: all the same to the caller.
            let acquired = tx
                .try_acquire_and_transition(pet_id, store_id, PetStatus::Available, PetStatus::Sold)
                .await?;
            if !acquired {
                tracing::debug!(%pet_id, "Pet not available");
                rejected.push(pet_id);
                continue;
            }

            let item = OrderItem {
                id: OrderItemId::new(),
                order_id: order.id,
                pet_id,
                purchased_at: Utc::now(),
            };
            tx.insert_order_item(&item).await?;
            items.push(item);
        }

        if items.is_empty() {
            if let Err(e) = tx.rollback().await {
                tracing::warn!(error = %e, "Rollback of empty order failed");
            }
            return Err(DomainError::BusinessRule(NOTHING_AVAILABLE.to_string()));
        }

        if items.len() != pet_ids.len() {
            order.total_pets = items.len() as u32;
            tx.update_order_total(order.id, order.total_pets).await?;
        }

        tx.commit().await?;

        Ok(Fulfillment {
            order,
            items,
            rejected,
        })
    }

    /// Drops cached copies of every sold pet and the store's listings.
    async fn reconcile_cache(&self, store_id: StoreId, items: &[OrderItem]) {
        let pet_keys: Vec<String> = items
            .iter()
            .map(|item| keys::pet(store_id, item.pet_id))
            .collect();
        advisory_cache::evict(self.cache.as_ref(), &pet_keys).await;
        advisory_cache::evict_pattern(self.cache.as_ref(), &keys::pet_listings(store_id)).await;
    }

    /// Loads an order by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.ledger
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("order", order_id))
    }

    /// Returns the pets bought by an order, in purchase order.
    ///
    /// Reads through the cache; a cache failure only costs a ledger read.
    #[tracing::instrument(skip(self))]
    pub async fn get_order_pets(&self, order_id: OrderId) -> Result<Vec<Pet>, DomainError> {
        let key = keys::order_pets(order_id);
        if let Some(pets) = advisory_cache::read::<Vec<Pet>>(self.cache.as_ref(), &key).await {
            return Ok(pets);
        }

        let pets = self.ledger.get_order_pets(order_id).await?;
        if !pets.is_empty() {
            advisory_cache::write(self.cache.as_ref(), &key, &pets, self.ttl).await;
        }
        Ok(pets)
    }
}
