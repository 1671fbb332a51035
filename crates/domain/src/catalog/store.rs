//! Store service.

use std::sync::Arc;
use std::time::Duration;

use cache::{Cache, keys};
use chrono::Utc;
use common::{Store, StoreId};
use ledger::{CatalogStore, LedgerError};

use crate::advisory_cache;
use crate::error::{DomainError, ValidationError};
use crate::validation::{sanitize, validate_create_store};

use super::CreateStoreInput;

/// Default store lifetime in the cache. Stores are rarely written.
pub const STORE_TTL: Duration = Duration::from_secs(10 * 60);

/// Service for opening and finding stores. Each owner has at most one.
pub struct StoreService<L: CatalogStore> {
    ledger: L,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl<L: CatalogStore> StoreService<L> {
    pub fn new(ledger: L, cache: Arc<dyn Cache>) -> Self {
        Self {
            ledger,
            cache,
            ttl: STORE_TTL,
        }
    }

    /// Overrides how long stores stay cached.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Opens a store for an owner.
    #[tracing::instrument(skip(self, input), fields(owner_id = %input.owner_id))]
    pub async fn create_store(&self, input: CreateStoreInput) -> Result<Store, DomainError> {
        validate_create_store(&input)?;

        let owner_id = sanitize(&input.owner_id);
        if self.ledger.get_store_by_owner(&owner_id).await?.is_some() {
            return Err(DomainError::conflict(
                "store",
                "store already exists for this owner",
            ));
        }

        let now = Utc::now();
        let store = Store {
            id: StoreId::new(),
            name: sanitize(&input.name),
            owner_id,
            created_at: now,
            updated_at: now,
        };

        // A concurrent request for the same owner can still win the insert.
        match self.ledger.insert_store(&store).await {
            Ok(()) => {}
            Err(LedgerError::Duplicate(_)) => {
                return Err(DomainError::conflict(
                    "store",
                    "store already exists for this owner",
                ));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(store_id = %store.id, "Store created");

        let cache = self.cache.as_ref();
        advisory_cache::write(cache, &keys::store(store.id), &store, self.ttl).await;
        advisory_cache::write(cache, &keys::store_by_owner(&store.owner_id), &store, self.ttl)
            .await;

        Ok(store)
    }

    /// Finds the store owned by `owner_id`.
    #[tracing::instrument(skip(self))]
    pub async fn get_store_by_owner(&self, owner_id: &str) -> Result<Store, DomainError> {
        if owner_id.trim().is_empty() {
            return Err(ValidationError::new("owner_id", "owner ID cannot be empty").into());
        }

        let key = keys::store_by_owner(owner_id);
        if let Some(store) = advisory_cache::read::<Store>(self.cache.as_ref(), &key).await {
            return Ok(store);
        }

        let store = self
            .ledger
            .get_store_by_owner(owner_id)
            .await?
            .ok_or_else(|| DomainError::not_found("store", owner_id))?;
        advisory_cache::write(self.cache.as_ref(), &key, &store, self.ttl).await;
        Ok(store)
    }

    /// Loads a store by ID, reading through the cache.
    #[tracing::instrument(skip(self))]
    pub async fn get_store(&self, store_id: StoreId) -> Result<Store, DomainError> {
        let key = keys::store(store_id);
        if let Some(store) = advisory_cache::read::<Store>(self.cache.as_ref(), &key).await {
            return Ok(store);
        }

        let store = self
            .ledger
            .get_store(store_id)
            .await?
            .ok_or_else(|| DomainError::not_found("store", store_id))?;
        advisory_cache::write(self.cache.as_ref(), &key, &store, self.ttl).await;
        Ok(store)
    }

    /// All stores, sorted by name.
    pub async fn list_stores(&self) -> Result<Vec<Store>, DomainError> {
        Ok(self.ledger.list_stores().await?)
    }
}
