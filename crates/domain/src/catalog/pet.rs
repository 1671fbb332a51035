//! Pet catalog service.

use std::sync::Arc;
use std::time::Duration;

use cache::{Cache, DEFAULT_TTL, keys};
use chrono::Utc;
use common::{Pet, PetFilter, PetId, PetPage, PetStatus};
use ledger::CatalogStore;
use serde::{Deserialize, Serialize};

use crate::advisory_cache;
use crate::encryption::FieldEncryptor;
use crate::error::{DomainError, ValidationError};
use crate::validation::{sanitize, validate_create_pet};

use super::CreatePetInput;

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 100;

/// A pet as shown to a caller, with the breeder email revealed only when
/// the caller is allowed to see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetView {
    #[serde(flatten)]
    pub pet: Pet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breeder_email: Option<String>,
}

/// Service for managing a store's pets.
pub struct PetService<L: CatalogStore> {
    ledger: L,
    cache: Arc<dyn Cache>,
    encryptor: Arc<dyn FieldEncryptor>,
    ttl: Duration,
}

impl<L: CatalogStore> PetService<L> {
    pub fn new(ledger: L, cache: Arc<dyn Cache>, encryptor: Arc<dyn FieldEncryptor>) -> Self {
        Self {
            ledger,
            cache,
            encryptor,
            ttl: DEFAULT_TTL,
        }
    }

    /// Overrides how long individual pets and listings stay cached.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Lists a new, available pet.
    ///
    /// The breeder email is encrypted first; if that fails nothing is written.
    #[tracing::instrument(skip(self, input), fields(store_id = %input.store_id))]
    pub async fn create_pet(&self, input: CreatePetInput) -> Result<Pet, DomainError> {
        validate_create_pet(&input)?;

        if self.ledger.get_store(input.store_id).await?.is_none() {
            return Err(DomainError::not_found("store", input.store_id));
        }

        let breeder_email_encrypted = self.encryptor.encrypt(&sanitize(&input.breeder_email))?;

        let now = Utc::now();
        let pet = Pet {
            id: PetId::new(),
            store_id: input.store_id,
            name: sanitize(&input.name),
            species: input.species,
            age: input.age,
            picture_url: input.picture_url.as_deref().map(sanitize),
            description: input.description.as_deref().map(sanitize),
            breeder_name: sanitize(&input.breeder_name),
            breeder_email_encrypted,
            status: PetStatus::Available,
            created_at: now,
            updated_at: now,
        };
        self.ledger.insert_pet(&pet).await?;
        tracing::info!(pet_id = %pet.id, "Pet created");
        metrics::counter!("pets_created_total").increment(1);

        let cache = self.cache.as_ref();
        advisory_cache::write(cache, &keys::pet(pet.store_id, pet.id), &pet, self.ttl).await;
        advisory_cache::evict_pattern(cache, &keys::pet_listings(pet.store_id)).await;

        Ok(pet)
    }

    /// Loads a pet from the ledger and refreshes its cached copy.
    #[tracing::instrument(skip(self))]
    pub async fn get_pet(&self, pet_id: PetId) -> Result<Pet, DomainError> {
        let pet = self
            .ledger
            .get_pet(pet_id)
            .await?
            .ok_or_else(|| DomainError::not_found("pet", pet_id))?;

        advisory_cache::write(
            self.cache.as_ref(),
            &keys::pet(pet.store_id, pet.id),
            &pet,
            self.ttl,
        )
        .await;
        Ok(pet)
    }

    /// Lists pets, newest first.
    ///
    /// A zero limit means [`DEFAULT_LIST_LIMIT`]; larger limits are capped at
    /// [`MAX_LIST_LIMIT`]. Store-scoped pages are cached until the store's
    /// catalog changes.
    #[tracing::instrument(skip(self))]
    pub async fn list_pets(&self, mut filter: PetFilter) -> Result<PetPage, DomainError> {
        filter.limit = match filter.limit {
            0 => DEFAULT_LIST_LIMIT,
            n => n.min(MAX_LIST_LIMIT),
        };

        let key = filter
            .store_id
            .filter(|id| !id.is_nil())
            .map(|store_id| keys::pet_listing(store_id, &listing_query(&filter)));

        if let Some(key) = &key
            && let Some(page) = advisory_cache::read::<PetPage>(self.cache.as_ref(), key).await
        {
            return Ok(page);
        }

        let page = self.ledger.list_pets(&filter).await?;
        if let Some(key) = &key {
            advisory_cache::write(self.cache.as_ref(), key, &page, self.ttl).await;
        }
        Ok(page)
    }

    /// Removes an unsold pet from the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn delete_pet(&self, pet_id: PetId) -> Result<(), DomainError> {
        let pet = self.get_pet(pet_id).await?;
        if pet.status == PetStatus::Sold {
            return Err(DomainError::conflict("pet", "cannot delete a sold pet"));
        }

        if !self.ledger.delete_pet(pet_id).await? {
            // Sold or removed since it was read.
            return match self.ledger.get_pet(pet_id).await? {
                Some(_) => Err(DomainError::conflict("pet", "cannot delete a sold pet")),
                None => Err(DomainError::not_found("pet", pet_id)),
            };
        }
        tracing::info!(%pet_id, "Pet deleted");

        self.forget(&pet).await;
        Ok(())
    }

    /// Marks a pet sold outside of checkout, in its own transaction.
    /// Marking an already sold pet again is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn mark_pet_sold(&self, pet_id: PetId) -> Result<(), DomainError> {
        let pet = self.get_pet(pet_id).await?;
        if !self.ledger.mark_pet_sold(pet_id).await? {
            return Err(DomainError::not_found("pet", pet_id));
        }
        self.forget(&pet).await;
        Ok(())
    }

    /// Reveals a stored breeder email.
    pub fn decrypt_breeder_email(&self, encrypted: &str) -> Result<String, DomainError> {
        if encrypted.is_empty() {
            return Err(ValidationError::new("breeder_email", "encrypted email is empty").into());
        }
        Ok(self.encryptor.decrypt(encrypted)?)
    }

    /// Wraps a pet for display, decrypting the breeder email when `reveal` is set.
    pub fn view(&self, pet: Pet, reveal: bool) -> Result<PetView, DomainError> {
        let breeder_email = if reveal {
            Some(self.decrypt_breeder_email(&pet.breeder_email_encrypted)?)
        } else {
            None
        };
        Ok(PetView { pet, breeder_email })
    }

    async fn forget(&self, pet: &Pet) {
        let cache = self.cache.as_ref();
        advisory_cache::evict(cache, &[keys::pet(pet.store_id, pet.id)]).await;
        advisory_cache::evict_pattern(cache, &keys::pet_listings(pet.store_id)).await;
    }
}

/// The part of a listing key that identifies one page of one query.
fn listing_query(filter: &PetFilter) -> String {
    let status = filter.status.map(|s| s.as_str()).unwrap_or("any");
    let range = filter
        .created_between
        .map(|(from, to)| format!("{}-{}", from.timestamp_millis(), to.timestamp_millis()))
        .unwrap_or_else(|| "all".to_string());
    format!("{status}:{range}:{}:{}", filter.limit, filter.offset)
}
