//! Catalog services: stores and the pets they list.

mod pet;
mod store;

pub use pet::{PetService, PetView};
pub use store::StoreService;

use common::{Species, StoreId};
use serde::{Deserialize, Serialize};

/// Input for listing a new pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePetInput {
    pub store_id: StoreId,
    pub name: String,
    pub species: Species,
    pub age: i32,
    pub picture_url: Option<String>,
    pub description: Option<String>,
    pub breeder_name: String,
    /// Plaintext; encrypted before it is stored.
    pub breeder_email: String,
}

/// Input for opening a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateStoreInput {
    pub name: String,
    pub owner_id: String,
}
