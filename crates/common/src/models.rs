//! Records persisted by the inventory ledger.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OrderId, OrderItemId, PetId, StoreId};

/// Error returned when a persisted enum value is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl std::fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseEnumError {}

/// Lifecycle state of a pet.
///
/// A pet only ever moves from `Available` to `Sold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetStatus {
    Available,
    Sold,
}

impl PetStatus {
    /// The value stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            PetStatus::Available => "available",
            PetStatus::Sold => "sold",
        }
    }
}

impl std::fmt::Display for PetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PetStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(PetStatus::Available),
            "sold" => Ok(PetStatus::Sold),
            other => Err(ParseEnumError {
                kind: "pet status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Cat,
    Dog,
    Frog,
}

impl Species {
    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Cat => "Cat",
            Species::Dog => "Dog",
            Species::Frog => "Frog",
        }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Species {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cat" => Ok(Species::Cat),
            "Dog" => Ok(Species::Dog),
            "Frog" => Ok(Species::Frog),
            other => Err(ParseEnumError {
                kind: "species",
                value: other.to_string(),
            }),
        }
    }
}

/// A sellable pet owned by a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub id: PetId,
    pub store_id: StoreId,
    pub name: String,
    pub species: Species,
    pub age: i32,
    pub picture_url: Option<String>,
    pub description: Option<String>,
    pub breeder_name: String,
    /// Breeder email, encrypted at rest.
    pub breeder_email_encrypted: String,
    pub status: PetStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pet {
    pub fn is_available(&self) -> bool {
        self.status == PetStatus::Available
    }
}

/// A store; each owner has at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order produced by one checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: String,
    pub store_id: StoreId,
    /// Declared pet count. Starts as the requested count and is corrected
    /// once when only part of the request could be fulfilled.
    pub total_pets: u32,
    pub created_at: DateTime<Utc>,
}

/// Purchase record linking an order to one sold pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub pet_id: PetId,
    pub purchased_at: DateTime<Utc>,
}

/// Filter for catalog listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PetFilter {
    pub store_id: Option<StoreId>,
    pub status: Option<PetStatus>,
    /// Inclusive `created_at` range; only applied when both ends are known.
    pub created_between: Option<(DateTime<Utc>, DateTime<Utc>)>,
    pub limit: usize,
    pub offset: usize,
}

impl PetFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, store_id: StoreId) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn status(mut self, status: PetStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn created_between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.created_between = Some((from, to));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Returns true if the pet satisfies every criterion except paging.
    pub fn matches(&self, pet: &Pet) -> bool {
        if let Some(store_id) = self.store_id
            && !store_id.is_nil()
            && pet.store_id != store_id
        {
            return false;
        }
        if let Some(status) = self.status
            && pet.status != status
        {
            return false;
        }
        if let Some((from, to)) = self.created_between
            && (pet.created_at < from || pet.created_at > to)
        {
            return false;
        }
        true
    }
}

/// One page of a catalog listing plus the unpaged total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetPage {
    pub pets: Vec<Pet>,
    pub total: usize,
}
