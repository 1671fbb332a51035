//! Domain layer for the pet store.
//!
//! This crate provides:
//! - The order fulfillment engine ([`OrderService`]): race-free checkout
//!   with partial fulfillment and post-commit cache reconciliation
//! - Catalog services for pets and stores
//! - Input validation and sanitization
//! - Field encryption for breeder contact details
//! - The injectable credential lookup used by the transport layer

mod advisory_cache;

pub mod auth;
pub mod catalog;
pub mod encryption;
pub mod error;
pub mod order;
pub mod validation;

pub use auth::{Credential, CredentialStore, InMemoryCredentialStore, Role};
pub use catalog::{CreatePetInput, CreateStoreInput, PetService, PetView, StoreService};
pub use encryption::{AesGcmEncryptor, EncryptionError, FieldEncryptor};
pub use error::{DomainError, PartialFulfillmentError, ValidationError};
pub use order::{CreateOrderInput, OrderOutcome, OrderService};
