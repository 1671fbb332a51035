//! Shared application state.

use std::sync::Arc;

use cache::Cache;
use domain::{CredentialStore, OrderService, PetService, StoreService};
use ledger::{CatalogStore, InventoryLedger};

/// Storage the server can run on: the transaction protocol plus catalog CRUD.
pub trait Backend: InventoryLedger + CatalogStore + Clone + 'static {}

impl<T> Backend for T where T: InventoryLedger + CatalogStore + Clone + 'static {}

/// Shared application state accessible from all handlers.
pub struct AppState<L: Backend> {
    pub orders: OrderService<L>,
    pub pets: PetService<L>,
    pub stores: StoreService<L>,
    pub credentials: Arc<dyn CredentialStore>,
    pub cache: Arc<dyn Cache>,
}
