//! Order endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use common::{Order, OrderId, Pet, PetId, StoreId};
use domain::{CreateOrderInput, DomainError, OrderOutcome, Role};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::{AppState, Backend};

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    /// Defaults to the store of the first requested pet.
    pub store_id: Option<StoreId>,
    #[serde(default)]
    pub pet_ids: Vec<PetId>,
}

#[derive(Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    /// Pets actually sold by this order.
    pub pet_ids: Vec<PetId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected_pet_ids: Vec<PetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<OrderOutcome> for OrderResponse {
    fn from(outcome: OrderOutcome) -> Self {
        let pet_ids = outcome.fulfilled().collect();
        let rejected_pet_ids = outcome.rejected().to_vec();
        let warning = outcome.rejection.as_ref().map(ToString::to_string);
        Self {
            order: outcome.order,
            pet_ids,
            rejected_pet_ids,
            warning,
        }
    }
}

/// POST /orders: buy pets; unavailable ones are listed as rejected.
#[tracing::instrument(skip(state, req), fields(customer = %caller.username))]
pub async fn create<L: Backend>(
    State(state): State<Arc<AppState<L>>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    caller.require(Role::Customer)?;

    let store_id = match req.store_id {
        Some(store_id) => store_id,
        None => resolve_store(&state, &req.pet_ids).await?,
    };

    let outcome = state
        .orders
        .create_order(CreateOrderInput::new(caller.username, store_id, req.pet_ids))
        .await?;

    if outcome.is_partial() {
        tracing::info!(
            order_id = %outcome.order.id,
            rejected = outcome.rejected().len(),
            "order partially fulfilled"
        );
    }

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

/// GET /orders/{id}
pub async fn get<L: Backend>(
    State(state): State<Arc<AppState<L>>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id: OrderId = parse_id("order", &id)?;
    let order = state.orders.get_order(order_id).await?;
    authorize(&state, &caller, &order).await?;
    Ok(Json(order))
}

/// GET /orders/{id}/pets: the pets sold by an order.
pub async fn pets<L: Backend>(
    State(state): State<Arc<AppState<L>>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Pet>>, ApiError> {
    let order_id: OrderId = parse_id("order", &id)?;
    let order = state.orders.get_order(order_id).await?;
    authorize(&state, &caller, &order).await?;
    Ok(Json(state.orders.get_order_pets(order_id).await?))
}

/// Picks the store of the first requested pet. Malformed requests get a nil
/// store so that validation reports the real problem.
async fn resolve_store<L: Backend>(
    state: &AppState<L>,
    pet_ids: &[PetId],
) -> Result<StoreId, ApiError> {
    match pet_ids.first() {
        Some(pet_id) if !pet_id.is_nil() => Ok(state.pets.get_pet(*pet_id).await?.store_id),
        _ => Ok(StoreId::nil()),
    }
}

/// Customers see their own orders; merchants see orders placed with their store.
async fn authorize<L: Backend>(
    state: &AppState<L>,
    caller: &Caller,
    order: &Order,
) -> Result<(), ApiError> {
    let allowed = match caller.role {
        Role::Customer => order.customer_id == caller.username,
        Role::Merchant => match state.stores.get_store_by_owner(&caller.username).await {
            Ok(store) => store.id == order.store_id,
            Err(DomainError::NotFound { .. }) => false,
            Err(e) => return Err(e.into()),
        },
    };
    if allowed {
        Ok(())
    } else {
        Err(ApiError::Forbidden("not your order".to_string()))
    }
}
