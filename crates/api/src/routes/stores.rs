//! Store endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use common::Store;
use domain::{CreateStoreInput, Role};
use serde::Deserialize;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::{AppState, Backend};

#[derive(Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
}

/// POST /stores: open the calling merchant's store.
#[tracing::instrument(skip(state, req), fields(owner = %caller.username))]
pub async fn create<L: Backend>(
    State(state): State<Arc<AppState<L>>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CreateStoreRequest>,
) -> Result<(StatusCode, Json<Store>), ApiError> {
    caller.require(Role::Merchant)?;

    let store = state
        .stores
        .create_store(CreateStoreInput {
            name: req.name,
            owner_id: caller.username,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(store)))
}

/// GET /stores: every store, by name.
pub async fn list<L: Backend>(
    State(state): State<Arc<AppState<L>>>,
) -> Result<Json<Vec<Store>>, ApiError> {
    Ok(Json(state.stores.list_stores().await?))
}

/// GET /stores/mine: the calling merchant's store.
pub async fn mine<L: Backend>(
    State(state): State<Arc<AppState<L>>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Store>, ApiError> {
    caller.require(Role::Merchant)?;
    Ok(Json(state.stores.get_store_by_owner(&caller.username).await?))
}
