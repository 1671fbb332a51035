//! Pet catalog endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use common::{PetFilter, PetId, PetStatus, Species, StoreId};
use domain::{CreatePetInput, DomainError, PetView, Role};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::{AppState, Backend};

#[derive(Deserialize)]
pub struct CreatePetRequest {
    pub name: String,
    pub species: Species,
    pub age: i32,
    pub picture_url: Option<String>,
    pub description: Option<String>,
    pub breeder_name: String,
    pub breeder_email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPetsQuery {
    pub store_id: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl ListPetsQuery {
    fn into_filter(self) -> Result<PetFilter, ApiError> {
        let mut filter = PetFilter::new()
            .limit(self.limit.unwrap_or_default())
            .offset(self.offset.unwrap_or_default());
        if let Some(store_id) = self.store_id {
            filter = filter.store(parse_id("store", &store_id)?);
        }
        if let Some(status) = self.status {
            let status: PetStatus = status
                .parse()
                .map_err(|e: common::ParseEnumError| ApiError::BadRequest(e.to_string()))?;
            filter = filter.status(status);
        }
        match (self.created_after, self.created_before) {
            (Some(from), Some(to)) => Ok(filter.created_between(from, to)),
            (None, None) => Ok(filter),
            _ => Err(ApiError::BadRequest(
                "created_after and created_before must be given together".to_string(),
            )),
        }
    }
}

#[derive(Serialize)]
pub struct PetListResponse {
    pub pets: Vec<PetView>,
    pub total: usize,
}

/// POST /pets: list a pet in the calling merchant's store.
#[tracing::instrument(skip(state, req), fields(merchant = %caller.username))]
pub async fn create<L: Backend>(
    State(state): State<Arc<AppState<L>>>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CreatePetRequest>,
) -> Result<(StatusCode, Json<PetView>), ApiError> {
    caller.require(Role::Merchant)?;
    let store = state.stores.get_store_by_owner(&caller.username).await?;

    let pet = state
        .pets
        .create_pet(CreatePetInput {
            store_id: store.id,
            name: req.name,
            species: req.species,
            age: req.age,
            picture_url: req.picture_url,
            description: req.description,
            breeder_name: req.breeder_name,
            breeder_email: req.breeder_email,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(state.pets.view(pet, true)?)))
}

/// GET /pets
pub async fn list<L: Backend>(
    State(state): State<Arc<AppState<L>>>,
    Query(query): Query<ListPetsQuery>,
) -> Result<Json<PetListResponse>, ApiError> {
    let page = state.pets.list_pets(query.into_filter()?).await?;
    let pets = page
        .pets
        .into_iter()
        .map(|pet| state.pets.view(pet, false))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(PetListResponse {
        pets,
        total: page.total,
    }))
}

/// GET /pets/{id}: the breeder email is revealed to the owning merchant only.
pub async fn get<L: Backend>(
    State(state): State<Arc<AppState<L>>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<PetView>, ApiError> {
    let pet_id: PetId = parse_id("pet", &id)?;
    let pet = state.pets.get_pet(pet_id).await?;
    let reveal = owns_store(&state, &caller, pet.store_id).await?;
    Ok(Json(state.pets.view(pet, reveal)?))
}

/// DELETE /pets/{id}
pub async fn delete<L: Backend>(
    State(state): State<Arc<AppState<L>>>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require(Role::Merchant)?;
    let pet_id: PetId = parse_id("pet", &id)?;
    let pet = state.pets.get_pet(pet_id).await?;
    if !owns_store(&state, &caller, pet.store_id).await? {
        return Err(ApiError::Forbidden("not your pet".to_string()));
    }
    state.pets.delete_pet(pet_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn owns_store<L: Backend>(
    state: &AppState<L>,
    caller: &Caller,
    store_id: StoreId,
) -> Result<bool, ApiError> {
    if caller.role != Role::Merchant {
        return Ok(false);
    }
    match state.stores.get_store_by_owner(&caller.username).await {
        Ok(store) => Ok(store.id == store_id),
        Err(DomainError::NotFound { .. }) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
