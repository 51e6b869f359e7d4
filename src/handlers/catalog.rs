//! Handlers shared by publishers, tags and genres. Each route instantiates
//! them for one entity type, e.g. `get(catalog::list::<Tag>)`.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use super::request::{max_len, parse_id, required, Validate, ValidJson, NAME_MAX_LEN};
use crate::database::models::{Genre, Named, Publisher, Tag};
use crate::error::InternalError;
use crate::middleware::{ApiResponse, ApiResult, IdResponse};
use crate::router::AppState;
use crate::services::NamedService;

pub trait CatalogEntity: Named + Sized + Serialize + Send + Sync + 'static {
    /// Key wrapping the list response, e.g. `{"tags": [...]}`.
    const LIST_KEY: &'static str;

    fn service(state: &AppState) -> &NamedService<Self>;
}

impl CatalogEntity for Publisher {
    const LIST_KEY: &'static str = "publishers";

    fn service(state: &AppState) -> &NamedService<Self> {
        &state.publishers
    }
}

impl CatalogEntity for Tag {
    const LIST_KEY: &'static str = "tags";

    fn service(state: &AppState) -> &NamedService<Self> {
        &state.tags
    }
}

impl CatalogEntity for Genre {
    const LIST_KEY: &'static str = "genres";

    fn service(state: &AppState) -> &NamedService<Self> {
        &state.genres
    }
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

impl Validate for NameRequest {
    fn validate(&self) -> Result<(), InternalError> {
        required("name", &self.name)?;
        max_len("name", &self.name, NAME_MAX_LEN)
    }
}

pub async fn add<T: CatalogEntity>(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<NameRequest>,
) -> ApiResult<IdResponse> {
    let id = T::service(&state)
        .add(&body.name)
        .await
        .inspect_err(|err| tracing::error!(entity = T::ENTITY, err = %err, "failed to add"))?;
    Ok(ApiResponse::created(IdResponse { id }))
}

pub async fn get<T: CatalogEntity>(State(state): State<AppState>, Path(raw_id): Path<String>) -> ApiResult<T> {
    let id = parse_id(&raw_id, T::ENTITY)?;
    let entity = T::service(&state)
        .get(id)
        .await
        .inspect_err(|err| tracing::error!(entity = T::ENTITY, id = %id, err = %err, "failed to get"))?;
    Ok(ApiResponse::success(entity))
}

pub async fn update<T: CatalogEntity>(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ValidJson(body): ValidJson<NameRequest>,
) -> ApiResult<()> {
    let id = parse_id(&raw_id, T::ENTITY)?;
    T::service(&state)
        .update(id, &body.name)
        .await
        .inspect_err(|err| tracing::error!(entity = T::ENTITY, id = %id, err = %err, "failed to update"))?;
    Ok(ApiResponse::ok())
}

pub async fn remove<T: CatalogEntity>(State(state): State<AppState>, Path(raw_id): Path<String>) -> ApiResult<()> {
    let id = parse_id(&raw_id, T::ENTITY)?;
    T::service(&state)
        .remove(id)
        .await
        .inspect_err(|err| tracing::error!(entity = T::ENTITY, id = %id, err = %err, "failed to remove"))?;
    Ok(ApiResponse::ok())
}

pub async fn list<T: CatalogEntity>(State(state): State<AppState>) -> ApiResult<BTreeMap<&'static str, Vec<T>>> {
    let entities = T::service(&state)
        .list()
        .await
        .inspect_err(|err| tracing::error!(entity = T::ENTITY, err = %err, "failed to list"))?;
    Ok(ApiResponse::success(BTreeMap::from([(T::LIST_KEY, entities)])))
}
