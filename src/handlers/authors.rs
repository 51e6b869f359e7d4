use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::{max_len, parse_id, patch_max_len, ExpandQuery, Validate, ValidJson, PSEUDONYM_MAX_LEN};
use crate::database::models::Author;
use crate::error::InternalError;
use crate::middleware::{ApiResponse, ApiResult, IdResponse};
use crate::router::AppState;
use crate::services::AuthorPatch;
use crate::types::{null_as_unset, Patch};

/// Identity rules (person or pseudonym) are checked by the service.
#[derive(Debug, Deserialize)]
pub struct AddAuthorRequest {
    #[serde(default)]
    pub person_id: Option<Uuid>,
    #[serde(default)]
    pub pseudonym: String,
}

impl Validate for AddAuthorRequest {
    fn validate(&self) -> Result<(), InternalError> {
        max_len("pseudonym", &self.pseudonym, PSEUDONYM_MAX_LEN)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAuthorRequest {
    #[serde(default)]
    pub person_id: Patch<Option<Uuid>>,
    #[serde(default, deserialize_with = "null_as_unset")]
    pub pseudonym: Patch<String>,
}

impl Validate for UpdateAuthorRequest {
    fn validate(&self) -> Result<(), InternalError> {
        patch_max_len("pseudonym", &self.pseudonym, PSEUDONYM_MAX_LEN)
    }
}

#[derive(Debug, Serialize)]
pub struct ListAuthorsResponse {
    pub authors: Vec<Author>,
}

pub async fn add_author(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<AddAuthorRequest>,
) -> ApiResult<IdResponse> {
    let id = state
        .authors
        .add_author(body.person_id, &body.pseudonym)
        .await
        .inspect_err(|err| tracing::error!(err = %err, "failed to add author"))?;
    Ok(ApiResponse::created(IdResponse { id }))
}

pub async fn get_author(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Query(query): Query<ExpandQuery>,
) -> ApiResult<Author> {
    let id = parse_id(&raw_id, "author")?;
    let author = state
        .authors
        .get_author(id, query.expand().person)
        .await
        .inspect_err(|err| tracing::error!(author_id = %id, err = %err, "failed to get author"))?;
    Ok(ApiResponse::success(author))
}

pub async fn update_author(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ValidJson(body): ValidJson<UpdateAuthorRequest>,
) -> ApiResult<()> {
    let id = parse_id(&raw_id, "author")?;
    let patch = AuthorPatch {
        person_id: body.person_id,
        pseudonym: body.pseudonym,
    };
    state
        .authors
        .update_author(id, patch)
        .await
        .inspect_err(|err| tracing::error!(author_id = %id, err = %err, "failed to update author"))?;
    Ok(ApiResponse::ok())
}

pub async fn remove_author(State(state): State<AppState>, Path(raw_id): Path<String>) -> ApiResult<()> {
    let id = parse_id(&raw_id, "author")?;
    state
        .authors
        .remove_author(id)
        .await
        .inspect_err(|err| tracing::error!(author_id = %id, err = %err, "failed to remove author"))?;
    Ok(ApiResponse::ok())
}

pub async fn list_authors(
    State(state): State<AppState>,
    Query(query): Query<ExpandQuery>,
) -> ApiResult<ListAuthorsResponse> {
    let authors = state
        .authors
        .list_authors(query.expand().person)
        .await
        .inspect_err(|err| tracing::error!(err = %err, "failed to list authors"))?;
    Ok(ApiResponse::success(ListAuthorsResponse { authors }))
}
