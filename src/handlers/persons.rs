use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use super::request::{max_len, parse_id, patch_max_len, required, Validate, ValidJson, PERSON_NAME_MAX_LEN};
use crate::database::models::Person;
use crate::error::InternalError;
use crate::middleware::{ApiResponse, ApiResult, IdResponse};
use crate::router::AppState;
use crate::services::PersonPatch;
use crate::types::{null_as_unset, Patch};

#[derive(Debug, Deserialize)]
pub struct AddPersonRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: String,
}

impl Validate for AddPersonRequest {
    fn validate(&self) -> Result<(), InternalError> {
        required("first_name", &self.first_name)?;
        max_len("first_name", &self.first_name, PERSON_NAME_MAX_LEN)?;
        required("last_name", &self.last_name)?;
        max_len("last_name", &self.last_name, PERSON_NAME_MAX_LEN)?;
        max_len("middle_name", &self.middle_name, PERSON_NAME_MAX_LEN)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePersonRequest {
    #[serde(default, deserialize_with = "null_as_unset")]
    pub first_name: Patch<String>,
    #[serde(default, deserialize_with = "null_as_unset")]
    pub last_name: Patch<String>,
    #[serde(default, deserialize_with = "null_as_unset")]
    pub middle_name: Patch<String>,
}

impl Validate for UpdatePersonRequest {
    fn validate(&self) -> Result<(), InternalError> {
        patch_max_len("first_name", &self.first_name, PERSON_NAME_MAX_LEN)?;
        patch_max_len("last_name", &self.last_name, PERSON_NAME_MAX_LEN)?;
        patch_max_len("middle_name", &self.middle_name, PERSON_NAME_MAX_LEN)
    }
}

#[derive(Debug, Serialize)]
pub struct ListPersonsResponse {
    pub persons: Vec<Person>,
}

pub async fn add_person(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<AddPersonRequest>,
) -> ApiResult<IdResponse> {
    let id = state
        .persons
        .add_person(&body.first_name, &body.last_name, &body.middle_name)
        .await
        .inspect_err(|err| tracing::error!(err = %err, "failed to add person"))?;
    Ok(ApiResponse::created(IdResponse { id }))
}

pub async fn get_person(State(state): State<AppState>, Path(raw_id): Path<String>) -> ApiResult<Person> {
    let id = parse_id(&raw_id, "person")?;
    let person = state
        .persons
        .get_person(id)
        .await
        .inspect_err(|err| tracing::error!(person_id = %id, err = %err, "failed to get person"))?;
    Ok(ApiResponse::success(person))
}

pub async fn update_person(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ValidJson(body): ValidJson<UpdatePersonRequest>,
) -> ApiResult<()> {
    let id = parse_id(&raw_id, "person")?;
    let patch = PersonPatch {
        first_name: body.first_name,
        last_name: body.last_name,
        middle_name: body.middle_name,
    };
    state
        .persons
        .update_person(id, patch)
        .await
        .inspect_err(|err| tracing::error!(person_id = %id, err = %err, "failed to update person"))?;
    Ok(ApiResponse::ok())
}

pub async fn remove_person(State(state): State<AppState>, Path(raw_id): Path<String>) -> ApiResult<()> {
    let id = parse_id(&raw_id, "person")?;
    state
        .persons
        .remove_person(id)
        .await
        .inspect_err(|err| tracing::error!(person_id = %id, err = %err, "failed to remove person"))?;
    Ok(ApiResponse::ok())
}

pub async fn list_persons(State(state): State<AppState>) -> ApiResult<ListPersonsResponse> {
    let persons = state
        .persons
        .list_persons()
        .await
        .inspect_err(|err| tracing::error!(err = %err, "failed to list persons"))?;
    Ok(ApiResponse::success(ListPersonsResponse { persons }))
}
