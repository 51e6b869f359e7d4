use axum::extract::{Path, Query, State};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::{
    max_len, non_negative, parse_id, range, required, ExpandQuery, ListBooksQuery, Validate, ValidJson,
    DESCRIPTION_MAX_LEN, MARK_MAX, TITLE_MAX_LEN,
};
use crate::database::models::Book;
use crate::error::InternalError;
use crate::middleware::{ApiResponse, ApiResult, IdResponse};
use crate::router::AppState;
use crate::services::{CreateBookInput, ListBookParameters, UpdateBookPatch};
use crate::types::{null_as_unset, Patch};

#[derive(Debug, Deserialize)]
pub struct AddBookRequest {
    pub title: String,
    #[serde(default)]
    pub publisher_id: Option<Uuid>,
    #[serde(default)]
    pub authors_ids: Vec<Uuid>,
    #[serde(default)]
    pub tags_ids: Vec<Uuid>,
    #[serde(default)]
    pub published_at: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub mark: Option<i16>,
}

impl Validate for AddBookRequest {
    fn validate(&self) -> Result<(), InternalError> {
        required("title", &self.title)?;
        max_len("title", &self.title, TITLE_MAX_LEN)?;
        if let Some(description) = &self.description {
            max_len("description", description, DESCRIPTION_MAX_LEN)?;
        }
        if let Some(price) = self.price {
            non_negative("price", price)?;
        }
        if let Some(mark) = self.mark {
            range("mark", mark, 0, MARK_MAX)?;
        }
        Ok(())
    }
}

/// Absent fields are left alone; `null` clears a nullable column and `[]`
/// clears an association list. `null` for `title` or a list is a no-op.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookRequest {
    #[serde(default, deserialize_with = "null_as_unset")]
    pub title: Patch<String>,
    #[serde(default)]
    pub publisher_id: Patch<Option<Uuid>>,
    #[serde(default, deserialize_with = "null_as_unset")]
    pub authors_ids: Patch<Vec<Uuid>>,
    #[serde(default, deserialize_with = "null_as_unset")]
    pub tags_ids: Patch<Vec<Uuid>>,
    #[serde(default)]
    pub published_at: Patch<Option<NaiveDate>>,
    #[serde(default)]
    pub description: Patch<Option<String>>,
    #[serde(default)]
    pub price: Patch<Option<f64>>,
    #[serde(default)]
    pub mark: Patch<Option<i16>>,
}

impl Validate for UpdateBookRequest {
    fn validate(&self) -> Result<(), InternalError> {
        if let Patch::Set(title) = &self.title {
            required("title", title)?;
            max_len("title", title, TITLE_MAX_LEN)?;
        }
        if let Patch::Set(Some(description)) = &self.description {
            max_len("description", description, DESCRIPTION_MAX_LEN)?;
        }
        if let Patch::Set(Some(price)) = self.price {
            non_negative("price", price)?;
        }
        if let Patch::Set(Some(mark)) = self.mark {
            range("mark", mark, 0, MARK_MAX)?;
        }
        Ok(())
    }
}

impl From<AddBookRequest> for CreateBookInput {
    fn from(body: AddBookRequest) -> Self {
        Self {
            title: body.title,
            publisher_id: body.publisher_id,
            authors_ids: body.authors_ids,
            tags_ids: body.tags_ids,
            published_at: body.published_at,
            description: body.description,
            price: body.price,
            mark: body.mark,
        }
    }
}

impl From<UpdateBookRequest> for UpdateBookPatch {
    fn from(body: UpdateBookRequest) -> Self {
        Self {
            title: body.title,
            publisher_id: body.publisher_id,
            published_at: body.published_at,
            description: body.description,
            price: body.price,
            mark: body.mark,
            authors_ids: body.authors_ids,
            tags_ids: body.tags_ids,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListBooksResponse {
    pub books: Vec<Book>,
}

pub async fn add_book(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<AddBookRequest>,
) -> ApiResult<IdResponse> {
    let id = state
        .books
        .add_book(body.into())
        .await
        .inspect_err(|err| tracing::error!(err = %err, "failed to add book"))?;
    Ok(ApiResponse::created(IdResponse { id }))
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Query(query): Query<ExpandQuery>,
) -> ApiResult<Book> {
    let id = parse_id(&raw_id, "book")?;
    let book = state
        .books
        .get_book(id, query.expand())
        .await
        .inspect_err(|err| tracing::error!(book_id = %id, err = %err, "failed to get book"))?;
    Ok(ApiResponse::success(book))
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    ValidJson(body): ValidJson<UpdateBookRequest>,
) -> ApiResult<()> {
    let id = parse_id(&raw_id, "book")?;
    state
        .books
        .update_book(id, body.into())
        .await
        .inspect_err(|err| tracing::error!(book_id = %id, err = %err, "failed to update book"))?;
    Ok(ApiResponse::ok())
}

pub async fn remove_book(State(state): State<AppState>, Path(raw_id): Path<String>) -> ApiResult<()> {
    let id = parse_id(&raw_id, "book")?;
    state
        .books
        .remove_book(id)
        .await
        .inspect_err(|err| tracing::error!(book_id = %id, err = %err, "failed to remove book"))?;
    Ok(ApiResponse::ok())
}

pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<ListBooksQuery>,
) -> ApiResult<ListBooksResponse> {
    let params = ListBookParameters {
        authors_ids: query.authors_ids()?,
    };
    let books = state
        .books
        .list_books(params, query.expand())
        .await
        .inspect_err(|err| tracing::error!(err = %err, "failed to list books"))?;
    Ok(ApiResponse::success(ListBooksResponse { books }))
}
