use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Author, Publisher, Tag};

/// A book row plus its association ids. The nested `publisher`, `authors`
/// and `tags` are read-time views filled only on expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: Uuid,
    pub publisher_id: Option<Uuid>,
    pub published_at: Option<NaiveDate>,
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub mark: Option<i16>,
    #[sqlx(skip)]
    pub authors_ids: Vec<Uuid>,
    #[sqlx(skip)]
    pub tags_ids: Vec<Uuid>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub publisher: Option<Publisher>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub authors: Option<Vec<Author>>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tags: Option<Vec<Tag>>,
}
