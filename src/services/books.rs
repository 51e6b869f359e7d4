//! Book aggregate: reference validation on write, selective expansion on read.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::database::models::Book;
use crate::error::{Result, ResultExt, BOOK_INVALID_FIELDS};
use crate::services::authors::AuthorsService;
use crate::services::catalog::{PublishersService, TagsService};
use crate::types::{Expand, Patch};

#[derive(Debug, Clone, Default)]
pub struct CreateBookInput {
    pub title: String,
    pub publisher_id: Option<Uuid>,
    pub authors_ids: Vec<Uuid>,
    pub tags_ids: Vec<Uuid>,
    pub published_at: Option<NaiveDate>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub mark: Option<i16>,
}

/// Partial book update. For the id lists `Unset` keeps the current
/// associations and `Set(vec![])` clears them.
#[derive(Debug, Clone, Default)]
pub struct UpdateBookPatch {
    pub title: Patch<String>,
    pub publisher_id: Patch<Option<Uuid>>,
    pub published_at: Patch<Option<NaiveDate>>,
    pub description: Patch<Option<String>>,
    pub price: Patch<Option<f64>>,
    pub mark: Patch<Option<i16>>,
    pub authors_ids: Patch<Vec<Uuid>>,
    pub tags_ids: Patch<Vec<Uuid>>,
}

impl UpdateBookPatch {
    /// True when at least one column of the book row itself changes.
    pub fn has_scalar_changes(&self) -> bool {
        self.title.is_set()
            || self.publisher_id.is_set()
            || self.published_at.is_set()
            || self.description.is_set()
            || self.price.is_set()
            || self.mark.is_set()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_scalar_changes() && !self.authors_ids.is_set() && !self.tags_ids.is_set()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListBookParameters {
    /// Keep only books written by every one of these authors.
    pub authors_ids: Vec<Uuid>,
}

/// Storage returns books with `authors_ids` and `tags_ids` filled in.
/// `add_book` and `update_book` write the row and both association sets in
/// one transaction; `update_book` fails `BOOK_NOT_FOUND` even when only
/// associations are patched.
#[async_trait]
pub trait BooksStorage: Send + Sync {
    async fn add_book(&self, input: &CreateBookInput) -> Result<Uuid>;
    async fn get_book(&self, id: Uuid) -> Result<Book>;
    async fn update_book(&self, id: Uuid, patch: &UpdateBookPatch) -> Result<()>;
    async fn remove_book(&self, id: Uuid) -> Result<()>;
    async fn list_books(&self, params: &ListBookParameters) -> Result<Vec<Book>>;
}

pub struct BooksService {
    storage: Arc<dyn BooksStorage>,
    authors: Arc<AuthorsService>,
    publishers: Arc<PublishersService>,
    tags: Arc<TagsService>,
}

impl BooksService {
    pub fn new(
        storage: Arc<dyn BooksStorage>,
        authors: Arc<AuthorsService>,
        publishers: Arc<PublishersService>,
        tags: Arc<TagsService>,
    ) -> Self {
        Self {
            storage,
            authors,
            publishers,
            tags,
        }
    }

    pub async fn add_book(&self, mut input: CreateBookInput) -> Result<Uuid> {
        input.title = input.title.trim().to_string();
        if input.title.is_empty() {
            return Err(BOOK_INVALID_FIELDS.into());
        }
        input.authors_ids = dedup(input.authors_ids);
        input.tags_ids = dedup(input.tags_ids);

        if let Some(publisher_id) = input.publisher_id {
            self.validate_publisher(publisher_id).await?;
        }
        self.validate_authors(&input.authors_ids).await?;
        self.validate_tags(&input.tags_ids).await?;

        self.storage
            .add_book(&input)
            .await
            .context("failed to add book to storage")
    }

    pub async fn get_book(&self, id: Uuid, expand: Expand) -> Result<Book> {
        let mut book = self
            .storage
            .get_book(id)
            .await
            .context("failed to get book from storage")?;
        self.expand_book(&mut book, expand).await?;
        Ok(book)
    }

    pub async fn update_book(&self, id: Uuid, mut patch: UpdateBookPatch) -> Result<()> {
        if patch.is_empty() {
            return Err(BOOK_INVALID_FIELDS.into());
        }

        patch.title = patch.title.map(|t| t.trim().to_string());
        if matches!(patch.title.as_set(), Some(t) if t.is_empty()) {
            return Err(BOOK_INVALID_FIELDS.into());
        }
        patch.authors_ids = patch.authors_ids.map(dedup);
        patch.tags_ids = patch.tags_ids.map(dedup);

        if let Patch::Set(Some(publisher_id)) = patch.publisher_id {
            self.validate_publisher(publisher_id).await?;
        }
        if let Patch::Set(authors_ids) = &patch.authors_ids {
            self.validate_authors(authors_ids).await?;
        }
        if let Patch::Set(tags_ids) = &patch.tags_ids {
            self.validate_tags(tags_ids).await?;
        }

        self.storage
            .update_book(id, &patch)
            .await
            .context("failed to update book in storage")
    }

    pub async fn remove_book(&self, id: Uuid) -> Result<()> {
        self.storage
            .remove_book(id)
            .await
            .context("failed to remove book from storage")
    }

    pub async fn list_books(&self, mut params: ListBookParameters, expand: Expand) -> Result<Vec<Book>> {
        params.authors_ids = dedup(params.authors_ids);
        let mut books = self
            .storage
            .list_books(&params)
            .await
            .context("failed to list books from storage")?;
        if expand.any_book_relation() {
            for book in books.iter_mut() {
                self.expand_book(book, expand).await?;
            }
        }
        Ok(books)
    }

    async fn expand_book(&self, book: &mut Book, expand: Expand) -> Result<()> {
        if expand.publisher {
            if let Some(publisher_id) = book.publisher_id {
                let publisher = self
                    .publishers
                    .get(publisher_id)
                    .await
                    .with_context(|| format!("failed to expand publisher {publisher_id}"))?;
                book.publisher = Some(publisher);
            }
        }

        if expand.authors && !book.authors_ids.is_empty() {
            let mut authors = Vec::with_capacity(book.authors_ids.len());
            for author_id in &book.authors_ids {
                let author = self
                    .authors
                    .get_author(*author_id, true)
                    .await
                    .with_context(|| format!("failed to expand author {author_id}"))?;
                authors.push(author);
            }
            book.authors = Some(authors);
        }

        if expand.tags && !book.tags_ids.is_empty() {
            let mut tags = Vec::with_capacity(book.tags_ids.len());
            for tag_id in &book.tags_ids {
                let tag = self
                    .tags
                    .get(*tag_id)
                    .await
                    .with_context(|| format!("failed to expand tag {tag_id}"))?;
                tags.push(tag);
            }
            book.tags = Some(tags);
        }

        Ok(())
    }

    async fn validate_publisher(&self, id: Uuid) -> Result<()> {
        self.publishers
            .get(id)
            .await
            .with_context(|| format!("failed to validate publisher {id}"))?;
        Ok(())
    }

    async fn validate_authors(&self, ids: &[Uuid]) -> Result<()> {
        for id in ids {
            self.authors
                .get_author(*id, false)
                .await
                .with_context(|| format!("failed to validate author {id}"))?;
        }
        Ok(())
    }

    async fn validate_tags(&self, ids: &[Uuid]) -> Result<()> {
        for id in ids {
            self.tags
                .get(*id)
                .await
                .with_context(|| format!("failed to validate tag {id}"))?;
        }
        Ok(())
    }
}

/// Drops repeated ids, keeping first-seen order.
fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
