use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{map_violation, CHECK_VIOLATION, FOREIGN_KEY_VIOLATION, UNIQUE_VIOLATION};
use crate::database::models::Book;
use crate::error::{
    InternalError, Result, ResultExt, BOOK_ALREADY_EXISTS, BOOK_INVALID_FIELDS, BOOK_NOT_FOUND,
    PUBLISHER_NOT_FOUND,
};
use crate::services::{BooksStorage, CreateBookInput, ListBookParameters, UpdateBookPatch};
use crate::types::Patch;

const BOOK_COLUMNS: &str = "id, publisher_id, published_at, title, description, price, mark";

const VIOLATIONS: [(&str, InternalError); 3] = [
    (UNIQUE_VIOLATION, BOOK_ALREADY_EXISTS),
    (CHECK_VIOLATION, BOOK_INVALID_FIELDS),
    (FOREIGN_KEY_VIOLATION, PUBLISHER_NOT_FOUND),
];

/// Many-to-many link tables owned by a book.
#[derive(Debug, Clone, Copy)]
enum Association {
    Authors,
    Tags,
}

impl Association {
    fn table(self) -> &'static str {
        match self {
            Association::Authors => "books_authors",
            Association::Tags => "books_tags",
        }
    }

    fn column(self) -> &'static str {
        match self {
            Association::Authors => "author_id",
            Association::Tags => "tag_id",
        }
    }
}

pub struct BooksPg {
    pool: PgPool,
}

impl BooksPg {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fills `authors_ids` and `tags_ids` for every book with one query per
    /// association table.
    async fn attach_associations(&self, books: &mut [Book]) -> Result<()> {
        if books.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = books.iter().map(|b| b.id).collect();

        let mut authors = self.load_associations(Association::Authors, &ids).await?;
        let mut tags = self.load_associations(Association::Tags, &ids).await?;

        for book in books.iter_mut() {
            book.authors_ids = authors.remove(&book.id).unwrap_or_default();
            book.tags_ids = tags.remove(&book.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn load_associations(
        &self,
        association: Association,
        book_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Uuid>>> {
        let sql = format!(
            "SELECT book_id, {column} FROM {table} WHERE book_id = ANY($1) ORDER BY book_id, {column}",
            table = association.table(),
            column = association.column(),
        );
        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(&sql)
            .bind(book_ids)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("select {}", association.table()))?;

        let mut by_book: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (book_id, related_id) in rows {
            by_book.entry(book_id).or_default().push(related_id);
        }
        Ok(by_book)
    }
}

/// Writes the association set of one book. With `force` the existing rows
/// are deleted first, so the stored set becomes exactly `ids`.
async fn replace_associations(
    conn: &mut PgConnection,
    association: Association,
    book_id: Uuid,
    ids: &[Uuid],
    force: bool,
) -> Result<()> {
    if force {
        let sql = format!("DELETE FROM {} WHERE book_id = $1", association.table());
        sqlx::query(&sql)
            .bind(book_id)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("delete {}", association.table()))?;
    }
    if ids.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "INSERT INTO {} (book_id, {}) ",
        association.table(),
        association.column()
    ));
    builder.push_values(ids, |mut row, id| {
        row.push_bind(book_id).push_bind(*id);
    });
    builder.push(" ON CONFLICT DO NOTHING");
    builder
        .build()
        .execute(&mut *conn)
        .await
        .with_context(|| format!("insert {}", association.table()))?;
    Ok(())
}

async fn ensure_book_exists(conn: &mut PgConnection, id: Uuid) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM books WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .context("check book exists")?;
    if !exists {
        return Err(BOOK_NOT_FOUND.into());
    }
    Ok(())
}

#[async_trait]
impl BooksStorage for BooksPg {
    async fn add_book(&self, input: &CreateBookInput) -> Result<Uuid> {
        if input.title.trim().is_empty() {
            return Err(BOOK_INVALID_FIELDS.into());
        }

        let mut tx = self.pool.begin().await.context("begin transaction")?;

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO books (publisher_id, published_at, title, description, price, mark) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(input.publisher_id)
        .bind(input.published_at)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.mark)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_violation(e, &VIOLATIONS))
        .context("insert book")?;

        replace_associations(&mut tx, Association::Authors, id, &input.authors_ids, false).await?;
        replace_associations(&mut tx, Association::Tags, id, &input.tags_ids, false).await?;

        tx.commit().await.context("commit transaction")?;
        Ok(id)
    }

    async fn get_book(&self, id: Uuid) -> Result<Book> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1");
        let book = sqlx::query_as::<_, Book>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("select book")?
            .ok_or(BOOK_NOT_FOUND)?;

        let mut books = [book];
        self.attach_associations(&mut books).await?;
        let [book] = books;
        Ok(book)
    }

    async fn update_book(&self, id: Uuid, patch: &UpdateBookPatch) -> Result<()> {
        if matches!(patch.title.as_set(), Some(t) if t.trim().is_empty()) {
            return Err(BOOK_INVALID_FIELDS.into());
        }

        let mut tx = self.pool.begin().await.context("begin transaction")?;

        if patch.has_scalar_changes() {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE books SET ");
            {
                let mut set = builder.separated(", ");
                if let Patch::Set(title) = &patch.title {
                    set.push("title = ").push_bind_unseparated(title.clone());
                }
                if let Patch::Set(publisher_id) = patch.publisher_id {
                    set.push("publisher_id = ").push_bind_unseparated(publisher_id);
                }
                if let Patch::Set(published_at) = patch.published_at {
                    set.push("published_at = ").push_bind_unseparated(published_at);
                }
                if let Patch::Set(description) = &patch.description {
                    set.push("description = ").push_bind_unseparated(description.clone());
                }
                if let Patch::Set(price) = patch.price {
                    set.push("price = ").push_bind_unseparated(price);
                }
                if let Patch::Set(mark) = patch.mark {
                    set.push("mark = ").push_bind_unseparated(mark);
                }
            }
            builder.push(" WHERE id = ").push_bind(id);

            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| map_violation(e, &VIOLATIONS))
                .context("update book")?;
            if result.rows_affected() == 0 {
                return Err(BOOK_NOT_FOUND.into());
            }
        } else {
            ensure_book_exists(&mut tx, id).await?;
        }

        if let Patch::Set(authors_ids) = &patch.authors_ids {
            replace_associations(&mut tx, Association::Authors, id, authors_ids, true).await?;
        }
        if let Patch::Set(tags_ids) = &patch.tags_ids {
            replace_associations(&mut tx, Association::Tags, id, tags_ids, true).await?;
        }

        tx.commit().await.context("commit transaction")?;
        Ok(())
    }

    async fn remove_book(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.context("begin transaction")?;

        for association in [Association::Authors, Association::Tags] {
            let sql = format!("DELETE FROM {} WHERE book_id = $1", association.table());
            sqlx::query(&sql)
                .bind(id)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("delete {}", association.table()))?;
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("delete book")?;
        if result.rows_affected() == 0 {
            return Err(BOOK_NOT_FOUND.into());
        }

        tx.commit().await.context("commit transaction")?;
        Ok(())
    }

    async fn list_books(&self, params: &ListBookParameters) -> Result<Vec<Book>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books"));

        if !params.authors_ids.is_empty() {
            builder
                .push(" WHERE id IN (SELECT book_id FROM books_authors WHERE author_id = ANY(")
                .push_bind(params.authors_ids.clone())
                .push(") GROUP BY book_id HAVING COUNT(DISTINCT author_id) = ")
                .push_bind(params.authors_ids.len() as i64)
                .push(")");
        }
        builder.push(" ORDER BY title, id");

        let mut books = builder
            .build_query_as::<Book>()
            .fetch_all(&self.pool)
            .await
            .context("select books")?;

        self.attach_associations(&mut books).await?;
        Ok(books)
    }
}
