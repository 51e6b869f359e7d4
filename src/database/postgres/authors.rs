use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{map_violation, CHECK_VIOLATION, UNIQUE_VIOLATION};
use crate::database::models::Author;
use crate::error::{Result, ResultExt, AUTHOR_ALREADY_EXISTS, AUTHOR_INVALID_FIELDS, AUTHOR_NOT_FOUND};
use crate::services::AuthorsStorage;

const VIOLATIONS: [(&str, crate::error::InternalError); 2] = [
    (UNIQUE_VIOLATION, AUTHOR_ALREADY_EXISTS),
    (CHECK_VIOLATION, AUTHOR_INVALID_FIELDS),
];

pub struct AuthorsPg {
    pool: PgPool,
}

impl AuthorsPg {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorsStorage for AuthorsPg {
    async fn add_author(&self, person_id: Option<Uuid>, pseudonym: &str) -> Result<Uuid> {
        sqlx::query_scalar::<_, Uuid>("INSERT INTO authors (person_id, pseudonym) VALUES ($1, $2) RETURNING id")
            .bind(person_id)
            .bind(pseudonym)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_violation(e, &VIOLATIONS))
            .context("insert author")
    }

    async fn get_author(&self, id: Uuid) -> Result<Author> {
        sqlx::query_as::<_, Author>("SELECT id, person_id, pseudonym FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("select author")?
            .ok_or_else(|| AUTHOR_NOT_FOUND.into())
    }

    async fn update_author(&self, id: Uuid, author: &Author) -> Result<()> {
        let result = sqlx::query("UPDATE authors SET person_id = $1, pseudonym = $2 WHERE id = $3")
            .bind(author.person_id)
            .bind(&author.pseudonym)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_violation(e, &VIOLATIONS))
            .context("update author")?;

        if result.rows_affected() == 0 {
            return Err(AUTHOR_NOT_FOUND.into());
        }
        Ok(())
    }

    async fn remove_author(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("delete author")?;

        if result.rows_affected() == 0 {
            return Err(AUTHOR_NOT_FOUND.into());
        }
        Ok(())
    }

    async fn list_authors(&self) -> Result<Vec<Author>> {
        sqlx::query_as::<_, Author>("SELECT id, person_id, pseudonym FROM authors ORDER BY pseudonym, id")
            .fetch_all(&self.pool)
            .await
            .context("select authors")
    }
}
