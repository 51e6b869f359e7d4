use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{map_violation, UNIQUE_VIOLATION};
use crate::database::models::Person;
use crate::error::{Result, ResultExt, PERSON_ALREADY_EXISTS, PERSON_NOT_FOUND};
use crate::services::PersonsStorage;

pub struct PersonsPg {
    pool: PgPool,
}

impl PersonsPg {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersonsStorage for PersonsPg {
    async fn add_person(&self, first_name: &str, last_name: &str, middle_name: &str) -> Result<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO persons (first_name, last_name, middle_name) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(first_name)
        .bind(last_name)
        .bind(middle_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_violation(e, &[(UNIQUE_VIOLATION, PERSON_ALREADY_EXISTS)]))
        .context("insert person")
    }

    async fn get_person(&self, id: Uuid) -> Result<Person> {
        sqlx::query_as::<_, Person>(
            "SELECT id, first_name, last_name, middle_name FROM persons WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("select person")?
        .ok_or_else(|| PERSON_NOT_FOUND.into())
    }

    async fn update_person(&self, id: Uuid, person: &Person) -> Result<()> {
        let result = sqlx::query(
            "UPDATE persons SET first_name = $1, last_name = $2, middle_name = $3 WHERE id = $4",
        )
        .bind(&person.first_name)
        .bind(&person.last_name)
        .bind(&person.middle_name)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_violation(e, &[(UNIQUE_VIOLATION, PERSON_ALREADY_EXISTS)]))
        .context("update person")?;

        if result.rows_affected() == 0 {
            return Err(PERSON_NOT_FOUND.into());
        }
        Ok(())
    }

    async fn remove_person(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM persons WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("delete person")?;

        if result.rows_affected() == 0 {
            return Err(PERSON_NOT_FOUND.into());
        }
        Ok(())
    }

    async fn list_persons(&self) -> Result<Vec<Person>> {
        sqlx::query_as::<_, Person>(
            "SELECT id, first_name, last_name, middle_name FROM persons ORDER BY last_name, first_name",
        )
        .fetch_all(&self.pool)
        .await
        .context("select persons")
    }
}
