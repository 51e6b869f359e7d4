use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{postgres::PgRow, FromRow, PgPool};
use uuid::Uuid;

use super::{map_violation, UNIQUE_VIOLATION};
use crate::database::models::Named;
use crate::error::{Result, ResultExt};
use crate::services::NamedStorage;

/// One `(id, name)` table per entity type; the table name and error kinds
/// come from the entity's `Named` impl.
pub struct NamedRepository<T> {
    pool: PgPool,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> NamedRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<T> NamedStorage<T> for NamedRepository<T>
where
    T: Named + for<'r> FromRow<'r, PgRow> + Send + Sync + Unpin + 'static,
{
    async fn add(&self, name: &str) -> Result<Uuid> {
        let sql = format!("INSERT INTO {} (name) VALUES ($1) RETURNING id", T::TABLE);
        sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_violation(e, &[(UNIQUE_VIOLATION, T::ALREADY_EXISTS)]))
            .with_context(|| format!("insert {}", T::ENTITY))
    }

    async fn get(&self, id: Uuid) -> Result<T> {
        let sql = format!("SELECT id, name FROM {} WHERE id = $1", T::TABLE);
        sqlx::query_as::<_, T>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("select {}", T::ENTITY))?
            .ok_or_else(|| T::NOT_FOUND.into())
    }

    async fn update(&self, id: Uuid, entity: &T) -> Result<()> {
        let sql = format!("UPDATE {} SET name = $1 WHERE id = $2", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(entity.name())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_violation(e, &[(UNIQUE_VIOLATION, T::ALREADY_EXISTS)]))
            .with_context(|| format!("update {}", T::ENTITY))?;

        if result.rows_affected() == 0 {
            return Err(T::NOT_FOUND.into());
        }
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("delete {}", T::ENTITY))?;

        if result.rows_affected() == 0 {
            return Err(T::NOT_FOUND.into());
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<T>> {
        let sql = format!("SELECT id, name FROM {} ORDER BY name", T::TABLE);
        sqlx::query_as::<_, T>(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("select {}s", T::ENTITY))
    }
}
