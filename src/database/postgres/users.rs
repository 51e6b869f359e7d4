use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{map_violation, UNIQUE_VIOLATION};
use crate::database::models::{Role, User};
use crate::error::{Result, ResultExt, USER_ALREADY_EXISTS, USER_NOT_EXISTS, USER_NOT_FOUND};
use crate::services::UsersStorage;

/// `roles.role_id` granted to every user registered by email.
const DEFAULT_ROLE_ID: i16 = 0;

pub struct UsersPg {
    pool: PgPool,
}

impl UsersPg {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsersStorage for UsersPg {
    async fn create_user_by_email(&self, email: &str, pass_hash: &str) -> Result<Uuid> {
        let mut tx = self.pool.begin().await.context("begin transaction")?;

        let user_id: Uuid = sqlx::query_scalar("INSERT INTO users DEFAULT VALUES RETURNING user_id")
            .fetch_one(&mut *tx)
            .await
            .context("insert user")?;

        sqlx::query("INSERT INTO email_passes (user_id, email, pass_hash) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(email)
            .bind(pass_hash)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_violation(e, &[(UNIQUE_VIOLATION, USER_ALREADY_EXISTS)]))
            .context("insert email_passes")?;

        sqlx::query("INSERT INTO granted_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(DEFAULT_ROLE_ID)
            .execute(&mut *tx)
            .await
            .context("insert granted_roles")?;

        tx.commit().await.context("commit transaction")?;
        Ok(user_id)
    }

    async fn get_id_and_pass_hash(&self, email: &str) -> Result<(Uuid, String)> {
        sqlx::query_as::<_, (Uuid, String)>("SELECT user_id, pass_hash FROM email_passes WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("select email_passes")?
            .ok_or_else(|| USER_NOT_EXISTS.into())
    }

    async fn create_anonymous_user(&self) -> Result<Uuid> {
        sqlx::query_scalar::<_, Uuid>("INSERT INTO users DEFAULT VALUES RETURNING user_id")
            .fetch_one(&self.pool)
            .await
            .context("insert user")
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>(
            "SELECT u.user_id AS id, ep.email, u.created_at \
             FROM users u LEFT JOIN email_passes ep ON ep.user_id = u.user_id \
             WHERE u.user_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("select user")?
        .ok_or_else(|| USER_NOT_FOUND.into())
    }

    async fn get_user_roles_by_id(&self, id: Uuid) -> Result<Vec<Role>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT r.name FROM granted_roles gr JOIN roles r ON r.role_id = gr.role_id \
             WHERE gr.user_id = $1 ORDER BY r.role_id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .context("select granted_roles")?;

        Ok(names.iter().filter_map(|name| Role::from_db_name(name)).collect())
    }
}
