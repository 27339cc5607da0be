//! User repository
//!
//! All lookups are scoped to non-deleted rows; records are only ever
//! soft-deleted.

use crate::domain::{IdentityUpdate, NewUser, StringUuid, User};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, record: &NewUser) -> Result<User>;
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>>;
    /// Whether another non-deleted user already owns this email
    async fn email_in_use(&self, email: &str, exclude: Option<StringUuid>) -> Result<bool>;
    async fn update_identity(&self, id: StringUuid, update: &IdentityUpdate) -> Result<User>;
    async fn assign_organization(
        &self,
        user_id: StringUuid,
        organization_id: StringUuid,
        role: &str,
    ) -> Result<User>;
    async fn list_by_organization(&self, organization_id: StringUuid) -> Result<Vec<User>>;
    /// Clear the organization link (and demote the role) for all members
    async fn detach_organization(&self, organization_id: StringUuid) -> Result<u64>;
    async fn soft_delete(&self, id: StringUuid) -> Result<()>;
}

pub struct UserRepositoryImpl {
    pool: MySqlPool,
}

impl UserRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn create(&self, record: &NewUser) -> Result<User> {
        let id = StringUuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO users
                (id, external_id, first_name, last_name, email, avatar_url,
                 role, is_active, created_at, is_deleted)
            VALUES (?, ?, ?, ?, ?, ?, 'user', true, NOW(), false)
            "#,
        )
        .bind(id)
        .bind(&record.external_id)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(&record.email)
        .bind(&record.avatar_url)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create user")))
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, first_name, last_name, email, avatar_url,
                   role, is_active, organization_id, created_at, updated_at,
                   deleted_at, is_deleted
            FROM users
            WHERE id = ? AND is_deleted = false
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, first_name, last_name, email, avatar_url,
                   role, is_active, organization_id, created_at, updated_at,
                   deleted_at, is_deleted
            FROM users
            WHERE email = ? AND is_deleted = false
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, first_name, last_name, email, avatar_url,
                   role, is_active, organization_id, created_at, updated_at,
                   deleted_at, is_deleted
            FROM users
            WHERE external_id = ? AND is_deleted = false
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn email_in_use(&self, email: &str, exclude: Option<StringUuid>) -> Result<bool> {
        let row: (i64,) = match exclude {
            Some(id) => {
                sqlx::query_as(
                    "SELECT COUNT(*) FROM users WHERE email = ? AND id != ? AND is_deleted = false",
                )
                .bind(email)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ? AND is_deleted = false")
                    .bind(email)
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        Ok(row.0 > 0)
    }

    async fn update_identity(&self, id: StringUuid, update: &IdentityUpdate) -> Result<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET external_id = COALESCE(?, external_id),
                first_name = ?, last_name = ?, email = ?, avatar_url = ?,
                updated_at = NOW()
            WHERE id = ? AND is_deleted = false
            "#,
        )
        .bind(&update.external_id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.email)
        .bind(&update.avatar_url)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to update user")))
    }

    async fn assign_organization(
        &self,
        user_id: StringUuid,
        organization_id: StringUuid,
        role: &str,
    ) -> Result<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET organization_id = ?, role = ?, updated_at = NOW()
            WHERE id = ? AND is_deleted = false
            "#,
        )
        .bind(organization_id)
        .bind(role)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        self.find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to update user")))
    }

    async fn list_by_organization(&self, organization_id: StringUuid) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, external_id, first_name, last_name, email, avatar_url,
                   role, is_active, organization_id, created_at, updated_at,
                   deleted_at, is_deleted
            FROM users
            WHERE organization_id = ? AND is_deleted = false
            ORDER BY created_at ASC
            "#,
        )
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn detach_organization(&self, organization_id: StringUuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET organization_id = NULL, role = 'user', updated_at = NOW()
            WHERE organization_id = ? AND is_deleted = false
            "#,
        )
        .bind(organization_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn soft_delete(&self, id: StringUuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_deleted = true, deleted_at = NOW(), is_active = false
            WHERE id = ? AND is_deleted = false
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        Ok(())
    }
}
