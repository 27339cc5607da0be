//! Organization repository

use crate::domain::{CreateOrganizationInput, Organization, StringUuid, UpdateOrganizationInput};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn create(&self, input: &CreateOrganizationInput) -> Result<Organization>;
    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Organization>>;
    async fn update(&self, id: StringUuid, input: &UpdateOrganizationInput)
        -> Result<Organization>;
    /// Whether another non-deleted organization already owns this slug
    async fn org_url_in_use(&self, org_url: &str, exclude: Option<StringUuid>) -> Result<bool>;
    async fn soft_delete(&self, id: StringUuid) -> Result<()>;
}

pub struct OrganizationRepositoryImpl {
    pool: MySqlPool,
}

impl OrganizationRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationRepository for OrganizationRepositoryImpl {
    async fn create(&self, input: &CreateOrganizationInput) -> Result<Organization> {
        let id = StringUuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO organizations (id, name, org_url, created_at, is_deleted)
            VALUES (?, ?, ?, NOW(), false)
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.org_url)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create organization")))
    }

    async fn find_by_id(&self, id: StringUuid) -> Result<Option<Organization>> {
        let organization = sqlx::query_as::<_, Organization>(
            r#"
            SELECT id, name, org_url, created_at, updated_at, deleted_at, is_deleted
            FROM organizations
            WHERE id = ? AND is_deleted = false
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(organization)
    }

    async fn update(
        &self,
        id: StringUuid,
        input: &UpdateOrganizationInput,
    ) -> Result<Organization> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Organization {} not found", id)))?;

        let name = input.name.as_ref().unwrap_or(&existing.name);
        let org_url = input.org_url.as_ref().or(existing.org_url.as_ref());

        sqlx::query(
            r#"
            UPDATE organizations
            SET name = ?, org_url = ?, updated_at = NOW()
            WHERE id = ? AND is_deleted = false
            "#,
        )
        .bind(name)
        .bind(org_url)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to update organization")))
    }

    async fn org_url_in_use(&self, org_url: &str, exclude: Option<StringUuid>) -> Result<bool> {
        let row: (i64,) = match exclude {
            Some(id) => {
                sqlx::query_as(
                    "SELECT COUNT(*) FROM organizations WHERE org_url = ? AND id != ? AND is_deleted = false",
                )
                .bind(org_url)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT COUNT(*) FROM organizations WHERE org_url = ? AND is_deleted = false",
                )
                .bind(org_url)
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(row.0 > 0)
    }

    async fn soft_delete(&self, id: StringUuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE organizations
            SET is_deleted = true, deleted_at = NOW()
            WHERE id = ? AND is_deleted = false
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Organization {} not found", id)));
        }

        Ok(())
    }
}
