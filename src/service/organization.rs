//! Organization business logic
//!
//! A user belongs to at most one organization. The creating user is
//! assigned to the new organization and promoted to the admin role.

use crate::domain::{
    CreateOrganizationInput, Organization, StringUuid, UpdateOrganizationInput, User, ROLE_ADMIN,
};
use crate::error::{AppError, Result};
use crate::repository::{OrganizationRepository, UserRepository};
use std::sync::Arc;
use validator::Validate;

pub struct OrganizationService {
    orgs: Arc<dyn OrganizationRepository>,
    users: Arc<dyn UserRepository>,
}

impl OrganizationService {
    pub fn new(orgs: Arc<dyn OrganizationRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { orgs, users }
    }

    pub async fn create(
        &self,
        user_id: StringUuid,
        input: CreateOrganizationInput,
    ) -> Result<Organization> {
        input.validate()?;

        let user = self.get_user(user_id).await?;

        if let Some(existing_id) = user.organization_id {
            let name = self
                .orgs
                .find_by_id(existing_id)
                .await?
                .map(|org| org.name)
                .unwrap_or_else(|| existing_id.to_string());
            return Err(AppError::Conflict(format!(
                "User is already associated to an organization: {}",
                name
            )));
        }

        if let Some(org_url) = &input.org_url {
            if self.orgs.org_url_in_use(org_url, None).await? {
                return Err(AppError::Conflict(format!(
                    "Organization URL '{}' is already taken",
                    org_url
                )));
            }
        }

        let organization = self.orgs.create(&input).await?;
        self.users
            .assign_organization(user.id, organization.id, ROLE_ADMIN)
            .await?;

        Ok(organization)
    }

    pub async fn get_for_user(&self, user_id: StringUuid) -> Result<Organization> {
        let organization_id = self.membership(user_id).await?;
        self.orgs
            .find_by_id(organization_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Organization not found".to_string()))
    }

    pub async fn update_for_user(
        &self,
        user_id: StringUuid,
        input: UpdateOrganizationInput,
    ) -> Result<Organization> {
        input.validate()?;

        let organization_id = self.membership(user_id).await?;

        if let Some(org_url) = &input.org_url {
            if self
                .orgs
                .org_url_in_use(org_url, Some(organization_id))
                .await?
            {
                return Err(AppError::Conflict(format!(
                    "Organization URL '{}' is already taken",
                    org_url
                )));
            }
        }

        self.orgs.update(organization_id, &input).await
    }

    pub async fn list_members(&self, user_id: StringUuid) -> Result<Vec<User>> {
        let organization_id = self.membership(user_id).await?;
        self.users.list_by_organization(organization_id).await
    }

    /// Soft-delete the caller's organization and release its members.
    pub async fn delete_for_user(&self, user_id: StringUuid) -> Result<()> {
        let organization_id = self.membership(user_id).await?;
        self.users.detach_organization(organization_id).await?;
        self.orgs.soft_delete(organization_id).await
    }

    async fn get_user(&self, user_id: StringUuid) -> Result<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn membership(&self, user_id: StringUuid) -> Result<StringUuid> {
        let user = self.get_user(user_id).await?;
        user.organization_id
            .ok_or_else(|| AppError::NotFound("User does not have an organization".to_string()))
    }
}
