//! User business logic and identity reconciliation

use crate::domain::{IdentityUpdate, NewUser, StringUuid, User};
use crate::error::{AppError, Result};
use crate::idp::ProviderProfile;
use crate::repository::UserRepository;
use std::sync::Arc;
use tracing::warn;

pub struct UserService {
    repo: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: StringUuid) -> Result<User> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Soft-delete a user record. The row is retained with its email and
    /// external id freed for reuse by uniqueness checks.
    pub async fn deactivate(&self, id: StringUuid) -> Result<()> {
        self.repo.soft_delete(id).await
    }

    /// Reconcile a verified external identity with the local user store.
    ///
    /// Lookup order is external id first, then email. The email fallback
    /// links accounts that were provisioned before provider federation
    /// existed: such a record gains the subject's external id on first
    /// contact. Profile fields are refreshed from the provider on every
    /// call; running the same profile through twice yields the same record.
    ///
    /// Note: email-based linking trusts the provider to only report
    /// verified email addresses.
    pub async fn reconcile(&self, profile: &ProviderProfile) -> Result<User> {
        let mut existing = self.repo.find_by_external_id(&profile.subject).await?;

        if existing.is_none() {
            if let Some(email) = non_empty(&profile.email) {
                existing = self.repo.find_by_email(email).await?;
            }
        }

        match existing {
            Some(user) => self.update_existing(user, profile).await,
            None => self.create_new(profile).await,
        }
    }

    async fn update_existing(&self, user: User, profile: &ProviderProfile) -> Result<User> {
        // Provider email wins when present; a missing claim never blanks
        // the stored address.
        let email = non_empty(&profile.email)
            .map(str::to_string)
            .unwrap_or_else(|| user.email.clone());

        if email != user.email && self.repo.email_in_use(&email, Some(user.id)).await? {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let external_id = match user.external_id.as_deref() {
            None => Some(profile.subject.clone()),
            Some(linked) if linked != profile.subject => {
                // A record linked to one subject is never re-linked to
                // another; profile fields still refresh below.
                warn!(
                    user_id = %user.id,
                    linked, subject = %profile.subject,
                    "email matched a user linked to a different subject"
                );
                None
            }
            Some(_) => None,
        };

        let update = IdentityUpdate {
            external_id,
            first_name: profile.first_name.clone().unwrap_or_default(),
            last_name: profile.last_name.clone().unwrap_or_default(),
            email,
            avatar_url: profile.avatar_url.clone().or_else(|| user.avatar_url.clone()),
        };

        self.repo.update_identity(user.id, &update).await
    }

    async fn create_new(&self, profile: &ProviderProfile) -> Result<User> {
        let email = non_empty(&profile.email)
            .ok_or_else(|| AppError::BadRequest("Email is required for new users".to_string()))?;

        if self.repo.email_in_use(email, None).await? {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let record = NewUser {
            external_id: profile.subject.clone(),
            first_name: profile.first_name.clone().unwrap_or_default(),
            last_name: profile.last_name.clone().unwrap_or_default(),
            email: email.to_string(),
            avatar_url: profile.avatar_url.clone(),
        };

        self.repo.create(&record).await
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
