//! User domain model

use super::common::StringUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Default role assigned to newly reconciled users
pub const ROLE_USER: &str = "user";
/// Role granted to the creator of an organization
pub const ROLE_ADMIN: &str = "admin";

/// User entity
///
/// `external_id` links the record to the identity provider's subject id.
/// It is nullable: accounts provisioned before provider federation existed
/// carry no link until the reconciler attaches one by email match.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: StringUuid,
    pub external_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub organization_id: Option<StringUuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
}

impl User {
    /// Full display name; empty name parts collapse away.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: StringUuid::new_v4(),
            external_id: None,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            avatar_url: None,
            role: ROLE_USER.to_string(),
            is_active: true,
            organization_id: None,
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
            is_deleted: false,
        }
    }
}

/// Profile overrides accepted on the authenticated self endpoint
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(length(max = 255))]
    pub first_name: Option<String>,
    #[validate(length(max = 255))]
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Record for inserting a freshly reconciled user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub external_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}

/// Merged identity fields written back on every authenticated request.
/// `external_id` is `Some` only when a previously unlinked record gains
/// its provider link.
#[derive(Debug, Clone)]
pub struct IdentityUpdate {
    pub external_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub avatar_url: Option<String>,
}
