//! Organization domain model

use super::common::StringUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Organization entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    pub id: StringUuid,
    pub name: String,
    /// Optional unique URL slug (e.g. "acme-corp")
    pub org_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
}

impl Default for Organization {
    fn default() -> Self {
        Self {
            id: StringUuid::new_v4(),
            name: String::new(),
            org_url: None,
            created_at: Utc::now(),
            updated_at: None,
            deleted_at: None,
            is_deleted: false,
        }
    }
}

/// Input for creating a new organization
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrganizationInput {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    #[validate(custom(function = "validate_org_url"))]
    pub org_url: Option<String>,
}

/// Input for updating an organization
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateOrganizationInput {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_org_url"))]
    pub org_url: Option<String>,
}

/// Validate slug format (lowercase alphanumeric with hyphens)
fn validate_org_url(org_url: &str) -> Result<(), validator::ValidationError> {
    if ORG_URL_REGEX.is_match(org_url) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("invalid_org_url"))
    }
}

lazy_static::lazy_static! {
    pub static ref ORG_URL_REGEX: regex::Regex =
        regex::Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}
