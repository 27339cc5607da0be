//! Identity provider API types

use serde::{Deserialize, Serialize};

/// Canonical profile for an external identity, assembled either from the
/// provider's user API or, as a fallback, from verified token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    /// The provider's stable subject id (`sub` claim)
    pub subject: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// User record as returned by the provider's user API
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderUser {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<ProviderEmailAddress>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEmailAddress {
    pub email_address: String,
    #[serde(default)]
    pub primary: bool,
}

impl ProviderUser {
    /// The primary email address, falling back to the first listed one.
    pub fn primary_email(&self) -> Option<String> {
        self.email_addresses
            .iter()
            .find(|e| e.primary)
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.clone())
    }

    pub fn into_profile(self) -> ProviderProfile {
        let email = self.primary_email();
        ProviderProfile {
            subject: self.id,
            email,
            first_name: self.first_name,
            last_name: self.last_name,
            avatar_url: self.profile_image_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_emails(emails: Vec<ProviderEmailAddress>) -> ProviderUser {
        ProviderUser {
            id: "user_2x".to_string(),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            profile_image_url: None,
            email_addresses: emails,
        }
    }

    #[test]
    fn test_primary_email_preferred() {
        let user = user_with_emails(vec![
            ProviderEmailAddress {
                email_address: "second@example.com".to_string(),
                primary: false,
            },
            ProviderEmailAddress {
                email_address: "main@example.com".to_string(),
                primary: true,
            },
        ]);
        assert_eq!(user.primary_email(), Some("main@example.com".to_string()));
    }

    #[test]
    fn test_first_email_fallback() {
        let user = user_with_emails(vec![ProviderEmailAddress {
            email_address: "only@example.com".to_string(),
            primary: false,
        }]);
        assert_eq!(user.primary_email(), Some("only@example.com".to_string()));
    }

    #[test]
    fn test_no_emails() {
        let user = user_with_emails(vec![]);
        assert_eq!(user.primary_email(), None);
    }

    #[test]
    fn test_into_profile() {
        let profile = user_with_emails(vec![ProviderEmailAddress {
            email_address: "ada@example.com".to_string(),
            primary: true,
        }])
        .into_profile();

        assert_eq!(profile.subject, "user_2x");
        assert_eq!(profile.email, Some("ada@example.com".to_string()));
        assert_eq!(profile.first_name, Some("Ada".to_string()));
    }
}
