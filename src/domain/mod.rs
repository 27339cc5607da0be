//! Domain models

pub mod common;
pub mod organization;
pub mod user;

pub use common::StringUuid;
pub use organization::{CreateOrganizationInput, Organization, UpdateOrganizationInput};
pub use user::{IdentityUpdate, NewUser, UpdateUserInput, User, ROLE_ADMIN, ROLE_USER};
