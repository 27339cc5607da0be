//! Business logic layer

pub mod organization;
pub mod user;

pub use organization::OrganizationService;
pub use user::UserService;
