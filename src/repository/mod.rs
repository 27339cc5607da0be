//! Data access layer

pub mod organization;
pub mod user;

pub use organization::{OrganizationRepository, OrganizationRepositoryImpl};
pub use user::{UserRepository, UserRepositoryImpl};

#[cfg(test)]
pub use organization::MockOrganizationRepository;
#[cfg(test)]
pub use user::MockUserRepository;
