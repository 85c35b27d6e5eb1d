//! Services layer - use cases
//!
//! Services sit between the HTTP adapter and the repositories. They apply
//! the business rules (ownership, not-found versus internal failure, token
//! issuance) and turn every outcome into a response envelope.

pub mod campaign;
pub mod password;
pub mod user;

pub use campaign::{generate_slug, CampaignService, CampaignServiceError};
pub use password::{hash_password, verify_password};
pub use user::{UserService, UserServiceError};
