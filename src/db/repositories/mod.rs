//! Database repositories
//!
//! One repository per aggregate. Each exposes an `async_trait` contract that
//! services hold as `Arc<dyn ..>`, plus an sqlx implementation for SQLite
//! and MySQL.

pub mod campaign;
pub mod session;
pub mod user;

pub use campaign::{CampaignRepository, SqlxCampaignRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
