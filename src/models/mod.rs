//! Data models
//!
//! - Database entities (User, Session, Campaign, CampaignImage)
//! - Use-case inputs
//! - The response envelope and the client-facing projections

mod campaign;
mod envelope;
mod responses;
mod session;
mod user;

pub use campaign::{
    Campaign, CampaignImage, CampaignOwner, CreateCampaignImageInput, CreateCampaignInput,
    NewCampaignImage, UpdateCampaignInput,
};
pub use envelope::{build_response, Envelope, FailureKind, Meta, ResponseStatus};
pub use responses::{
    split_perks, CampaignDetail, CampaignDetailImage, CampaignImageResponse, CampaignSummary,
    CampaignUserResponse, UserResponse,
};
pub use session::Session;
pub use user::{normalize_email, CheckEmailInput, LoginInput, RegisterUserInput, User};
