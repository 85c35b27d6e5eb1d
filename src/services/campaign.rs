//! Campaign use case
//!
//! Listing, detail, creation, update and image attachment of campaigns.
//! Write operations take the authenticated user as `Option<&User>`: `None`
//! is answered with 401, a user who does not own the campaign with 403.
//!
//! Every public method classifies its outcome into exactly one
//! [`FailureKind`] (or success) and returns the matching [`Envelope`].

use crate::db::repositories::CampaignRepository;
use crate::models::{
    Campaign, CampaignDetail, CampaignImage, CampaignImageResponse, CampaignSummary,
    CreateCampaignImageInput, CreateCampaignInput, Envelope, FailureKind, NewCampaignImage,
    UpdateCampaignInput, User,
};
use axum::http::StatusCode;
use std::sync::Arc;

/// Error types for campaign service operations
#[derive(Debug, thiserror::Error)]
pub enum CampaignServiceError {
    /// No authenticated user was supplied
    #[error("Authentication required")]
    Unauthenticated,

    /// Campaign not found
    #[error("Campaign not found: {0}")]
    NotFound(i64),

    /// Authenticated user does not own the campaign
    #[error("User {user_id} does not own campaign {campaign_id}")]
    Forbidden { campaign_id: i64, user_id: i64 },

    /// Input rejected by a business rule
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

impl CampaignServiceError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CampaignServiceError::Unauthenticated => FailureKind::Unauthorized,
            CampaignServiceError::NotFound(_) => FailureKind::NotFound,
            CampaignServiceError::Forbidden { .. } => FailureKind::Forbidden,
            CampaignServiceError::ValidationError(_) => FailureKind::Validation,
            CampaignServiceError::InternalError(_) => FailureKind::Internal,
        }
    }

    fn into_envelope(self, message: &str) -> Envelope {
        match self.kind() {
            FailureKind::Internal => tracing::error!(error = ?self, "{}", message),
            FailureKind::Forbidden => tracing::warn!(error = %self, "{}", message),
            _ => {}
        }
        let kind = self.kind();
        Envelope::failure(message, kind, [self.to_string()])
    }
}

/// Campaign service
pub struct CampaignService {
    repo: Arc<dyn CampaignRepository>,
}

impl CampaignService {
    pub fn new(repo: Arc<dyn CampaignRepository>) -> Self {
        Self { repo }
    }

    /// List campaigns, optionally only those owned by `owner`.
    ///
    /// An empty result is a 200 with an empty list.
    pub async fn get_campaigns(&self, owner: Option<i64>) -> Envelope {
        let result = match owner {
            Some(user_id) => self.repo.list_by_owner(user_id).await,
            None => self.repo.list_all().await,
        };

        match result {
            Ok(campaigns) => Envelope::success(
                "List of campaigns",
                StatusCode::OK,
                CampaignSummary::from_campaigns(&campaigns),
            ),
            Err(e) => CampaignServiceError::from(e).into_envelope("Failed to get campaigns"),
        }
    }

    /// Fetch one campaign with owner and images
    pub async fn get_campaign(&self, id: i64) -> Envelope {
        match self.find(id).await {
            Ok(campaign) => Envelope::success(
                "Campaign detail",
                StatusCode::OK,
                CampaignDetail::from_campaign(&campaign),
            ),
            Err(e) => e.into_envelope("Failed to get campaign detail"),
        }
    }

    /// Create a campaign owned by the authenticated user
    pub async fn create_campaign(&self, input: CreateCampaignInput, user: Option<&User>) -> Envelope {
        match self.try_create(input, user).await {
            Ok(campaign) => Envelope::success(
                "Campaign has been created",
                StatusCode::CREATED,
                CampaignSummary::from_campaign(&campaign),
            ),
            Err(e) => e.into_envelope("Failed to create campaign"),
        }
    }

    async fn try_create(
        &self,
        input: CreateCampaignInput,
        user: Option<&User>,
    ) -> Result<Campaign, CampaignServiceError> {
        let user = user.ok_or(CampaignServiceError::Unauthenticated)?;
        validate_goal_amount(input.goal_amount)?;

        let slug = self
            .unique_slug(&generate_slug(&format!("{} {}", input.name, user.id)))
            .await?;
        let campaign = Campaign::new(user.id, input, slug);

        let created = self.repo.create(&campaign).await?;
        tracing::info!(campaign_id = created.id, user_id = user.id, "campaign created");
        Ok(created)
    }

    /// Apply a partial update to a campaign the authenticated user owns.
    ///
    /// The stored record is left untouched on 401, 403 and 404.
    pub async fn update_campaign(
        &self,
        id: i64,
        input: UpdateCampaignInput,
        user: Option<&User>,
    ) -> Envelope {
        match self.try_update(id, input, user).await {
            Ok(campaign) => Envelope::success(
                "Campaign has been updated",
                StatusCode::OK,
                CampaignSummary::from_campaign(&campaign),
            ),
            Err(e) => e.into_envelope("Failed to update campaign"),
        }
    }

    async fn try_update(
        &self,
        id: i64,
        input: UpdateCampaignInput,
        user: Option<&User>,
    ) -> Result<Campaign, CampaignServiceError> {
        let user = user.ok_or(CampaignServiceError::Unauthenticated)?;
        let mut campaign = self.find_owned(id, user).await?;

        if let Some(goal_amount) = input.goal_amount {
            validate_goal_amount(goal_amount)?;
        }
        if !input.has_changes() {
            return Ok(campaign);
        }

        input.apply_to(&mut campaign);
        Ok(self.repo.update(&campaign).await?)
    }

    /// Attach an already stored image to a campaign the authenticated user owns.
    ///
    /// A primary image replaces the previous primary; the repository performs
    /// the demotion and the insert atomically.
    pub async fn create_campaign_image(
        &self,
        input: CreateCampaignImageInput,
        user: Option<&User>,
        stored_path: &str,
    ) -> Envelope {
        match self.try_create_image(input, user, stored_path).await {
            Ok(image) => Envelope::success(
                "Campaign image has been uploaded",
                StatusCode::CREATED,
                CampaignImageResponse::from_image(&image),
            ),
            Err(e) => e.into_envelope("Campaign image upload failed"),
        }
    }

    async fn try_create_image(
        &self,
        input: CreateCampaignImageInput,
        user: Option<&User>,
        stored_path: &str,
    ) -> Result<CampaignImage, CampaignServiceError> {
        let user = user.ok_or(CampaignServiceError::Unauthenticated)?;
        self.find_owned(input.campaign_id, user).await?;

        let image = NewCampaignImage {
            file_name: stored_path.to_string(),
            is_primary: input.is_primary,
        };
        Ok(self.repo.add_image(input.campaign_id, &image).await?)
    }

    /// `base`, or `base-2`, `base-3`, .. when taken.
    ///
    /// The unique index on `campaigns.slug` rejects a concurrent insert of the same slug.
    async fn unique_slug(&self, base: &str) -> Result<String, CampaignServiceError> {
        let mut candidate = base.to_string();
        let mut suffix = 2;
        while self.repo.slug_exists(&candidate).await? {
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        Ok(candidate)
    }

    async fn find(&self, id: i64) -> Result<Campaign, CampaignServiceError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(CampaignServiceError::NotFound(id))
    }

    /// Load a campaign and check that `user` owns it
    async fn find_owned(&self, id: i64, user: &User) -> Result<Campaign, CampaignServiceError> {
        let campaign = self.find(id).await?;
        if !user.owns(campaign.user_id) {
            return Err(CampaignServiceError::Forbidden {
                campaign_id: id,
                user_id: user.id,
            });
        }
        Ok(campaign)
    }
}

fn validate_goal_amount(goal_amount: i64) -> Result<(), CampaignServiceError> {
    if goal_amount <= 0 {
        return Err(CampaignServiceError::ValidationError(
            "goal_amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Generate a URL-friendly slug.
///
/// ASCII letters and digits are kept (lowercased); every other run of
/// characters becomes a single `-`, with none at either end.
pub fn generate_slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}
