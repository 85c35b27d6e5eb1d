//! Campaign model
//!
//! A fundraising project owned by one user, with an ordered list of images.
//! At most one image per campaign carries `is_primary = true`; the campaign
//! repository maintains that when an image is added.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Campaign entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    /// Unique identifier
    pub id: i64,
    /// Owning user ID
    pub user_id: i64,
    pub name: String,
    pub short_description: String,
    pub description: String,
    /// Comma-separated perks text
    pub perks: String,
    /// Fundraising target, currency-agnostic
    pub goal_amount: i64,
    /// Amount collected so far (maintained by transaction processing)
    pub current_amount: i64,
    pub backer_count: i64,
    /// URL-friendly identifier
    pub slug: String,
    /// Images in insertion order
    #[serde(default)]
    pub images: Vec<CampaignImage>,
    /// Owner summary, loaded on single-campaign reads
    #[serde(default)]
    pub owner: Option<CampaignOwner>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Build a new, not yet persisted campaign owned by `user_id`
    pub fn new(user_id: i64, input: CreateCampaignInput, slug: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            user_id,
            name: input.name,
            short_description: input.short_description,
            description: input.description,
            perks: input.perks,
            goal_amount: input.goal_amount,
            current_amount: 0,
            backer_count: 0,
            slug,
            images: Vec::new(),
            owner: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The image flagged as primary, if any
    pub fn primary_image(&self) -> Option<&CampaignImage> {
        self.images.iter().find(|image| image.is_primary)
    }
}

/// Image attached to a campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignImage {
    pub id: i64,
    pub campaign_id: i64,
    /// Storage path of the uploaded file
    pub file_name: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

/// Public owner fields shown next to a campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignOwner {
    pub name: String,
    pub avatar: Option<String>,
}

/// Input for creating a campaign
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaignInput {
    pub name: String,
    pub short_description: String,
    pub description: String,
    pub goal_amount: i64,
    #[serde(default)]
    pub perks: String,
}

impl CreateCampaignInput {
    pub fn new(
        name: impl Into<String>,
        short_description: impl Into<String>,
        description: impl Into<String>,
        goal_amount: i64,
        perks: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            short_description: short_description.into(),
            description: description.into(),
            goal_amount,
            perks: perks.into(),
        }
    }
}

/// Partial update of a campaign.
///
/// A `None` field leaves the stored value untouched. JSON `null` and a
/// missing key both decode to `None`, so neither can clear a field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCampaignInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub goal_amount: Option<i64>,
    #[serde(default)]
    pub perks: Option<String>,
}

impl UpdateCampaignInput {
    /// Create a new empty UpdateCampaignInput
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_short_description(mut self, short_description: impl Into<String>) -> Self {
        self.short_description = Some(short_description.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_goal_amount(mut self, goal_amount: i64) -> Self {
        self.goal_amount = Some(goal_amount);
        self
    }

    pub fn with_perks(mut self, perks: impl Into<String>) -> Self {
        self.perks = Some(perks.into());
        self
    }

    /// Check if any field is set
    pub fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.short_description.is_some()
            || self.description.is_some()
            || self.goal_amount.is_some()
            || self.perks.is_some()
    }

    /// Overwrite the fields present in this input on `campaign`
    pub fn apply_to(self, campaign: &mut Campaign) {
        if let Some(name) = self.name {
            campaign.name = name;
        }
        if let Some(short_description) = self.short_description {
            campaign.short_description = short_description;
        }
        if let Some(description) = self.description {
            campaign.description = description;
        }
        if let Some(goal_amount) = self.goal_amount {
            campaign.goal_amount = goal_amount;
        }
        if let Some(perks) = self.perks {
            campaign.perks = perks;
        }
    }
}

/// Image attachment command; the file itself is already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateCampaignImageInput {
    pub campaign_id: i64,
    pub is_primary: bool,
}

/// Image row to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCampaignImage {
    pub file_name: String,
    pub is_primary: bool,
}
