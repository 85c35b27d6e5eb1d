//! Response projections of users and campaigns
//!
//! These shapes are what clients see. Internal fields such as password
//! hashes and timestamps never appear here.

use serde::{Deserialize, Serialize};

use super::{Campaign, CampaignImage, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub occupation: String,
    pub email: String,
    pub image_url: String,
    /// Only present on login
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            occupation: user.occupation.clone(),
            email: user.email.clone(),
            image_url: user.avatar.clone().unwrap_or_default(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Listing entry for a campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub short_description: String,
    /// Primary image path, empty when there is none
    pub image_url: String,
    pub goal_amount: i64,
    pub current_amount: i64,
    pub slug: String,
}

impl CampaignSummary {
    pub fn from_campaign(campaign: &Campaign) -> Self {
        Self {
            id: campaign.id,
            user_id: campaign.user_id,
            name: campaign.name.clone(),
            short_description: campaign.short_description.clone(),
            image_url: primary_image_url(campaign),
            goal_amount: campaign.goal_amount,
            current_amount: campaign.current_amount,
            slug: campaign.slug.clone(),
        }
    }

    pub fn from_campaigns(campaigns: &[Campaign]) -> Vec<Self> {
        campaigns.iter().map(Self::from_campaign).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignUserResponse {
    pub name: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDetailImage {
    pub image_url: String,
    pub is_primary: bool,
}

/// Full view of a single campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDetail {
    pub id: i64,
    pub name: String,
    pub short_description: String,
    pub description: String,
    pub image_url: String,
    pub goal_amount: i64,
    pub current_amount: i64,
    pub backer_count: i64,
    pub user_id: i64,
    pub slug: String,
    pub perks: Vec<String>,
    pub user: CampaignUserResponse,
    pub images: Vec<CampaignDetailImage>,
}

impl CampaignDetail {
    pub fn from_campaign(campaign: &Campaign) -> Self {
        let user = campaign
            .owner
            .as_ref()
            .map(|owner| CampaignUserResponse {
                name: owner.name.clone(),
                image_url: owner.avatar.clone().unwrap_or_default(),
            })
            .unwrap_or(CampaignUserResponse {
                name: String::new(),
                image_url: String::new(),
            });

        Self {
            id: campaign.id,
            name: campaign.name.clone(),
            short_description: campaign.short_description.clone(),
            description: campaign.description.clone(),
            image_url: primary_image_url(campaign),
            goal_amount: campaign.goal_amount,
            current_amount: campaign.current_amount,
            backer_count: campaign.backer_count,
            user_id: campaign.user_id,
            slug: campaign.slug.clone(),
            perks: split_perks(&campaign.perks),
            user,
            images: campaign
                .images
                .iter()
                .map(|image| CampaignDetailImage {
                    image_url: image.file_name.clone(),
                    is_primary: image.is_primary,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignImageResponse {
    pub id: i64,
    pub campaign_id: i64,
    pub image_url: String,
    pub is_primary: bool,
}

impl CampaignImageResponse {
    pub fn from_image(image: &CampaignImage) -> Self {
        Self {
            id: image.id,
            campaign_id: image.campaign_id,
            image_url: image.file_name.clone(),
            is_primary: image.is_primary,
        }
    }
}

fn primary_image_url(campaign: &Campaign) -> String {
    campaign
        .primary_image()
        .map(|image| image.file_name.clone())
        .unwrap_or_default()
}

/// Split comma-separated perks, trimming items and dropping empty ones
pub fn split_perks(perks: &str) -> Vec<String> {
    perks
        .split(',')
        .map(str::trim)
        .filter(|perk| !perk.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CampaignOwner, CreateCampaignInput};
    use chrono::Utc;

    fn campaign_with_images(images: Vec<(&str, bool)>) -> Campaign {
        let mut campaign = Campaign::new(
            9,
            CreateCampaignInput::new("Kiln", "short", "long", 500, " mug ,, sticker,"),
            "kiln-9".to_string(),
        );
        campaign.id = 4;
        campaign.images = images
            .into_iter()
            .enumerate()
            .map(|(i, (path, is_primary))| CampaignImage {
                id: i as i64 + 1,
                campaign_id: 4,
                file_name: path.to_string(),
                is_primary,
                created_at: Utc::now(),
            })
            .collect();
        campaign
    }

    #[test]
    fn test_user_response_hides_password() {
        let mut user = User::new(
            "Ada".to_string(),
            "Engineer".to_string(),
            "ada@example.com".to_string(),
            "hash".to_string(),
        );
        user.avatar = Some("images/1-a.png".to_string());

        let json = serde_json::to_value(UserResponse::from_user(&user)).unwrap();

        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
        assert!(json.get("token").is_none());
        assert_eq!(json["image_url"], "images/1-a.png");
    }

    #[test]
    fn test_user_response_with_token() {
        let user = User::new(
            "Ada".to_string(),
            "Engineer".to_string(),
            "ada@example.com".to_string(),
            "hash".to_string(),
        );

        let json = serde_json::to_value(UserResponse::from_user(&user).with_token("abc")).unwrap();
        assert_eq!(json["token"], "abc");
        assert_eq!(json["image_url"], "");
    }

    #[test]
    fn test_summary_uses_primary_image() {
        let campaign = campaign_with_images(vec![("images/a.png", false), ("images/b.png", true)]);
        assert_eq!(CampaignSummary::from_campaign(&campaign).image_url, "images/b.png");

        let campaign = campaign_with_images(vec![("images/a.png", false)]);
        assert_eq!(CampaignSummary::from_campaign(&campaign).image_url, "");
    }

    #[test]
    fn test_detail_projection() {
        let mut campaign = campaign_with_images(vec![("images/a.png", true), ("images/b.png", false)]);
        campaign.owner = Some(CampaignOwner {
            name: "Ada".to_string(),
            avatar: None,
        });

        let detail = CampaignDetail::from_campaign(&campaign);

        assert_eq!(detail.perks, vec!["mug", "sticker"]);
        assert_eq!(detail.user.name, "Ada");
        assert_eq!(detail.user.image_url, "");
        assert_eq!(detail.image_url, "images/a.png");
        assert_eq!(detail.images.len(), 2);
        assert!(detail.images[0].is_primary);
        assert!(!detail.images[1].is_primary);
    }

    #[test]
    fn test_split_perks_empty() {
        assert!(split_perks("").is_empty());
        assert!(split_perks(" , ").is_empty());
    }
}
