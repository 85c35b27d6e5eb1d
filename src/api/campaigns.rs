//! Campaign API endpoints
//!
//! - GET /api/v1/campaigns - List campaigns (`?user_id=` filters by owner)
//! - GET /api/v1/campaigns/{id} - Campaign detail
//! - POST /api/v1/campaigns - Create campaign
//! - PUT /api/v1/campaigns/{id} - Update campaign
//! - POST /api/v1/campaign-images - Upload a campaign image

use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;

use crate::api::middleware::{AppState, AuthenticatedUser};
use crate::api::upload::{read_form, store_image};
use crate::api::validation::{validation_failed, ValidJson};
use crate::models::{
    CreateCampaignImageInput, CreateCampaignInput, Envelope, FailureKind, UpdateCampaignInput,
};

const IMAGE_FIELD: &str = "campaign_image";

/// Query parameters for the listing
#[derive(Debug, Default, Deserialize)]
pub struct ListCampaignsQuery {
    /// Kept as text: `0` or anything that is not an integer means "no filter"
    pub user_id: Option<String>,
}

impl ListCampaignsQuery {
    pub fn owner(&self) -> Option<i64> {
        self.user_id
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|id| *id != 0)
    }
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/campaigns", get(list_campaigns))
        .route("/campaigns/{id}", get(get_campaign))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/campaigns", post(create_campaign))
        .route("/campaigns/{id}", put(update_campaign))
        .route("/campaign-images", post(upload_campaign_image))
}

/// GET /api/v1/campaigns
async fn list_campaigns(
    State(state): State<AppState>,
    Query(query): Query<ListCampaignsQuery>,
) -> Envelope {
    state.campaign_service.get_campaigns(query.owner()).await
}

/// GET /api/v1/campaigns/{id}
async fn get_campaign(State(state): State<AppState>, Path(id): Path<i64>) -> Envelope {
    state.campaign_service.get_campaign(id).await
}

/// POST /api/v1/campaigns
async fn create_campaign(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    ValidJson(input): ValidJson<CreateCampaignInput>,
) -> Envelope {
    state
        .campaign_service
        .create_campaign(input, user.as_ref().map(|u| &u.0))
        .await
}

/// PUT /api/v1/campaigns/{id}
async fn update_campaign(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: Option<AuthenticatedUser>,
    ValidJson(input): ValidJson<UpdateCampaignInput>,
) -> Envelope {
    state
        .campaign_service
        .update_campaign(id, input, user.as_ref().map(|u| &u.0))
        .await
}

/// POST /api/v1/campaign-images
///
/// The file is written before the use case runs. A rejected attachment
/// leaves the stored file behind.
async fn upload_campaign_image(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    multipart: Multipart,
) -> Envelope {
    let Some(AuthenticatedUser(user)) = user else {
        return Envelope::failure(
            "Unauthorized",
            FailureKind::Unauthorized,
            ["Authentication failed"],
        );
    };

    let form = match read_form(multipart, IMAGE_FIELD).await {
        Ok(form) => form,
        Err(envelope) => return envelope,
    };

    let input = match parse_image_input(form.field("campaign_id"), form.field("is_primary")) {
        Ok(input) => input,
        Err(errors) => return validation_failed(errors),
    };

    let Some(file) = form.file else {
        return Envelope::failure(
            "Failed to upload campaign image",
            FailureKind::Validation,
            ["campaign_image file is required"],
        );
    };

    match store_image(&state.upload_config, user.id, &file).await {
        Ok(path) => {
            state
                .campaign_service
                .create_campaign_image(input, Some(&user), &path)
                .await
        }
        Err(envelope) => envelope,
    }
}

/// Text fields of the image form; `is_primary` accepts true/false/1/0 and defaults to false
fn parse_image_input(
    campaign_id: Option<&str>,
    is_primary: Option<&str>,
) -> Result<CreateCampaignImageInput, Vec<String>> {
    let mut errors = Vec::new();

    let campaign_id = match campaign_id.map(|raw| raw.trim().parse::<i64>()) {
        Some(Ok(id)) if id > 0 => id,
        Some(_) => {
            errors.push("campaign_id must be a positive integer".to_string());
            0
        }
        None => {
            errors.push("campaign_id is required".to_string());
            0
        }
    };

    let is_primary = match is_primary.map(|raw| raw.trim().to_ascii_lowercase()) {
        None => false,
        Some(raw) => match raw.as_str() {
            "" | "false" | "0" => false,
            "true" | "1" => true,
            _ => {
                errors.push("is_primary must be a boolean".to_string());
                false
            }
        },
    };

    if errors.is_empty() {
        Ok(CreateCampaignImageInput {
            campaign_id,
            is_primary,
        })
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_owner() {
        let query = |raw: Option<&str>| ListCampaignsQuery {
            user_id: raw.map(str::to_string),
        };

        assert_eq!(query(Some("12")).owner(), Some(12));
        assert_eq!(query(Some("0")).owner(), None);
        assert_eq!(query(Some("-3")).owner(), Some(-3));
        assert_eq!(query(Some("abc")).owner(), None);
        assert_eq!(query(Some("")).owner(), None);
        assert_eq!(query(None).owner(), None);
    }

    #[test]
    fn test_parse_image_input() {
        let input = parse_image_input(Some("4"), Some("TRUE")).unwrap();
        assert_eq!(input.campaign_id, 4);
        assert!(input.is_primary);

        let input = parse_image_input(Some(" 9 "), None).unwrap();
        assert!(!input.is_primary);

        let errors = parse_image_input(None, Some("maybe")).unwrap_err();
        assert_eq!(errors.len(), 2);

        let errors = parse_image_input(Some("-1"), Some("0")).unwrap_err();
        assert_eq!(errors, vec!["campaign_id must be a positive integer"]);
    }
}
