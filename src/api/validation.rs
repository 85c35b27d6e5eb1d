//! Request body binding and field validation
//!
//! `ValidJson<T>` decodes a JSON body and runs [`Validate`] on it. Decoding
//! failures answer 400 "Body request bind failed"; rule violations answer
//! 400 "Body request validation failed" with every message in `data.errors`.

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::models::{
    CheckEmailInput, CreateCampaignInput, Envelope, FailureKind, LoginInput, RegisterUserInput,
    UpdateCampaignInput,
};

pub const BIND_FAILED: &str = "Body request bind failed";
pub const VALIDATION_FAILED: &str = "Body request validation failed";

/// Field-level checks on a decoded request body
pub trait Validate {
    /// Every violated rule as a human-readable message; empty when valid
    fn validate(&self) -> Vec<String>;
}

/// JSON body that decoded and passed validation
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = Envelope;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                Envelope::failure(BIND_FAILED, FailureKind::Validation, [rejection.body_text()])
            })?;

        let errors = value.validate();
        if !errors.is_empty() {
            return Err(validation_failed(errors));
        }

        Ok(Self(value))
    }
}

/// 400 envelope listing validation messages
pub fn validation_failed(errors: Vec<String>) -> Envelope {
    Envelope::failure(VALIDATION_FAILED, FailureKind::Validation, errors)
}

fn require(errors: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(format!("{} is required", field));
    }
}

fn require_email(errors: &mut Vec<String>, value: &str) {
    if value.trim().is_empty() {
        errors.push("email is required".to_string());
    } else if !is_valid_email(value) {
        errors.push("email must be a valid email address".to_string());
    }
}

fn require_positive(errors: &mut Vec<String>, field: &str, value: i64) {
    if value <= 0 {
        errors.push(format!("{} must be greater than zero", field));
    }
}

/// Structural email check: one `@`, a non-empty local part and a dotted domain
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

impl Validate for RegisterUserInput {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "name", &self.name);
        require(&mut errors, "occupation", &self.occupation);
        require_email(&mut errors, &self.email);
        require(&mut errors, "password", &self.password);
        errors
    }
}

impl Validate for LoginInput {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_email(&mut errors, &self.email);
        require(&mut errors, "password", &self.password);
        errors
    }
}

impl Validate for CheckEmailInput {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require_email(&mut errors, &self.email);
        errors
    }
}

impl Validate for CreateCampaignInput {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        require(&mut errors, "name", &self.name);
        require(&mut errors, "short_description", &self.short_description);
        require(&mut errors, "description", &self.description);
        require_positive(&mut errors, "goal_amount", self.goal_amount);
        errors
    }
}

impl Validate for UpdateCampaignInput {
    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if let Some(name) = &self.name {
            require(&mut errors, "name", name);
        }
        if let Some(short_description) = &self.short_description {
            require(&mut errors, "short_description", short_description);
        }
        if let Some(description) = &self.description {
            require(&mut errors, "description", description);
        }
        if let Some(goal_amount) = self.goal_amount {
            require_positive(&mut errors, "goal_amount", goal_amount);
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@@x.com"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x..com"));
        assert!(!is_valid_email("plain"));
    }

    #[test]
    fn test_register_validation_collects_all_errors() {
        let input = RegisterUserInput::new("", " ", "nope", "");

        let errors = input.validate();

        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&"name is required".to_string()));
        assert!(errors.contains(&"email must be a valid email address".to_string()));
    }

    #[test]
    fn test_register_validation_passes() {
        let input = RegisterUserInput::new("Ada", "Engineer", "a@x.com", "p");
        assert!(input.validate().is_empty());
    }

    #[test]
    fn test_campaign_goal_must_be_positive() {
        let input = CreateCampaignInput::new("Kiln", "s", "d", 0, "");
        assert_eq!(input.validate(), vec!["goal_amount must be greater than zero"]);

        let update = UpdateCampaignInput::new().with_goal_amount(-5);
        assert_eq!(update.validate().len(), 1);
    }

    #[test]
    fn test_empty_update_is_valid() {
        assert!(UpdateCampaignInput::new().validate().is_empty());
    }

    #[test]
    fn test_validation_failed_envelope() {
        let envelope = validation_failed(vec!["email is required".to_string()]);

        assert_eq!(envelope.meta.code, 400);
        assert_eq!(envelope.meta.message, VALIDATION_FAILED);
        assert_eq!(envelope.data["errors"][0], "email is required");
    }
}
