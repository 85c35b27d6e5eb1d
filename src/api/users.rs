//! User API endpoints
//!
//! - POST /api/v1/users - Register an account
//! - POST /api/v1/sessions - Log in
//! - POST /api/v1/email_checkers - Check email availability
//! - POST /api/v1/avatars - Upload the current user's avatar
//! - GET /api/v1/users/fetch - Current user

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde_json::json;

use crate::api::middleware::{AppState, AuthenticatedUser};
use crate::api::upload::{read_form, store_image};
use crate::api::validation::ValidJson;
use crate::models::{CheckEmailInput, Envelope, FailureKind, LoginInput, RegisterUserInput};

const AVATAR_FIELD: &str = "avatar";

/// Routes that need no session
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/sessions", post(login))
        .route("/email_checkers", post(check_email))
}

/// Routes behind `require_auth`
pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/avatars", post(upload_avatar))
        .route("/users/fetch", get(fetch_user))
}

/// POST /api/v1/users
async fn register(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<RegisterUserInput>,
) -> Envelope {
    let check = CheckEmailInput {
        email: input.email.clone(),
    };

    match state.user_service.get_user_by_email(&check).await {
        Ok(true) => email_taken(),
        Ok(false) => state.user_service.register_user(input).await,
        Err(e) => {
            tracing::error!(error = ?e, "email lookup failed during registration");
            Envelope::failure("Register account failed", e.kind(), [e.to_string()])
        }
    }
}

/// POST /api/v1/sessions
async fn login(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<LoginInput>,
) -> Envelope {
    state.user_service.login_user(input).await
}

/// POST /api/v1/email_checkers
async fn check_email(
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CheckEmailInput>,
) -> Envelope {
    match state.user_service.get_user_by_email(&input).await {
        Ok(true) => email_taken(),
        Ok(false) => Envelope::success(
            "Email is available",
            StatusCode::OK,
            json!({ "is_available": true }),
        ),
        Err(e) => {
            tracing::error!(error = ?e, "email availability check failed");
            Envelope::failure("Email checking failed", e.kind(), [e.to_string()])
        }
    }
}

fn email_taken() -> Envelope {
    Envelope::failed_with_code(
        "Email already registered",
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "is_available": false }),
    )
}

/// POST /api/v1/avatars
async fn upload_avatar(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    multipart: Multipart,
) -> Envelope {
    let form = match read_form(multipart, AVATAR_FIELD).await {
        Ok(form) => form,
        Err(envelope) => return envelope,
    };

    let Some(file) = form.file else {
        return Envelope::failure(
            "Failed to upload avatar image",
            FailureKind::Validation,
            ["avatar file is required"],
        );
    };

    match store_image(&state.upload_config, user.id, &file).await {
        Ok(path) => state.user_service.save_user_avatar(user.id, &path).await,
        Err(envelope) => envelope,
    }
}

/// GET /api/v1/users/fetch
async fn fetch_user(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Envelope {
    state.user_service.get_user_by_id(user.id).await
}
