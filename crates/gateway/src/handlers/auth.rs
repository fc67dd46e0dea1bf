//! Token issuance

use axum::{extract::State, Json};
use validator::Validate;

use crate::extract::ValidJson;
use crate::AppState;
use foodgram_common::{
    auth::verify_password,
    db::Repository,
    errors::{AppError, Result},
    serializers::{TokenLogin, TokenResponse},
};

fn invalid_credentials() -> AppError {
    AppError::Validation {
        message: "Unable to log in with provided credentials.".to_string(),
        field: None,
    }
}

/// Exchange email and password for a token
pub async fn login(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<TokenLogin>,
) -> Result<Json<TokenResponse>> {
    request.validate()?;

    let repo = Repository::new(state.db.clone());
    let user = repo
        .find_user_by_email(&request.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&request.password, &user.password) {
        tracing::warn!(user_id = user.id, "Login failed: wrong password");
        return Err(invalid_credentials());
    }

    let auth_token = state.jwt.generate_token(user.id)?;
    tracing::info!(user_id = user.id, "Token issued");

    Ok(Json(TokenResponse { auth_token }))
}
