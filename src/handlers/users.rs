use axum::{
    extract::State,
    http::{HeaderMap, Uri},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::{email, min_len, required, Validate, ValidJson, PASSWORD_MIN_LEN};
use crate::error::InternalError;
use crate::middleware::{ApiResponse, ApiResult, IdResponse, TokenResponse};
use crate::router::AppState;

#[derive(Debug, Deserialize)]
pub struct EmailCredentials {
    pub email: String,
    pub password: String,
}

impl Validate for EmailCredentials {
    fn validate(&self) -> Result<(), InternalError> {
        required("email", &self.email)?;
        email("email", &self.email)?;
        required("password", &self.password)?;
        min_len("password", &self.password, PASSWORD_MIN_LEN)
    }
}

#[derive(Debug, Serialize)]
pub struct UserInfoResponse {
    pub id: Uuid,
    pub email: Option<String>,
}

/// `GET /user`. The token is checked here rather than by the auth layer so
/// the route stays reachable without a role.
pub async fn get_user_info(
    State(state): State<AppState>,
    headers: HeaderMap,
    uri: Uri,
) -> ApiResult<UserInfoResponse> {
    let user_id = state.tokens.verified_user_id_from_parts(&headers, &uri)?;
    let user = state
        .users
        .get_user_info(user_id)
        .await
        .inspect_err(|err| tracing::error!(%user_id, err = %err, "failed to get user info"))?;
    Ok(ApiResponse::success(UserInfoResponse {
        id: user.id,
        email: user.email,
    }))
}

pub async fn register_by_email(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<EmailCredentials>,
) -> ApiResult<IdResponse> {
    let id = state
        .users
        .register_by_email(&body.email, &body.password)
        .await
        .inspect_err(|err| tracing::error!(err = %err, "failed to register user"))?;
    Ok(ApiResponse::created(IdResponse { id }))
}

pub async fn token_by_email(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<EmailCredentials>,
) -> ApiResult<TokenResponse> {
    let token = state
        .users
        .authenticate_by_email(&body.email, &body.password)
        .await
        .inspect_err(|err| tracing::error!(err = %err, "failed to get user token"))?;
    Ok(ApiResponse::success(TokenResponse { token }))
}

pub async fn create_anonymous(State(state): State<AppState>) -> ApiResult<TokenResponse> {
    let token = state
        .users
        .create_anonymous_user()
        .await
        .inspect_err(|err| tracing::error!(err = %err, "failed to create anonymous user"))?;
    Ok(ApiResponse::created(TokenResponse { token }))
}
