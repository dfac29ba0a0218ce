use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use super::{
    dto::{AuthResponse, LoginRequest, RegisterRequest, RegisteredResponse},
    extractors::AuthUser,
    services::{
        authenticate, is_valid_email, issue_for, normalize_email, register as register_user,
        validate_new_password,
    },
};
use crate::{error::ApiError, extract::ValidJson, state::AppState, users::PublicUser};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredResponse>), ApiError> {
    let name = payload.name.trim();
    let email = normalize_email(&payload.email);

    if name.is_empty() {
        return Err(ApiError::invalid("Name is required"));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::invalid("Invalid email"));
    }
    validate_new_password(&payload.password)?;

    let user = register_user(state.users.as_ref(), name, &email, &payload.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisteredResponse {
            message: "User registered successfully",
            user: PublicUser::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::invalid("Email and password are required"));
    }

    let user = authenticate(state.users.as_ref(), &email, &payload.password).await?;
    let token = issue_for(&state.tokens, &user)?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful",
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, auth), fields(user_id = auth.id))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = state.users.find_by_id(auth.id).await?.ok_or_else(|| {
        error!(user_id = auth.id, "user not found");
        ApiError::unauthorized("User not found")
    })?;

    Ok(Json(PublicUser::from(&user)))
}
