use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};

use super::{
    dto::{ChangePasswordRequest, MessageResponse, PictureResponse, UpdateProfileRequest},
    pictures::{ext_from_mime, MAX_PICTURE_BYTES},
};
use crate::{
    auth::{
        dto::AuthResponse,
        extractors::AuthUser,
        password::{hash_password, verify_password},
        services::{is_valid_email, issue_for, normalize_email, validate_new_password},
    },
    error::ApiError,
    extract::ValidJson,
    state::AppState,
    users::{PublicUser, StoreError, User},
};

pub fn profile_routes() -> Router<AppState> {
    // Slightly above the picture cap so oversize uploads get a readable 400.
    let picture = Router::new()
        .route("/profile/picture", post(upload_picture))
        .layer(DefaultBodyLimit::max(MAX_PICTURE_BYTES + 64 * 1024));

    Router::new()
        .route("/profile/update", post(update_profile))
        .route("/profile/password", post(change_password))
        .merge(picture)
}

async fn current_user(state: &AppState, auth: &AuthUser) -> Result<User, ApiError> {
    state.users.find_by_id(auth.id).await?.ok_or_else(|| {
        warn!(user_id = auth.id, "token for missing user");
        ApiError::unauthorized("User not found")
    })
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(payload): ValidJson<UpdateProfileRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let name = payload.name.trim();
    let email = normalize_email(&payload.email);
    if name.is_empty() || email.is_empty() {
        return Err(ApiError::invalid("Name and email are required"));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::invalid("Invalid email"));
    }

    let user = match state.users.update_profile(auth.id, name, &email).await {
        Ok(user) => user,
        Err(StoreError::Duplicate) => {
            warn!("email taken by another account");
            return Err(ApiError::Conflict("Email already in use".into()));
        }
        Err(StoreError::NotFound) => return Err(ApiError::unauthorized("User not found")),
        Err(e) => return Err(e.into()),
    };

    if user.email != auth.email {
        info!("account email changed");
    }
    // Email and name live in the token, so hand out a fresh one.
    let token = issue_for(&state.tokens, &user)?;
    info!("profile updated");
    Ok(Json(AuthResponse {
        message: "Profile updated successfully",
        token,
        user: PublicUser::from(&user),
    }))
}

#[instrument(skip(state, auth, payload), fields(user_id = auth.id))]
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidJson(payload): ValidJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let (Some(current), Some(new)) = (payload.current_password, payload.new_password) else {
        return Err(ApiError::invalid("Current and new password required"));
    };
    validate_new_password(&new)?;

    let user = current_user(&state, &auth).await?;
    if !verify_password(&current, &user.password_hash) {
        warn!("current password mismatch");
        return Err(ApiError::unauthorized("Incorrect current password"));
    }

    let hash = hash_password(&new)?;
    state.users.update_password(user.id, &hash).await?;

    info!("password changed");
    Ok(Json(MessageResponse {
        message: "Password changed successfully",
    }))
}

/// Multipart upload, field `picture`.
#[instrument(skip(state, auth, multipart), fields(user_id = auth.id))]
pub async fn upload_picture(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PictureResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::invalid(e.body_text()))?;
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid(e.body_text()))?
    {
        if field.name() != Some("picture") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::invalid(e.body_text()))?;
        upload = Some((content_type, data));
        break;
    }

    let Some((content_type, data)) = upload.filter(|(_, data)| !data.is_empty()) else {
        return Err(ApiError::invalid("No file uploaded"));
    };
    if ext_from_mime(&content_type).is_none() {
        warn!(content_type = %content_type, "rejected picture type");
        return Err(ApiError::invalid("Only JPG, PNG, GIF, and WebP are allowed"));
    }
    if data.len() > MAX_PICTURE_BYTES {
        return Err(ApiError::invalid("File size must be less than 2MB"));
    }

    let previous = current_user(&state, &auth).await?.profile_picture;
    let relative = state.pictures.save(auth.id, &content_type, data).await?;

    let user = match state
        .users
        .set_profile_picture(auth.id, Some(&relative))
        .await
    {
        Ok(user) => user,
        Err(e) => {
            state.pictures.remove(&relative).await;
            return Err(e.into());
        }
    };

    if let Some(old) = previous.filter(|old| *old != relative) {
        state.pictures.remove(&old).await;
    }

    info!(path = %relative, "profile picture updated");
    Ok(Json(PictureResponse {
        message: "Profile picture updated",
        profile_picture: relative,
        user: PublicUser::from(&user),
    }))
}
