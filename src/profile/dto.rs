use serde::{Deserialize, Serialize};

use crate::users::PublicUser;

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub email: String,
}

/// Field names follow the frontend's camelCase form.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PictureResponse {
    pub message: &'static str,
    pub profile_picture: String,
    pub user: PublicUser,
}
