use serde::{Deserialize, Serialize};

use crate::entities::{Category, ObjectId, Role, Slug};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "profilePicture", skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
}

/// Partial profile update; only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProfileUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "profilePicture", skip_serializing_if = "Option::is_none")]
    pub profile_picture_url: Option<String>,
}

impl ProfileUpdateRequest {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.profile_picture_url.is_none()
    }
}

/// Body shared by article creation and article update.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostWriteRequest {
    pub title: String,
    pub category: Category,
    pub content: String,
    #[serde(rename = "image")]
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_alt: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RoleUpdateRequest {
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreateRequest {
    pub content: String,
    pub post_id: ObjectId,
    /// Acting user as read from the local token; the server re-derives it.
    pub user_id: Option<ObjectId>,
    pub slug: Slug,
}
