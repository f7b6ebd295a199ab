use serde::{Deserialize, Serialize};

use crate::entities::{Article, ArticleSummary, Comment, User};

/// Error or acknowledgment body: `{ "message": "..." }`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CurrentUserResponse {
    pub user: User,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsPage {
    pub posts: Vec<Article>,
    #[serde(default)]
    pub total_posts: Option<u64>,
    #[serde(default)]
    pub last_month_posts: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersPage {
    pub users: Vec<User>,
    #[serde(default)]
    pub total_users: Option<u64>,
    #[serde(default)]
    pub last_month_users: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentsPage {
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub total_comments: Option<u64>,
    #[serde(default)]
    pub last_month_comments: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArticleDetailResponse {
    pub post: Article,
    #[serde(default)]
    pub previous: Option<ArticleSummary>,
    #[serde(default)]
    pub next: Option<ArticleSummary>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Response of the third-party media host. A 2xx status does not imply
/// success: only a present `secure_url` does.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UploadHostResponse {
    #[serde(default)]
    pub secure_url: Option<String>,
    #[serde(default)]
    pub error: Option<UploadHostError>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UploadHostError {
    #[serde(default)]
    pub message: Option<String>,
}
