//! Wire types for the newsroom portal REST API.
//!
//! Field names follow the backend's JSON shape (`_id`, camelCase timestamps);
//! Rust-side names describe what the values mean.

mod entities;
mod requests;
mod responses;

pub use entities::{
    Article, ArticleSummary, Category, Comment, DownloadableFile, ObjectId, Role, Slug, User,
};
pub use requests::{
    CommentCreateRequest, PostWriteRequest, ProfileUpdateRequest, RoleUpdateRequest,
    SignInRequest, SignUpRequest,
};
pub use responses::{
    ArticleDetailResponse, AuthResponse, CommentsPage, CurrentUserResponse, MessageBody,
    PostsPage, UploadHostError, UploadHostResponse, UsersPage,
};
