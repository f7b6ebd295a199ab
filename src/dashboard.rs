//! Admin overview: totals, last-month counts and the most recent entries.

use serde::Serialize;
use tracing::debug;

use crate::api_types::{Article, Comment, CommentsPage, PostsPage, User, UsersPage};
use crate::client::{ApiClient, ApiRequest};
use crate::error::ApiError;

const RECENT_LIMIT: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tally<T> {
    pub total: u64,
    pub last_month: u64,
    pub recent: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub users: Tally<User>,
    pub posts: Tally<Article>,
    pub comments: Tally<Comment>,
}

/// Issue the three list calls concurrently. Any failure fails the overview.
pub async fn overview(api: &ApiClient) -> Result<Overview, ApiError> {
    let users = api.execute_as::<UsersPage>(
        ApiRequest::get("/api/user/getusers").query("limit", RECENT_LIMIT),
    );
    let posts = api.execute_as::<PostsPage>(
        ApiRequest::get("/api/posts/getposts").query("limit", RECENT_LIMIT),
    );
    let comments = api.execute_as::<CommentsPage>(
        ApiRequest::get("/api/comments/getcomments").query("limit", RECENT_LIMIT),
    );

    let (users, posts, comments) = tokio::try_join!(users, posts, comments)?;
    debug!(
        target = "dashboard",
        op = "dashboard::overview",
        users = users.total_users,
        posts = posts.total_posts,
        comments = comments.total_comments,
        result = "ok",
        "Overview loaded"
    );

    Ok(Overview {
        users: Tally {
            total: users.total_users.unwrap_or(users.users.len() as u64),
            last_month: users.last_month_users.unwrap_or_default(),
            recent: users.users,
        },
        posts: Tally {
            total: posts.total_posts.unwrap_or(posts.posts.len() as u64),
            last_month: posts.last_month_posts.unwrap_or_default(),
            recent: posts.posts,
        },
        comments: Tally {
            total: comments.total_comments.unwrap_or(comments.comments.len() as u64),
            last_month: comments.last_month_comments.unwrap_or_default(),
            recent: comments.comments,
        },
    })
}
