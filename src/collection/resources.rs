use std::num::NonZeroU32;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::api_types::{
    Article, Category, Comment, CommentsPage, DownloadableFile, ObjectId, PostWriteRequest,
    PostsPage, Role, RoleUpdateRequest, Slug, User, UsersPage,
};
use crate::client::{ApiClient, ApiRequest, AssetBlob, AssetUploader, to_body};
use crate::error::{ApiError, UploadError};

use super::{Editable, Resource};

fn paged(request: ApiRequest, start_index: usize, limit: NonZeroU32) -> ApiRequest {
    request
        .query("startIndex", start_index)
        .query("limit", limit.get())
}

/// Articles, optionally narrowed to one author or category.
#[derive(Debug, Clone, Copy)]
pub struct Posts;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostScope {
    pub author: Option<ObjectId>,
    pub category: Option<Category>,
}

impl Resource for Posts {
    type Item = Article;
    type Scope = PostScope;

    const NAME: &'static str = "post";

    fn id(item: &Article) -> &ObjectId {
        &item.id
    }

    fn list_request(scope: &PostScope, start_index: usize, limit: NonZeroU32) -> ApiRequest {
        paged(ApiRequest::get("/api/posts/getposts"), start_index, limit)
            .query("order", "desc")
            .query_opt("userId", scope.author.as_ref())
            .query_opt("category", scope.category.map(Category::as_str))
    }

    fn decode_page(body: Value) -> Result<Vec<Article>, serde_json::Error> {
        serde_json::from_value::<PostsPage>(body).map(|page| page.posts)
    }

    fn delete_request(id: &ObjectId) -> ApiRequest {
        ApiRequest::new(Method::DELETE, format!("/api/posts/deleteposts/{id}"))
    }

    fn admits(scope: &PostScope, item: &Article) -> bool {
        scope.category.is_none_or(|category| category == item.category)
            && scope
                .author
                .as_ref()
                .is_none_or(|author| item.author_id.as_ref() == Some(author))
    }
}

/// Article fields as edited locally, used both for edits and for new
/// articles. `new_image` replaces the cover when set.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub category: Category,
    pub body_html: String,
    pub image_url: Option<String>,
    pub image_alt: Option<String>,
    pub new_image: Option<AssetBlob>,
}

impl PostDraft {
    /// Blank draft for a new article.
    pub fn new(title: impl Into<String>, category: Category, body_html: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            category,
            body_html: body_html.into(),
            image_url: None,
            image_alt: None,
            new_image: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::validation("Title is required"));
        }
        if !self.category.is_assignable() {
            return Err(ApiError::validation("Choose a category"));
        }
        if self.body_html.trim().is_empty() {
            return Err(ApiError::validation("Content is required"));
        }
        if self.new_image.is_none()
            && self.image_url.as_deref().is_none_or(|url| url.trim().is_empty())
        {
            return Err(ApiError::validation("An image is required"));
        }
        Ok(())
    }

    pub(crate) fn into_request(self, image_url: String) -> PostWriteRequest {
        PostWriteRequest {
            title: self.title.trim().to_string(),
            category: self.category,
            content: self.body_html,
            image_url,
            image_alt: self.image_alt.filter(|alt| !alt.trim().is_empty()),
        }
    }
}

#[async_trait]
impl Editable for Posts {
    type Draft = PostDraft;

    fn draft_from(item: &Article) -> PostDraft {
        PostDraft {
            title: item.title.clone(),
            category: item.category,
            body_html: item.body_html.clone(),
            image_url: item.image_url.clone(),
            image_alt: item.image_alt.clone(),
            new_image: None,
        }
    }

    async fn submit(
        api: &ApiClient,
        uploader: Option<&AssetUploader>,
        original: &Article,
        mut draft: PostDraft,
    ) -> Result<Article, ApiError> {
        draft.validate()?;
        let image_url = match draft.new_image.take() {
            Some(blob) => uploader
                .ok_or(UploadError::Unconfigured("assets"))?
                .upload(blob)
                .await?
                .into_string(),
            None => draft.image_url.clone().unwrap_or_default(),
        };

        let body = draft.into_request(image_url);
        let request = ApiRequest::new(Method::PUT, format!("/api/posts/update/{}", original.id))
            .json(to_body(&body)?);
        let response = api.execute(request).await?;

        Ok(serde_json::from_value::<Article>(response).unwrap_or_else(|_| {
            let mut updated = original.clone();
            updated.title = body.title;
            updated.category = body.category;
            updated.body_html = body.content;
            updated.image_url = Some(body.image_url);
            updated.image_alt = body.image_alt;
            updated
        }))
    }
}

/// Registered accounts (admin only).
#[derive(Debug, Clone, Copy)]
pub struct Users;

impl Resource for Users {
    type Item = User;
    type Scope = ();

    const NAME: &'static str = "user";

    fn id(item: &User) -> &ObjectId {
        &item.id
    }

    fn list_request(_scope: &(), start_index: usize, limit: NonZeroU32) -> ApiRequest {
        paged(ApiRequest::get("/api/user/getusers"), start_index, limit).query("sort", "desc")
    }

    fn decode_page(body: Value) -> Result<Vec<User>, serde_json::Error> {
        serde_json::from_value::<UsersPage>(body).map(|page| page.users)
    }

    fn delete_request(id: &ObjectId) -> ApiRequest {
        ApiRequest::new(Method::DELETE, format!("/api/user/delete/{id}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleDraft {
    pub role: Role,
}

#[async_trait]
impl Editable for Users {
    type Draft = RoleDraft;

    fn draft_from(item: &User) -> RoleDraft {
        RoleDraft { role: item.role }
    }

    async fn submit(
        api: &ApiClient,
        _uploader: Option<&AssetUploader>,
        original: &User,
        draft: RoleDraft,
    ) -> Result<User, ApiError> {
        let request =
            ApiRequest::new(Method::PUT, format!("/api/user/update-role/{}", original.id))
                .json(to_body(&RoleUpdateRequest { role: draft.role })?);
        let response = api.execute(request).await?;

        Ok(serde_json::from_value::<User>(response).unwrap_or_else(|_| {
            let mut updated = original.clone();
            updated.role = draft.role;
            updated
        }))
    }
}

/// Comments, either site-wide (admin) or under one article.
#[derive(Debug, Clone, Copy)]
pub struct Comments;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentScope {
    pub post_slug: Option<Slug>,
}

impl Resource for Comments {
    type Item = Comment;
    type Scope = CommentScope;

    const NAME: &'static str = "comment";

    fn id(item: &Comment) -> &ObjectId {
        &item.id
    }

    fn list_request(scope: &CommentScope, start_index: usize, limit: NonZeroU32) -> ApiRequest {
        match &scope.post_slug {
            Some(slug) => paged(
                ApiRequest::get(format!("/api/comments/getPostComments/{slug}")),
                start_index,
                limit,
            ),
            None => paged(ApiRequest::get("/api/comments/getcomments"), start_index, limit)
                .query("sort", "desc"),
        }
    }

    fn decode_page(body: Value) -> Result<Vec<Comment>, serde_json::Error> {
        // the per-article endpoint has been seen returning a bare array
        match body {
            Value::Array(_) => serde_json::from_value(body),
            other => serde_json::from_value::<CommentsPage>(other).map(|page| page.comments),
        }
    }

    fn delete_request(id: &ObjectId) -> ApiRequest {
        ApiRequest::new(Method::DELETE, format!("/api/comments/deleteComment/{id}"))
    }
}

/// Downloadable files. The list endpoints return everything at once.
#[derive(Debug, Clone, Copy)]
pub struct Files;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileScope {
    /// Public listing instead of the admin one.
    pub published: bool,
}

impl Resource for Files {
    type Item = DownloadableFile;
    type Scope = FileScope;

    const NAME: &'static str = "file";
    const PAGINATED: bool = false;

    fn id(item: &DownloadableFile) -> &ObjectId {
        &item.id
    }

    fn list_request(scope: &FileScope, _start_index: usize, _limit: NonZeroU32) -> ApiRequest {
        if scope.published {
            ApiRequest::get("/api/unduhan/published")
        } else {
            ApiRequest::get("/api/unduhan")
        }
    }

    fn decode_page(body: Value) -> Result<Vec<DownloadableFile>, serde_json::Error> {
        serde_json::from_value(body)
    }

    fn delete_request(id: &ObjectId) -> ApiRequest {
        ApiRequest::new(Method::DELETE, format!("/api/unduhan/{id}"))
    }

    /// Publication is decided server-side, so only the admin listing is
    /// known to hold a fresh upload.
    fn admits(scope: &FileScope, _item: &DownloadableFile) -> bool {
        !scope.published
    }
}
