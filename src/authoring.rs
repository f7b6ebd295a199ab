//! Admin publishing: new articles and downloadable files.

use reqwest::Method;
use reqwest::multipart::Form;
use tracing::info;

use crate::api_types::{Article, DownloadableFile};
use crate::client::{ApiClient, ApiRequest, AssetBlob, AssetUploader, to_body};
use crate::collection::{Files, Outcome, PostDraft, Posts, RemoteCollection};
use crate::error::ApiError;
use crate::navigation::Navigation;

/// A file offered for download, with the thumbnail shown next to it.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub title: String,
    pub file: AssetBlob,
    pub thumbnail: AssetBlob,
}

#[derive(Debug, Clone)]
pub struct Authoring {
    api: ApiClient,
    uploader: AssetUploader,
}

impl Authoring {
    pub fn new(api: ApiClient, uploader: AssetUploader) -> Self {
        Self { api, uploader }
    }

    /// Upload the cover (if a new one is attached), create the article and
    /// point at its public page.
    pub async fn create_article(&self, draft: PostDraft) -> Result<(Article, Navigation), ApiError> {
        let article = self.submit_article(draft).await?;
        let destination = Navigation::article(article.slug.clone());
        Ok((article, destination))
    }

    /// [`Self::create_article`], committing the confirmed article into an
    /// open posts list.
    pub async fn create_article_in(
        &self,
        posts: &RemoteCollection<Posts>,
        draft: PostDraft,
    ) -> Result<(Article, Navigation, Outcome), ApiError> {
        let (article, outcome) = posts.create(self.submit_article(draft)).await?;
        let destination = Navigation::article(article.slug.clone());
        Ok((article, destination, outcome))
    }

    async fn submit_article(&self, mut draft: PostDraft) -> Result<Article, ApiError> {
        draft.validate()?;
        self.api.require_token()?;

        let image_url = match draft.new_image.take() {
            Some(blob) => self.uploader.upload(blob).await?.into_string(),
            None => draft.image_url.clone().unwrap_or_default(),
        };
        let body = draft.into_request(image_url);
        let request = ApiRequest::new(Method::POST, "/api/posts/create").json(to_body(&body)?);
        let article: Article = self.api.execute_as(request).await?;

        info!(
            target = "authoring",
            op = "authoring::create_article",
            slug = %article.slug,
            result = "ok",
            "Article created"
        );
        Ok(article)
    }

    /// [`Self::publish_file`], committing the confirmed file into an open
    /// files list.
    pub async fn publish_file_in(
        &self,
        files: &RemoteCollection<Files>,
        upload: FileUpload,
    ) -> Result<(DownloadableFile, Outcome), ApiError> {
        files.create(self.publish_file(upload)).await
    }

    /// Publish a downloadable file. The thumbnail goes to the media host;
    /// the file itself goes to the backend as multipart.
    pub async fn publish_file(&self, upload: FileUpload) -> Result<DownloadableFile, ApiError> {
        let FileUpload {
            title,
            file,
            thumbnail,
        } = upload;
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::validation("Title is required"));
        }
        if file.is_empty() {
            return Err(ApiError::validation("Choose a file to publish"));
        }
        if thumbnail.is_empty() {
            return Err(ApiError::validation("Choose a thumbnail image"));
        }
        self.api.require_token()?;

        let thumbnail_url = self.uploader.upload(thumbnail).await?;
        let form = Form::new()
            .text("filename", title)
            .text("imagePath", thumbnail_url.into_string())
            .part("file", file.into_part()?);
        let body = self
            .api
            .execute_multipart("/api/unduhan/upload", form)
            .await?;
        let published: DownloadableFile = serde_json::from_value(body).map_err(|err| {
            ApiError::malformed(None, format!("unexpected publish response: {err}"))
        })?;

        info!(
            target = "authoring",
            op = "authoring::publish_file",
            file_id = %published.id,
            size_bytes = published.size_bytes,
            result = "ok",
            "File published"
        );
        Ok(published)
    }
}
