//! Article detail: one article, its neighbours and its comments.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::Method;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api_types::{
    Article, ArticleDetailResponse, ArticleSummary, Comment, CommentCreateRequest, Slug,
};
use crate::client::{ApiClient, ApiRequest, to_body};
use crate::collection::{LoadPhase, Notice, Outcome};
use crate::error::ApiError;
use crate::lock::{rw_read, rw_write};

/// Longest comment the portal accepts.
pub const COMMENT_MAX_CHARS: usize = 200;

const TARGET: &str = "detail";

#[derive(Debug, Clone, Default)]
pub struct DetailState {
    pub phase: LoadPhase,
    pub slug: Option<Slug>,
    pub article: Option<Article>,
    pub previous: Option<ArticleSummary>,
    pub next: Option<ArticleSummary>,
    pub comments: Vec<Comment>,
    pub notice: Option<Notice>,
}

#[derive(Debug)]
pub struct ArticleDetail {
    api: ApiClient,
    generation: AtomicU64,
    cancel: CancellationToken,
    state: RwLock<DetailState>,
}

impl Drop for ArticleDetail {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl ArticleDetail {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            generation: AtomicU64::new(0),
            cancel: CancellationToken::new(),
            state: RwLock::new(DetailState::default()),
        }
    }

    pub fn snapshot(&self) -> DetailState {
        rw_read(&self.state, TARGET, "detail::snapshot").clone()
    }

    pub fn comments(&self) -> Vec<Comment> {
        rw_read(&self.state, TARGET, "detail::comments")
            .comments
            .clone()
    }

    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    /// Fetch the article by slug together with its neighbours and comments.
    pub async fn load(&self, slug: Slug) -> Result<Outcome, ApiError> {
        if self.cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = rw_write(&self.state, TARGET, "detail::load");
            state.phase = LoadPhase::Loading;
            state.slug = Some(slug.clone());
        }

        let request = ApiRequest::get(format!("/api/posts/post/{slug}"));
        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Ok(discarded(&slug, Outcome::Cancelled)),
            result = self.api.execute_as::<ArticleDetailResponse>(request) => result,
        };

        let mut state = rw_write(&self.state, TARGET, "detail::load");
        if self.generation.load(Ordering::SeqCst) != generation {
            drop(state);
            return Ok(discarded(&slug, Outcome::Superseded));
        }

        match result {
            Ok(body) => {
                state.article = Some(body.post);
                state.previous = body.previous;
                state.next = body.next;
                state.comments = body.comments;
                state.phase = LoadPhase::Loaded;
                Ok(Outcome::Applied)
            }
            Err(err) => {
                state.article = None;
                state.previous = None;
                state.next = None;
                state.comments.clear();
                state.phase = LoadPhase::Failed(err.user_message());
                Err(err)
            }
        }
    }

    /// Post a comment on the loaded article.
    ///
    /// Blocked locally without a session token. The acting user id sent in
    /// the body is read from the token for convenience only; the server
    /// derives identity from the token itself. The comment is appended only
    /// once the server returns it.
    pub async fn submit_comment(&self, content: &str) -> Result<Comment, ApiError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ApiError::validation("Comment cannot be empty"));
        }
        if content.chars().count() > COMMENT_MAX_CHARS {
            return Err(ApiError::validation(format!(
                "Comment must be at most {COMMENT_MAX_CHARS} characters"
            )));
        }
        let token = self.api.require_token()?;

        let (article_id, slug, generation) = {
            let state = rw_read(&self.state, TARGET, "detail::submit_comment");
            let article = state
                .article
                .as_ref()
                .ok_or_else(|| ApiError::validation("No article is loaded"))?;
            (
                article.id.clone(),
                article.slug.clone(),
                self.generation.load(Ordering::SeqCst),
            )
        };

        let user_id = token
            .hints()
            .and_then(|hints| hints.user_id)
            .or_else(|| {
                self.api
                    .session()
                    .current()
                    .map(|session| session.user_id().clone())
            });
        let body = CommentCreateRequest {
            content: content.to_string(),
            post_id: article_id,
            user_id,
            slug,
        };
        let request = ApiRequest::new(Method::POST, "/api/comments/create").json(to_body(&body)?);

        let result = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(ApiError::Cancelled),
            result = self.api.execute_as::<Comment>(request) => result,
        };

        let mut state = rw_write(&self.state, TARGET, "detail::submit_comment");
        match result {
            Ok(comment) => {
                if self.generation.load(Ordering::SeqCst) == generation {
                    state.comments.push(comment.clone());
                }
                state.notice = Some(Notice::Success("Comment posted".to_string()));
                info!(
                    target = "detail",
                    op = "detail::submit_comment",
                    comment_id = %comment.id,
                    result = "ok",
                    "Comment created"
                );
                Ok(comment)
            }
            Err(err) => {
                state.notice = Some(Notice::Failure(err.user_message()));
                warn!(
                    target = "detail",
                    op = "detail::submit_comment",
                    result = "error",
                    error = %err,
                    "Comment rejected"
                );
                Err(err)
            }
        }
    }
}

fn discarded(slug: &Slug, outcome: Outcome) -> Outcome {
    let reason = match outcome {
        Outcome::Cancelled => "cancelled",
        _ => "superseded",
    };
    debug!(
        target = "detail",
        op = "detail::load",
        slug = %slug,
        result = reason,
        "Discarding stale article response"
    );
    metrics::counter!(
        "newsroom_fetch_discarded_total",
        "resource" => "article",
        "reason" => reason
    )
    .increment(1);
    outcome
}
