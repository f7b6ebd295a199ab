//! Remote collections: one controller type, instantiated per resource.
//!
//! A [`RemoteCollection`] owns the committed sequence of entities the server
//! has confirmed. Every mutation is confirm-then-commit: the local sequence
//! changes only after a 2xx response, and only the one matching entity moves.
//!
//! Fetches are tagged with a generation number; a completion whose generation
//! is no longer current is discarded. Unmounting (or dropping) the collection
//! cancels whatever is still in flight.

mod resources;

use std::fmt;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api_types::{MessageBody, ObjectId};
use crate::client::{ApiClient, ApiRequest, AssetUploader};
use crate::error::ApiError;
use crate::lock::{rw_read, rw_write};

pub use resources::{
    CommentScope, Comments, FileScope, Files, PostDraft, PostScope, Posts, RoleDraft, Users,
};

/// Binding between the generic controller and one backend resource.
pub trait Resource: Send + Sync + 'static {
    type Item: Clone + fmt::Debug + DeserializeOwned + Send + Sync;
    /// Parameters that select which slice of the resource is shown.
    type Scope: Clone + Default + fmt::Debug + PartialEq + Send + Sync;

    const NAME: &'static str;
    /// Whether the list endpoint honours `startIndex`/`limit`.
    const PAGINATED: bool = true;

    fn id(item: &Self::Item) -> &ObjectId;

    fn list_request(scope: &Self::Scope, start_index: usize, limit: NonZeroU32) -> ApiRequest;

    fn decode_page(body: Value) -> Result<Vec<Self::Item>, serde_json::Error>;

    fn delete_request(id: &ObjectId) -> ApiRequest;

    /// Whether a newly created entity belongs in the list shown for `scope`.
    fn admits(_scope: &Self::Scope, _item: &Self::Item) -> bool {
        true
    }
}

/// Resources whose entries can be edited in place.
#[async_trait]
pub trait Editable: Resource {
    /// Local edit state, independent of the committed entry.
    type Draft: Clone + fmt::Debug + Send + Sync;

    fn draft_from(item: &Self::Item) -> Self::Draft;

    /// Issue the update and return the entity as it should now be committed.
    async fn submit(
        api: &ApiClient,
        uploader: Option<&AssetUploader>,
        original: &Self::Item,
        draft: Self::Draft,
    ) -> Result<Self::Item, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Acknowledgment of the last mutating action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Failure(String),
}

/// How an async operation ended relative to the collection's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The result was committed to state.
    Applied,
    /// A newer fetch started first; the result was dropped.
    Superseded,
    /// The collection was unmounted while the request was in flight.
    Cancelled,
    /// Nothing to do (no further pages, or a page already loading).
    Skipped,
}

pub struct CollectionState<R: Resource> {
    pub phase: LoadPhase,
    pub items: Vec<R::Item>,
    pub has_more: bool,
    pub loading_more: bool,
    pub scope: R::Scope,
    pub pending_delete: Option<ObjectId>,
    pub deleting: Option<ObjectId>,
    pub editing: Option<ObjectId>,
    pub notice: Option<Notice>,
}

impl<R: Resource> Default for CollectionState<R> {
    fn default() -> Self {
        Self {
            phase: LoadPhase::Idle,
            items: Vec::new(),
            has_more: false,
            loading_more: false,
            scope: R::Scope::default(),
            pending_delete: None,
            deleting: None,
            editing: None,
            notice: None,
        }
    }
}

impl<R: Resource> Clone for CollectionState<R> {
    fn clone(&self) -> Self {
        Self {
            phase: self.phase.clone(),
            items: self.items.clone(),
            has_more: self.has_more,
            loading_more: self.loading_more,
            scope: self.scope.clone(),
            pending_delete: self.pending_delete.clone(),
            deleting: self.deleting.clone(),
            editing: self.editing.clone(),
            notice: self.notice.clone(),
        }
    }
}

impl<R: Resource> fmt::Debug for CollectionState<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionState")
            .field("resource", &R::NAME)
            .field("phase", &self.phase)
            .field("items", &self.items.len())
            .field("has_more", &self.has_more)
            .field("scope", &self.scope)
            .field("pending_delete", &self.pending_delete)
            .field("editing", &self.editing)
            .field("notice", &self.notice)
            .finish()
    }
}

impl<R: Resource> CollectionState<R> {
    fn position(&self, id: &ObjectId) -> Option<usize> {
        self.items.iter().position(|item| R::id(item) == id)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.position(id).is_some()
    }
}

const TARGET: &str = "collection";

pub struct RemoteCollection<R: Resource> {
    api: ApiClient,
    uploader: Option<AssetUploader>,
    page_size: NonZeroU32,
    generation: AtomicU64,
    cancel: CancellationToken,
    state: RwLock<CollectionState<R>>,
}

impl<R: Resource> fmt::Debug for RemoteCollection<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteCollection")
            .field("resource", &R::NAME)
            .field("page_size", &self.page_size)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<R: Resource> Drop for RemoteCollection<R> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<R: Resource> RemoteCollection<R> {
    pub fn new(api: ApiClient, page_size: NonZeroU32) -> Self {
        Self {
            api,
            uploader: None,
            page_size,
            generation: AtomicU64::new(0),
            cancel: CancellationToken::new(),
            state: RwLock::new(CollectionState::default()),
        }
    }

    /// Uploader used by edits that carry a new image.
    pub fn with_uploader(mut self, uploader: AssetUploader) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> CollectionState<R> {
        rw_read(&self.state, TARGET, "collection::snapshot").clone()
    }

    pub fn items(&self) -> Vec<R::Item> {
        rw_read(&self.state, TARGET, "collection::items")
            .items
            .clone()
    }

    pub fn phase(&self) -> LoadPhase {
        rw_read(&self.state, TARGET, "collection::phase")
            .phase
            .clone()
    }

    pub fn has_more(&self) -> bool {
        rw_read(&self.state, TARGET, "collection::has_more").has_more
    }

    pub fn notice(&self) -> Option<Notice> {
        rw_read(&self.state, TARGET, "collection::notice")
            .notice
            .clone()
    }

    pub fn is_unmounted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop all in-flight work; later completions never touch state.
    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    /// Load the first page for `scope`, replacing the sequence.
    pub async fn fetch(&self, scope: R::Scope) -> Result<Outcome, ApiError> {
        if self.cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = rw_write(&self.state, TARGET, "collection::fetch");
            state.scope = scope.clone();
            state.phase = LoadPhase::Loading;
            state.loading_more = false;
            state.pending_delete = None;
        }

        let request = R::list_request(&scope, 0, self.page_size);
        let result = match self.guarded(self.load_page(request)).await {
            Some(result) => result,
            None => return Ok(self.discarded("fetch", Outcome::Cancelled)),
        };

        let mut state = rw_write(&self.state, TARGET, "collection::fetch");
        if self.generation.load(Ordering::SeqCst) != generation {
            drop(state);
            return Ok(self.discarded("fetch", Outcome::Superseded));
        }

        match result {
            Ok(page) => {
                state.has_more = self.is_full(page.len());
                state.items = page;
                state.phase = LoadPhase::Loaded;
                debug!(
                    target = "collection",
                    op = "collection::fetch",
                    resource = R::NAME,
                    generation,
                    items = state.items.len(),
                    has_more = state.has_more,
                    result = "ok",
                    "Collection loaded"
                );
                Ok(Outcome::Applied)
            }
            Err(err) => {
                state.items.clear();
                state.has_more = false;
                state.phase = LoadPhase::Failed(err.user_message());
                warn!(
                    target = "collection",
                    op = "collection::fetch",
                    resource = R::NAME,
                    generation,
                    result = "error",
                    error = %err,
                    "Collection fetch failed"
                );
                Err(err)
            }
        }
    }

    /// Append the next page. A scope change while the page is in flight
    /// discards it.
    pub async fn load_more(&self) -> Result<Outcome, ApiError> {
        if self.cancel.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        let (generation, request) = {
            let mut state = rw_write(&self.state, TARGET, "collection::load_more");
            if state.phase != LoadPhase::Loaded || !state.has_more || state.loading_more {
                return Ok(Outcome::Skipped);
            }
            state.loading_more = true;
            (
                self.generation.load(Ordering::SeqCst),
                R::list_request(&state.scope, state.items.len(), self.page_size),
            )
        };

        let result = match self.guarded(self.load_page(request)).await {
            Some(result) => result,
            None => return Ok(self.discarded("load_more", Outcome::Cancelled)),
        };

        let mut state = rw_write(&self.state, TARGET, "collection::load_more");
        if self.generation.load(Ordering::SeqCst) != generation {
            drop(state);
            return Ok(self.discarded("load_more", Outcome::Superseded));
        }
        state.loading_more = false;

        match result {
            Ok(page) => {
                state.has_more = self.is_full(page.len());
                // a create committed meanwhile shifts the server's pages by one
                for item in page {
                    if !state.contains(R::id(&item)) {
                        state.items.push(item);
                    }
                }
                Ok(Outcome::Applied)
            }
            Err(err) => {
                state.notice = Some(Notice::Failure(err.user_message()));
                Err(err)
            }
        }
    }

    /// Run `submit` and commit the entity the server confirms.
    ///
    /// The new entity goes to the head of the sequence, which is newest
    /// first. It is not inserted when the collection is not loaded, when it
    /// falls outside the current scope, or when a newer fetch started while
    /// the create was in flight.
    pub async fn create<F>(&self, submit: F) -> Result<(R::Item, Outcome), ApiError>
    where
        F: Future<Output = Result<R::Item, ApiError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let generation = self.generation.load(Ordering::SeqCst);

        let Some(result) = self.guarded(submit).await else {
            self.discarded("create", Outcome::Cancelled);
            return Err(ApiError::Cancelled);
        };

        let mut state = rw_write(&self.state, TARGET, "collection::create");
        match result {
            Ok(item) => {
                state.notice = Some(Notice::Success(format!("{} created", R::NAME)));
                info!(
                    target = "collection",
                    op = "collection::create",
                    resource = R::NAME,
                    id = %R::id(&item),
                    result = "ok",
                    "Entity created"
                );
                if self.generation.load(Ordering::SeqCst) != generation {
                    drop(state);
                    return Ok((item, self.discarded("create", Outcome::Superseded)));
                }
                if state.phase != LoadPhase::Loaded || !R::admits(&state.scope, &item) {
                    return Ok((item, Outcome::Skipped));
                }
                match state.position(R::id(&item)) {
                    Some(index) => state.items[index] = item.clone(),
                    None => state.items.insert(0, item.clone()),
                }
                Ok((item, Outcome::Applied))
            }
            Err(err) => {
                state.notice = Some(Notice::Failure(err.user_message()));
                warn!(
                    target = "collection",
                    op = "collection::create",
                    resource = R::NAME,
                    result = "error",
                    error = %err,
                    "Create rejected; collection unchanged"
                );
                Err(err)
            }
        }
    }

    /// First step of a delete: park the id until the operator confirms.
    pub fn request_delete(&self, id: &ObjectId) -> Result<(), ApiError> {
        let mut state = rw_write(&self.state, TARGET, "collection::request_delete");
        if !state.contains(id) {
            return Err(unknown_entity::<R>(id));
        }
        state.pending_delete = Some(id.clone());
        Ok(())
    }

    /// Dismiss the confirmation; no request is issued.
    pub fn cancel_delete(&self) {
        rw_write(&self.state, TARGET, "collection::cancel_delete").pending_delete = None;
    }

    /// Issue the parked delete and, on success, remove exactly that entity.
    pub async fn confirm_delete(&self) -> Result<Outcome, ApiError> {
        let id = {
            let mut state = rw_write(&self.state, TARGET, "collection::confirm_delete");
            let Some(id) = state.pending_delete.take() else {
                return Err(ApiError::validation("No deletion is awaiting confirmation"));
            };
            state.deleting = Some(id.clone());
            id
        };

        let result = match self.guarded(self.api.execute(R::delete_request(&id))).await {
            Some(result) => result,
            None => return Ok(Outcome::Cancelled),
        };

        let mut state = rw_write(&self.state, TARGET, "collection::confirm_delete");
        state.deleting = None;
        match result {
            Ok(body) => {
                if let Some(index) = state.position(&id) {
                    state.items.remove(index);
                }
                state.notice = Some(Notice::Success(
                    acknowledgment(body).unwrap_or_else(|| format!("{} deleted", R::NAME)),
                ));
                info!(
                    target = "collection",
                    op = "collection::delete",
                    resource = R::NAME,
                    id = %id,
                    result = "ok",
                    "Entity deleted"
                );
                Ok(Outcome::Applied)
            }
            Err(err) => {
                state.notice = Some(Notice::Failure(err.user_message()));
                warn!(
                    target = "collection",
                    op = "collection::delete",
                    resource = R::NAME,
                    id = %id,
                    result = "error",
                    error = %err,
                    "Delete rejected; collection unchanged"
                );
                Err(err)
            }
        }
    }

    /// Run `fut` unless the collection is unmounted first.
    async fn guarded<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            out = fut => Some(out),
        }
    }

    async fn load_page(&self, request: ApiRequest) -> Result<Vec<R::Item>, ApiError> {
        let path = request.path().to_string();
        let body = self.api.execute(request).await?;
        R::decode_page(body).map_err(|err| {
            ApiError::malformed(None, format!("unexpected {} page from {path}: {err}", R::NAME))
        })
    }

    fn is_full(&self, len: usize) -> bool {
        R::PAGINATED && len >= self.page_size.get() as usize
    }

    fn discarded(&self, op: &'static str, outcome: Outcome) -> Outcome {
        let reason = match outcome {
            Outcome::Cancelled => "cancelled",
            _ => "superseded",
        };
        debug!(
            target = "collection",
            op,
            resource = R::NAME,
            result = reason,
            "Discarding stale completion"
        );
        metrics::counter!(
            "newsroom_fetch_discarded_total",
            "resource" => R::NAME,
            "reason" => reason
        )
        .increment(1);
        outcome
    }
}

impl<R: Editable> RemoteCollection<R> {
    /// Start editing an entry; the returned draft is detached from state.
    pub fn begin_edit(&self, id: &ObjectId) -> Result<R::Draft, ApiError> {
        let mut state = rw_write(&self.state, TARGET, "collection::begin_edit");
        let index = state.position(id).ok_or_else(|| unknown_entity::<R>(id))?;
        let draft = R::draft_from(&state.items[index]);
        state.editing = Some(id.clone());
        Ok(draft)
    }

    /// Drop the edit without touching the committed entry.
    pub fn discard_edit(&self) {
        rw_write(&self.state, TARGET, "collection::discard_edit").editing = None;
    }

    /// Send the draft; on success the entry is replaced in place.
    pub async fn commit_edit(&self, id: &ObjectId, draft: R::Draft) -> Result<Outcome, ApiError> {
        let original = {
            let mut state = rw_write(&self.state, TARGET, "collection::commit_edit");
            let index = state.position(id).ok_or_else(|| unknown_entity::<R>(id))?;
            state.editing = Some(id.clone());
            state.items[index].clone()
        };

        let submitted = R::submit(&self.api, self.uploader.as_ref(), &original, draft);
        let result = match self.guarded(submitted).await {
            Some(result) => result,
            None => return Ok(Outcome::Cancelled),
        };

        let mut state = rw_write(&self.state, TARGET, "collection::commit_edit");
        state.editing = None;
        match result {
            Ok(updated) => {
                if let Some(index) = state.position(id) {
                    state.items[index] = updated;
                }
                state.notice = Some(Notice::Success(format!("{} updated", R::NAME)));
                info!(
                    target = "collection",
                    op = "collection::edit",
                    resource = R::NAME,
                    id = %id,
                    result = "ok",
                    "Entity updated"
                );
                Ok(Outcome::Applied)
            }
            Err(err) => {
                state.notice = Some(Notice::Failure(err.user_message()));
                warn!(
                    target = "collection",
                    op = "collection::edit",
                    resource = R::NAME,
                    id = %id,
                    result = "error",
                    error = %err,
                    "Edit rejected; draft discarded"
                );
                Err(err)
            }
        }
    }
}

fn unknown_entity<R: Resource>(id: &ObjectId) -> ApiError {
    ApiError::validation(format!("No {} with id {id} in this list", R::NAME))
}

fn acknowledgment(body: Value) -> Option<String> {
    serde_json::from_value::<MessageBody>(body)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty())
}

#[cfg(test)]
mod tests;
