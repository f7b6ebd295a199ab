#![deny(clippy::all, clippy::pedantic)]

pub mod assets;
pub mod auth;
pub mod comments;
pub mod dashboard;
pub mod files;
pub mod posts;
pub mod users;

use newsroom::api_types::ObjectId;
use newsroom::collection::{RemoteCollection, Resource};
use newsroom::error::ApiError;

use crate::client::{CliError, Ctx};
use crate::io::confirm;
use crate::print::{print_json, print_notice};

/// Fetch `scope` and keep paging until `id` shows up or pages run out.
pub async fn locate<R: Resource>(
    collection: &RemoteCollection<R>,
    scope: R::Scope,
    id: &ObjectId,
) -> Result<(), CliError> {
    collection.fetch(scope).await?;
    while !collection.snapshot().contains(id) && collection.has_more() {
        collection.load_more().await?;
    }
    if collection.snapshot().contains(id) {
        Ok(())
    } else {
        Err(ApiError::validation(format!("No {} with id {id}", R::NAME)).into())
    }
}

/// Load `pages` pages of `scope` and print the accumulated sequence.
pub async fn list_pages<R>(
    collection: &RemoteCollection<R>,
    scope: R::Scope,
    pages: u32,
) -> Result<(), CliError>
where
    R: Resource,
    R::Item: serde::Serialize,
{
    collection.fetch(scope).await?;
    for _ in 1..pages.max(1) {
        if !collection.has_more() {
            break;
        }
        collection.load_more().await?;
    }
    print_json(&collection.items())
}

/// Confirm-then-delete shared by every resource.
pub async fn delete_entity<R: Resource>(
    ctx: &Ctx,
    collection: &RemoteCollection<R>,
    scope: R::Scope,
    id: &ObjectId,
) -> Result<(), CliError> {
    locate(collection, scope, id).await?;
    collection.request_delete(id)?;
    if !confirm(&format!("Delete {} {id}?", R::NAME), ctx.assume_yes)? {
        collection.cancel_delete();
        eprintln!("Cancelled");
        return Ok(());
    }
    let result = collection.confirm_delete().await;
    print_notice(collection.notice());
    result?;
    Ok(())
}
