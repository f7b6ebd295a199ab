#![deny(clippy::all, clippy::pedantic)]

use newsroom::api_types::{ObjectId, Slug};
use newsroom::collection::{CommentScope, Comments, RemoteCollection};
use newsroom::detail::ArticleDetail;

use super::{delete_entity, list_pages};
use crate::args::CommentsCmd;
use crate::client::{CliError, Ctx};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx, cmd: CommentsCmd) -> Result<(), CliError> {
    match cmd {
        CommentsCmd::List { post, pages } => {
            let comments = RemoteCollection::<Comments>::new(ctx.api.clone(), ctx.page_size());
            let scope = CommentScope {
                post_slug: post.map(Slug::new),
            };
            list_pages(&comments, scope, pages).await
        }
        CommentsCmd::Add { slug, content } => add(ctx, slug, &content).await,
        CommentsCmd::Delete { id } => {
            let comments = RemoteCollection::<Comments>::new(ctx.api.clone(), ctx.page_size());
            delete_entity(ctx, &comments, CommentScope::default(), &ObjectId::new(id)).await
        }
    }
}

async fn add(ctx: &Ctx, slug: String, content: &str) -> Result<(), CliError> {
    // refuse before loading anything when signed out
    ctx.api.require_token()?;
    let detail = ArticleDetail::new(ctx.api.clone());
    detail.load(Slug::new(slug)).await?;
    let comment = detail.submit_comment(content).await?;
    print_json(&comment)
}
