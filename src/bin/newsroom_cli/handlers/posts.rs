#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use newsroom::api_types::{Category, ObjectId, Slug};
use newsroom::authoring::Authoring;
use newsroom::collection::{PostDraft, PostScope, Posts, RemoteCollection};
use newsroom::detail::ArticleDetail;
use newsroom::error::ApiError;
use serde_json::json;

use super::{delete_entity, list_pages, locate};
use crate::args::PostsCmd;
use crate::client::{CliError, Ctx};
use crate::io::{read_opt_blob, read_opt_value, read_value};
use crate::print::{print_json, print_notice};

pub async fn handle(ctx: &Ctx, cmd: PostsCmd) -> Result<(), CliError> {
    match cmd {
        PostsCmd::List {
            author,
            mine,
            category,
            pages,
        } => list(ctx, author, mine, category, pages).await,
        PostsCmd::Get { slug } => get(ctx, slug).await,
        PostsCmd::Create {
            title,
            category,
            body,
            body_file,
            image,
            image_url,
            image_alt,
        } => {
            let mut draft = PostDraft::new(title, category, read_value(body, body_file)?);
            draft.image_url = image_url;
            draft.image_alt = image_alt;
            draft.new_image = read_opt_blob(image).await?;
            create(ctx, draft).await
        }
        PostsCmd::Update {
            id,
            title,
            category,
            body,
            body_file,
            image,
            image_alt,
        } => {
            let input = PostUpdateInput {
                title,
                category,
                body,
                body_file,
                image,
                image_alt,
            };
            update(ctx, ObjectId::new(id), input).await
        }
        PostsCmd::Delete { id } => {
            let posts = RemoteCollection::<Posts>::new(ctx.api.clone(), ctx.page_size());
            delete_entity(ctx, &posts, PostScope::default(), &ObjectId::new(id)).await
        }
    }
}

struct PostUpdateInput {
    title: Option<String>,
    category: Option<Category>,
    body: Option<String>,
    body_file: Option<PathBuf>,
    image: Option<PathBuf>,
    image_alt: Option<String>,
}

async fn list(
    ctx: &Ctx,
    author: Option<String>,
    mine: bool,
    category: Option<Category>,
    pages: u32,
) -> Result<(), CliError> {
    let author = if mine {
        let session = ctx.auth.context().current().ok_or(ApiError::AuthMissing)?;
        Some(session.user_id().clone())
    } else {
        author.map(ObjectId::new)
    };
    let posts = RemoteCollection::<Posts>::new(ctx.api.clone(), ctx.page_size());
    list_pages(&posts, PostScope { author, category }, pages).await
}

async fn get(ctx: &Ctx, slug: String) -> Result<(), CliError> {
    let detail = ArticleDetail::new(ctx.api.clone());
    detail.load(Slug::new(slug)).await?;
    let state = detail.snapshot();
    print_json(&json!({
        "post": state.article,
        "previous": state.previous,
        "next": state.next,
        "comments": state.comments,
    }))
}

async fn create(ctx: &Ctx, draft: PostDraft) -> Result<(), CliError> {
    let authoring = Authoring::new(ctx.api.clone(), ctx.uploader.clone());
    let (article, next) = authoring.create_article(draft).await?;
    print_json(&json!({ "post": article, "next": next.path() }))
}

async fn update(ctx: &Ctx, id: ObjectId, input: PostUpdateInput) -> Result<(), CliError> {
    let posts = RemoteCollection::<Posts>::new(ctx.api.clone(), ctx.page_size())
        .with_uploader(ctx.uploader.clone());
    locate(&posts, PostScope::default(), &id).await?;

    let mut draft = posts.begin_edit(&id)?;
    if let Some(title) = input.title {
        draft.title = title;
    }
    if let Some(category) = input.category {
        draft.category = category;
    }
    if let Some(body) = read_opt_value(input.body, input.body_file)? {
        draft.body_html = body;
    }
    if let Some(alt) = input.image_alt {
        draft.image_alt = Some(alt);
    }
    draft.new_image = read_opt_blob(input.image).await?;

    let result = posts.commit_edit(&id, draft).await;
    print_notice(posts.notice());
    result?;
    let updated = posts
        .items()
        .into_iter()
        .find(|post| post.id == id);
    print_json(&updated)
}
