#![deny(clippy::all, clippy::pedantic)]

use std::path::{Path, PathBuf};

use newsroom::api_types::ObjectId;
use newsroom::authoring::{Authoring, FileUpload};
use newsroom::collection::{FileScope, Files, RemoteCollection};
use newsroom::download::download;
use newsroom::error::ApiError;
use serde_json::json;

use super::{delete_entity, list_pages, locate};
use crate::args::FilesCmd;
use crate::client::{CliError, Ctx};
use crate::io::read_blob;
use crate::print::{print_json, print_notice};

pub async fn handle(ctx: &Ctx, cmd: FilesCmd) -> Result<(), CliError> {
    let files = RemoteCollection::<Files>::new(ctx.api.clone(), ctx.page_size());
    match cmd {
        FilesCmd::List { published } => list_pages(&files, FileScope { published }, 1).await,
        FilesCmd::Publish {
            title,
            file,
            thumbnail,
        } => publish(ctx, &files, title, file, thumbnail).await,
        FilesCmd::Delete { id } => {
            delete_entity(ctx, &files, FileScope::default(), &ObjectId::new(id)).await
        }
        FilesCmd::Download { id, published, out } => {
            fetch_to_disk(ctx, &files, &ObjectId::new(id), published, out).await
        }
    }
}

/// Publish, then print the file together with the refreshed admin list.
async fn publish(
    ctx: &Ctx,
    files: &RemoteCollection<Files>,
    title: String,
    file: PathBuf,
    thumbnail: PathBuf,
) -> Result<(), CliError> {
    let upload = FileUpload {
        title,
        file: read_blob(&file).await?,
        thumbnail: read_blob(&thumbnail).await?,
    };
    files.fetch(FileScope::default()).await?;
    let authoring = Authoring::new(ctx.api.clone(), ctx.uploader.clone());
    let result = authoring.publish_file_in(files, upload).await;
    print_notice(files.notice());
    let (published, _) = result?;
    print_json(&json!({ "file": published, "files": files.items() }))
}

async fn fetch_to_disk(
    ctx: &Ctx,
    files: &RemoteCollection<Files>,
    id: &ObjectId,
    published: bool,
    out: Option<PathBuf>,
) -> Result<(), CliError> {
    locate(files, FileScope { published }, id).await?;
    let file = files
        .items()
        .into_iter()
        .find(|file| &file.id == id)
        .ok_or_else(|| ApiError::validation(format!("No file with id {id}")))?;

    let saved = download(&ctx.api, &file).await?;
    let target = target_path(out.as_deref(), &saved.file_name).await;
    tokio::fs::write(&target, &saved.bytes)
        .await
        .map_err(|e| CliError::Output(format!("failed to write {}: {e}", target.display())))?;
    print_json(&json!({
        "id": file.id,
        "path": target.display().to_string(),
        "size": saved.bytes.len(),
    }))
}

/// `out` names the file unless it is an existing directory.
async fn target_path(out: Option<&Path>, file_name: &str) -> PathBuf {
    match out {
        Some(path) if !tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir()) => {
            path.to_path_buf()
        }
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}
