#![deny(clippy::all, clippy::pedantic)]

use newsroom::api_types::{ObjectId, Role};
use newsroom::collection::{RemoteCollection, Users};

use super::{delete_entity, list_pages, locate};
use crate::args::UsersCmd;
use crate::client::{CliError, Ctx};
use crate::print::{print_json, print_notice};

pub async fn handle(ctx: &Ctx, cmd: UsersCmd) -> Result<(), CliError> {
    let users = RemoteCollection::<Users>::new(ctx.api.clone(), ctx.page_size());
    match cmd {
        UsersCmd::List { pages } => list_pages(&users, (), pages).await,
        UsersCmd::SetRole { id, role } => set_role(&users, &ObjectId::new(id), role).await,
        UsersCmd::Delete { id } => delete_entity(ctx, &users, (), &ObjectId::new(id)).await,
    }
}

async fn set_role(
    users: &RemoteCollection<Users>,
    id: &ObjectId,
    role: Role,
) -> Result<(), CliError> {
    locate(users, (), id).await?;
    let mut draft = users.begin_edit(id)?;
    draft.role = role;

    let result = users.commit_edit(id, draft).await;
    print_notice(users.notice());
    result?;
    print_json(&users.items().into_iter().find(|user| &user.id == id))
}
