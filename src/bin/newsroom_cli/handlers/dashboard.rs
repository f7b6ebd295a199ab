#![deny(clippy::all, clippy::pedantic)]

use newsroom::dashboard::overview;

use crate::client::{CliError, Ctx};
use crate::print::print_json;

pub async fn handle(ctx: &Ctx) -> Result<(), CliError> {
    let overview = overview(&ctx.api).await?;
    print_json(&overview)
}
